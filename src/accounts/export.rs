// CSV rendering for the admin account export

use crate::accounts::models::Account;

pub const CSV_HEADER: [&str; 5] = ["ID", "Email", "Nickname", "Role", "Created At"];
pub const EXPORT_FILENAME: &str = "users_export.csv";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Quotes a field when it contains a delimiter, quote or line break
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    let line = fields
        .into_iter()
        .map(escape_field)
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

/// Renders accounts as CSV, header first
pub fn render_csv(accounts: &[Account]) -> String {
    let mut out = String::new();
    push_record(&mut out, CSV_HEADER);

    for account in accounts {
        let id = account.id.to_string();
        let created = account.registered_at.format(TIMESTAMP_FORMAT).to_string();
        push_record(
            &mut out,
            [
                id.as_str(),
                account.email.as_str(),
                account.nickname.as_str(),
                account.role.as_str(),
                created.as_str(),
            ],
        );
    }
    out
}
