// End-to-end route tests for the account API
// Run against in-memory stores through the full router, gates included

use super::*;
use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

use crate::audit::store::AuditStore;
use crate::test_support::{
    InMemoryAccountStore, InMemoryAuditStore, InMemoryFileStorage, TestApp, TEST_MAX_AVATAR_BYTES,
    TEST_SECRET,
};
use crate::validation::EMAIL_MAX;
use axum_test::multipart::{MultipartForm, Part};

// ============================================================================
// Test Helpers
// ============================================================================

struct Harness {
    server: TestServer,
    app: TestApp,
}

fn create_test_app() -> Harness {
    let app = TestApp::new();
    let upload_dir = std::env::temp_dir().join("account-api-route-tests");
    let router = create_router(app.state.clone(), upload_dir);
    Harness {
        server: TestServer::new(router).unwrap(),
        app,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn registration(nickname: &str, email: &str) -> Value {
    json!({ "nickname": nickname, "email": email, "password": "secret1" })
}

async fn register(h: &Harness, nickname: &str, email: &str) -> Value {
    let response = h
        .server
        .post("/register")
        .json(&registration(nickname, email))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    response.json::<Value>()
}

fn access_token(body: &Value) -> String {
    body["data"]["access_token"].as_str().unwrap().to_string()
}

/// Seeds an admin and logs in, returning its access token
async fn admin_token(h: &Harness) -> String {
    h.app
        .seed_admin("root", "root@x.com", "rootpass")
        .await;
    let response = h
        .server
        .post("/login")
        .json(&json!({ "email": "root@x.com", "password": "rootpass" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    access_token(&response.json::<Value>())
}

fn error_code(response: &TestResponse) -> String {
    response.json::<Value>()["error"]["error_code"]
        .as_str()
        .unwrap()
        .to_string()
}

// ============================================================================
// Registration and login
// ============================================================================

#[tokio::test]
async fn test_register_returns_account_and_tokens() {
    let h = create_test_app();
    let body = register(&h, "alice", "a@x.com").await;

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["id"], 1);
    assert_eq!(body["data"]["user"]["email"], "a@x.com");
    assert_eq!(body["data"]["user"]["role"], "user");
    assert!(body["data"]["user"].get("password").is_none());
    assert!(body["data"]["user"].get("password_hash").is_none());
    assert!(body["data"]["refresh_token"].is_string());
}

#[tokio::test]
async fn test_register_sets_refresh_cookie() {
    let h = create_test_app();
    let response = h
        .server
        .post("/register")
        .json(&registration("alice", "a@x.com"))
        .await;

    let cookie = response.header(header::SET_COOKIE);
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with("refresh_token="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let h = create_test_app();
    register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .post("/register")
        .json(&registration("alice2", "a@x.com"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["error_code"], "CONFLICT");
    assert!(body["error"]["timestamp"].is_string());
}

#[tokio::test]
async fn test_register_validation_reports_fields() {
    let h = create_test_app();
    let response = h
        .server
        .post("/register")
        .json(&json!({ "nickname": "al", "email": "nope", "password": "123" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["error_code"], "VALIDATION_ERROR");
    let details = &body["error"]["details"];
    assert!(details["nickname"].is_string());
    assert!(details["email"].is_string());
    assert!(details["password"].is_string());
}

/// Well-formed address longer than the `users.email` column
fn oversized_email() -> String {
    let domain = format!("{}com", format!("{}.", "d".repeat(60)).repeat(4));
    format!("{}@{}", "a".repeat(60), domain)
}

#[tokio::test]
async fn test_register_rejects_email_longer_than_column() {
    let h = create_test_app();
    let email = oversized_email();
    assert!(email.len() > EMAIL_MAX);

    let response = h
        .server
        .post("/register")
        .json(&registration("alice", &email))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["error"]["error_code"], "VALIDATION_ERROR");
    assert!(body["error"]["details"]["email"].is_string());
}

#[tokio::test]
async fn test_update_rejects_email_longer_than_column() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .put("/user/1")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .json(&json!({ "email": oversized_email() }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let h = create_test_app();
    let response = h
        .server
        .post("/register")
        .add_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .text("{not json")
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "BAD_REQUEST");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let h = create_test_app();
    register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .post("/login")
        .json(&json!({ "email": "a@x.com", "password": "wrong" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = h
        .server
        .post("/login")
        .json(&json!({ "email": "a@x.com", "password": "secret1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

// ============================================================================
// Auth gate and token renewal
// ============================================================================

#[tokio::test]
async fn test_me_requires_bearer_token() {
    let h = create_test_app();
    let body = register(&h, "alice", "a@x.com").await;

    let response = h.server.get("/me").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = h
        .server
        .get("/me")
        .add_header(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = h
        .server
        .get("/me")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&body)))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["data"]["user"]["nickname"], "alice");
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let h = create_test_app();
    let body = register(&h, "alice", "a@x.com").await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap();

    let response = h
        .server
        .get("/me")
        .add_header(header::AUTHORIZATION, bearer(refresh))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_access_token_is_rejected() {
    let h = create_test_app();
    register(&h, "alice", "a@x.com").await;

    let expired = TokenService::with_durations(TEST_SECRET, -60, 60)
        .issue_access(1)
        .unwrap();
    let response = h
        .server
        .get("/me")
        .add_header(header::AUTHORIZATION, bearer(&expired))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_via_cookie_and_body() {
    let h = create_test_app();
    let body = register(&h, "alice", "a@x.com").await;
    let refresh = body["data"]["refresh_token"].as_str().unwrap();

    let cookie = HeaderValue::from_str(&format!("refresh_token={}", refresh)).unwrap();
    let response = h
        .server
        .post("/refresh")
        .add_header(header::COOKIE, cookie)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let access = access_token(&response.json::<Value>());

    let response = h
        .server
        .get("/me")
        .add_header(header::AUTHORIZATION, bearer(&access))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = h
        .server
        .post("/refresh")
        .json(&json!({ "refresh_token": refresh }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // an access token cannot renew itself
    let response = h
        .server
        .post("/refresh")
        .json(&json!({ "refresh_token": access }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = h.server.post("/refresh").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let h = create_test_app();
    let response = h.server.post("/logout").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let cookie = response.header(header::SET_COOKIE);
    assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
}

// ============================================================================
// Self-or-admin and admin-only routes
// ============================================================================

#[tokio::test]
async fn test_user_cannot_delete_someone_else() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;
    register(&h, "bob", "b@x.com").await;

    let response = h
        .server
        .delete("/user/2")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(error_code(&response), "FORBIDDEN");

    let response = h
        .server
        .put("/user/2")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .json(&json!({ "nickname": "hacked" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_updates_own_profile() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .put("/user/1")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .json(&json!({ "nickname": "alicia", "password": "newpass1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body = response.json::<Value>();
    assert_eq!(body["data"]["user"]["nickname"], "alicia");
    assert_eq!(body["data"]["user"]["email"], "a@x.com");

    let response = h
        .server
        .post("/login")
        .json(&json!({ "email": "a@x.com", "password": "newpass1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_path_id_is_bad_request() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;

    for path in ["/user/abc", "/user/0", "/user/-3"] {
        let response = h
            .server
            .get(path)
            .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{}", path);
    }
}

#[tokio::test]
async fn test_self_delete_then_token_fails_closed() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;
    let token = access_token(&alice);

    let response = h
        .server
        .delete("/user/1")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // the token is still cryptographically valid but the account is gone
    let response = h
        .server
        .put("/user/1")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .json(&json!({ "nickname": "ghost" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = h
        .server
        .post("/login")
        .json(&json!({ "email": "a@x.com", "password": "secret1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_users() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;
    let auth = bearer(&access_token(&alice));

    let response = h
        .server
        .get("/audit-logs")
        .add_header(header::AUTHORIZATION, auth.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = h
        .server
        .get("/users/export")
        .add_header(header::AUTHORIZATION, auth.clone())
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = h
        .server
        .post("/user")
        .add_header(header::AUTHORIZATION, auth)
        .json(&registration("mallory", "m@x.com"))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = h.server.get("/audit-logs").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_restore_makes_account_visible_again() {
    let h = create_test_app();
    let admin = admin_token(&h).await;
    register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .delete("/user/2")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = h
        .server
        .get("/users")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.json::<Value>()["data"]["total"], 1);

    let response = h
        .server
        .get("/users")
        .add_query_param("include_deleted", "true")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.json::<Value>()["data"]["total"], 2);

    let response = h
        .server
        .post("/user/2/restore")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = h
        .server
        .get("/users")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    let body = response.json::<Value>();
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["limit"], 10);

    // restoring an active account is a conflict
    let response = h
        .server
        .post("/user/2/restore")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = h
        .server
        .post("/login")
        .json(&json!({ "email": "a@x.com", "password": "secret1" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_creates_account_and_audit_log_records_it() {
    let h = create_test_app();
    let admin = admin_token(&h).await;

    let response = h
        .server
        .post("/user")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .add_header(
            axum::http::HeaderName::from_static("x-forwarded-for"),
            HeaderValue::from_static("203.0.113.9"),
        )
        .add_header(header::USER_AGENT, HeaderValue::from_static("admin-cli/1.0"))
        .json(&json!({
            "nickname": "carol",
            "email": "c@x.com",
            "password": "secret1",
            "role": "admin"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["data"]["user"]["role"], "admin");

    let response = h
        .server
        .get("/audit-logs")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let logs = response.json::<Value>()["data"]["logs"].clone();
    assert_eq!(logs[0]["action"], "create_user");
    assert_eq!(logs[0]["user_id"], 1);
    assert_eq!(logs[0]["object"], "user");
    assert_eq!(logs[0]["object_id"], 2);
    assert_eq!(logs[0]["ip"], "203.0.113.9");
    assert_eq!(logs[0]["user_agent"], "admin-cli/1.0");

    assert_eq!(h.app.audit.recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_non_admin_include_deleted_is_ignored() {
    let h = create_test_app();
    let admin = admin_token(&h).await;
    let alice = register(&h, "alice", "a@x.com").await;
    register(&h, "bob", "b@x.com").await;

    let response = h
        .server
        .delete("/user/3")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = h
        .server
        .get("/users")
        .add_query_param("include_deleted", "true")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .await;
    assert_eq!(response.json::<Value>()["data"]["total"], 2);
}

#[tokio::test]
async fn test_export_csv() {
    let h = create_test_app();
    let admin = admin_token(&h).await;
    register(&h, "alice", "a@x.com").await;
    register(&h, "bob", "b@x.com").await;

    let response = h
        .server
        .get("/users/export")
        .add_query_param("search", "alice")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let disposition = response.header(header::CONTENT_DISPOSITION);
    assert_eq!(
        disposition.to_str().unwrap(),
        "attachment; filename=\"users_export.csv\""
    );
    assert!(response
        .header(header::CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("text/csv"));

    let csv = response.text();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "ID,Email,Nickname,Role,Created At");
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("2,a@x.com,alice,user,"));
}

// ============================================================================
// Avatar upload
// ============================================================================

fn avatar_form(field: &str, file_name: &str, bytes: Vec<u8>) -> MultipartForm {
    MultipartForm::new().add_part(
        field,
        Part::bytes(bytes)
            .file_name(file_name)
            .mime_type("image/png"),
    )
}

#[tokio::test]
async fn test_upload_avatar_sets_url_and_audits() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .post("/me/avatar")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .multipart(avatar_form("avatar", "me.png", vec![7u8; 16]))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = response.json::<Value>();
    let url = body["data"]["user"]["avatar_url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/1_"));
    assert!(url.ends_with(".png"));
    assert!(h.app.files.contains(&url));

    let logs = h.app.audit.recent(10).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].action, "upload_avatar");
    assert_eq!(logs[0].object_id, 1);
    assert_eq!(logs[0].metadata, url);
}

#[tokio::test]
async fn test_upload_avatar_requires_avatar_field() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .post("/me/avatar")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .multipart(avatar_form("picture", "me.png", vec![7u8; 16]))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response), "BAD_REQUEST");
    assert!(h.app.files.is_empty());
}

#[tokio::test]
async fn test_upload_avatar_rejects_unsupported_extension() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .post("/me/avatar")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .multipart(avatar_form("avatar", "me.exe", vec![7u8; 16]))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(h.app.files.is_empty());
}

#[tokio::test]
async fn test_upload_avatar_rejects_oversized_file() {
    let h = create_test_app();
    let alice = register(&h, "alice", "a@x.com").await;

    let response = h
        .server
        .post("/me/avatar")
        .add_header(header::AUTHORIZATION, bearer(&access_token(&alice)))
        .multipart(avatar_form("avatar", "me.png", vec![7u8; TEST_MAX_AVATAR_BYTES + 1]))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(h.app.files.is_empty());
}

#[tokio::test]
async fn test_upload_avatar_requires_bearer_token() {
    let h = create_test_app();

    let response = h
        .server
        .post("/me/avatar")
        .multipart(avatar_form("avatar", "me.png", vec![7u8; 16]))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_router_accepts_largest_avatar_limit() {
    let state = AppState::new(
        Arc::new(InMemoryAccountStore::new()),
        Arc::new(InMemoryAuditStore::new()),
        Arc::new(InMemoryFileStorage::new()),
        TokenService::new(TEST_SECRET),
        false,
        usize::MAX,
    );
    let server = TestServer::new(create_router(state, std::env::temp_dir())).unwrap();

    let response = server
        .post("/me/avatar")
        .multipart(avatar_form("avatar", "me.png", vec![7u8; 16]))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}
