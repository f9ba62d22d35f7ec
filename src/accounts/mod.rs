// Accounts module
// Account lifecycle (create, update, soft delete, restore), listing, CSV export and avatars

pub mod export;
pub mod handlers;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;
pub mod store;

pub use handlers::{
    create_account_handler, delete_account_handler, export_accounts_handler, get_account_handler,
    list_accounts_handler, restore_account_handler, update_account_handler, upload_avatar_handler,
};
pub use models::{Account, AccountState, AccountView};
pub use repository::PgAccountStore;
pub use service::AccountService;
pub use store::{AccountStore, StoreError, Visibility};
