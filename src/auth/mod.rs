// Authentication module
// Credential hashing, stateless access/refresh tokens, the auth gate and the authorization policy

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod policy;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use handlers::{login_handler, logout_handler, me_handler, refresh_handler, register_handler};
pub use middleware::{require_auth, AuthenticatedUser, RequestMeta};
pub use models::{AccessTokenResponse, AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, Role};
pub use password::PasswordService;
pub use policy::{require_admin, require_self_or_admin, AuthorizationPolicy};
pub use service::AuthService;
pub use token::{TokenKind, TokenService};
