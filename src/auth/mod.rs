// Authentication module
// Manages stored credentials and token refresh

mod credentials;
mod manager;
mod refresh;
mod types;

pub use credentials::{
    CredentialStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SESSION_KEYS, USER_KEY,
};
pub use manager::AuthManager;
pub use refresh::refresh_access_token;
pub use types::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse,
    RegisterRequest,
};
