use crate::auth::{ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest};
use crate::error::SessionError;
use crate::http_client::ApiRequest;
use crate::models::User;

use super::LiveTouchApi;

impl LiveTouchApi {
    /// Log in and persist the session (both tokens and the user, one write)
    pub async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let request = ApiRequest::post("/auth/login").json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })?;

        let login: LoginResponse = self.client.send_public(request).await?.json()?;
        self.client.credentials().save_session(&login)?;

        tracing::info!(user_id = login.user.id, "Logged in");
        Ok(login.user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<(), SessionError> {
        let request = ApiRequest::post("/auth/register").json(request)?;
        self.client.send_public(request).await?;

        tracing::info!("Registration accepted");
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str, new_password: &str) -> Result<(), SessionError> {
        let request = ApiRequest::post("/auth/forgot-password").json(&ForgotPasswordRequest {
            email: email.to_string(),
            new_password: new_password.to_string(),
        })?;
        self.client.send_public(request).await?;
        Ok(())
    }

    /// Fetch the authoritative user record and refresh the cached copy
    pub async fn me(&self) -> Result<User, SessionError> {
        let user: User = self.client.send_json(ApiRequest::get("/auth/me")).await?;
        self.client.credentials().cache_user(&user)?;
        Ok(user)
    }

    /// Forget the local session
    pub fn logout(&self) -> Result<(), SessionError> {
        self.client.credentials().clear()?;
        tracing::info!("Logged out");
        Ok(())
    }
}
