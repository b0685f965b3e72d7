use crate::error::SessionError;
use crate::http_client::ApiRequest;
use crate::models::{Chat, CreatePrivateChatRequest, CreatePrivateChatResponse};

use super::LiveTouchApi;

impl LiveTouchApi {
    pub async fn get_chats(&self) -> Result<Vec<Chat>, SessionError> {
        self.client
            .send_json(ApiRequest::get("/chats/getchats"))
            .await
    }

    /// Start a private chat with the user registered under `email`.
    /// Returns the new chat's id.
    pub async fn create_private_chat(&self, email: &str) -> Result<i64, SessionError> {
        let body = CreatePrivateChatRequest::new(email);
        if body.email.is_empty() {
            return Err(SessionError::InvalidRequest("email is empty".to_string()));
        }

        let request = ApiRequest::post("/chats/createprivate").json(&body)?;
        let response: CreatePrivateChatResponse = self.client.send_json(request).await?;

        tracing::info!(chat_id = response.chat_id, "Private chat created");
        Ok(response.chat_id)
    }
}
