use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chat kind as the backend names it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    #[serde(other)]
    Unknown,
}

/// Chat record from `GET /chats/getchats`.
///
/// Only the fields the client relies on are typed; the rest is kept verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ChatKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /chats/createprivate`
#[derive(Debug, Clone, Serialize)]
pub struct CreatePrivateChatRequest {
    #[serde(rename = "type")]
    pub kind: ChatKind,
    pub email: String,
}

impl CreatePrivateChatRequest {
    /// Build a request for `email`, trimmed and lower-cased
    pub fn new(email: &str) -> Self {
        Self {
            kind: ChatKind::Private,
            email: email.trim().to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrivateChatResponse {
    pub chat_id: i64,
}
