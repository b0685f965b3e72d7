// Typed calls for the chat backend endpoints

mod auth;
mod chats;
mod profile;

use std::sync::Arc;

use crate::http_client::SessionClient;

pub use profile::mime_for_path;

/// Bucket avatars are uploaded to
pub const AVATAR_BUCKET: &str = "avatars";

/// Chat backend API over a shared [`SessionClient`]
#[derive(Clone)]
pub struct LiveTouchApi {
    client: Arc<SessionClient>,
}

impl LiveTouchApi {
    pub fn new(client: Arc<SessionClient>) -> Self {
        Self { client }
    }

    /// Underlying session client
    pub fn client(&self) -> &Arc<SessionClient> {
        &self.client
    }
}
