// Data models for backend records

pub mod chat;
pub mod user;

pub use chat::{Chat, ChatKind, CreatePrivateChatRequest, CreatePrivateChatResponse};
pub use user::{AvatarUpdate, ProfileUpdate, UploadResponse, User};
