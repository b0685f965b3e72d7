// LiveTouch client - library root

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod notifications;
pub mod store;

pub use api::LiveTouchApi;
pub use error::{FeedError, RefreshError, SessionError};
pub use http_client::{ApiRequest, ApiResponse, SessionClient};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
