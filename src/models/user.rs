use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User record as returned by `/auth/login` and `/auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub usersurname: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_verified: bool,
}

/// Body of `PUT /auth/update-profile`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub surname: String,
    pub bio: String,
    pub phone: String,
}

/// Body of `PUT /auth/update-avatar`
#[derive(Debug, Clone, Serialize)]
pub struct AvatarUpdate {
    pub avatar_url: String,
}

/// Response of `POST /upload`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}
