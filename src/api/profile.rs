use std::path::Path;

use bytes::Bytes;
use serde_json::Value;

use crate::error::SessionError;
use crate::http_client::{ApiRequest, FilePart, MultipartBody};
use crate::models::{AvatarUpdate, ProfileUpdate, UploadResponse};

use super::{LiveTouchApi, AVATAR_BUCKET};

impl LiveTouchApi {
    /// Returns whatever the server echoes back (`null` for an empty body)
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Value, SessionError> {
        let request = ApiRequest::put("/auth/update-profile").json(update)?;
        let response = self.client.send(request).await?;

        if response.body.is_empty() {
            Ok(Value::Null)
        } else {
            response.json()
        }
    }

    pub async fn update_avatar(&self, avatar_url: &str) -> Result<(), SessionError> {
        let request = ApiRequest::put("/auth/update-avatar").json(&AvatarUpdate {
            avatar_url: avatar_url.to_string(),
        })?;
        self.client.send(request).await?;
        Ok(())
    }

    /// Upload a file to `bucket`, returning its public URL
    pub async fn upload(&self, file: FilePart, bucket: &str) -> Result<String, SessionError> {
        let body = MultipartBody::new().file(file).text("bucket", bucket);
        let response: UploadResponse = self
            .client
            .send_json(ApiRequest::post("/upload").multipart(body))
            .await?;

        tracing::info!(url = %response.url, bucket = bucket, "File uploaded");
        Ok(response.url)
    }

    /// Upload the image at `path` and make it the user's avatar
    pub async fn upload_avatar(&self, path: &Path) -> Result<String, SessionError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            SessionError::InvalidRequest(format!("cannot read {}: {}", path.display(), e))
        })?;

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("avatar.jpg")
            .to_string();

        let file = FilePart {
            field: "file".to_string(),
            mime: mime_for_path(path),
            file_name,
            bytes: Bytes::from(bytes),
        };

        let url = self.upload(file, AVATAR_BUCKET).await?;
        self.update_avatar(&url).await?;
        Ok(url)
    }
}

/// Image MIME type from the file extension, `image/jpeg` when there is none
pub fn mime_for_path(path: &Path) -> String {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if !ext.is_empty() => format!("image/{}", ext.to_lowercase()),
        _ => "image/jpeg".to_string(),
    }
}
