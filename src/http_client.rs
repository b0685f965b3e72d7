use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::auth::{AuthManager, CredentialStore};
use crate::config::Config;
use crate::error::SessionError;
use crate::store::KeyValueStore;

/// Refresh endpoint, relative to the base URL
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Resolve `path` against `base`, refusing anything that lands outside it.
///
/// The base is treated as a directory, so `https://host/api` + `/auth/me`
/// resolves to `https://host/api/auth/me`.
pub fn resolve_url(base: &Url, path: &str) -> Result<Url, SessionError> {
    let mut base = base.clone();
    base.set_query(None);
    base.set_fragment(None);
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }

    let url = base
        .join(path.trim_start_matches('/'))
        .map_err(|e| SessionError::InvalidPath(format!("{}: {}", path, e)))?;

    if url.origin() != base.origin() || !url.path().starts_with(base.path()) {
        return Err(SessionError::InvalidPath(format!(
            "{} resolves outside {}",
            path, base
        )));
    }

    Ok(url)
}

/// Where a request is in its lifecycle.
///
/// Only an `Original` attempt may trigger a refresh; the replay after a
/// refresh runs as `Replay`, so no request is refreshed twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    /// First send of an authenticated request
    Original,
    /// Resend after a successful refresh
    Replay,
    /// Unauthenticated request, never refreshed
    Public,
}

/// Map a non-2xx response to an error.
///
/// 401 (and 403 when `refresh_on_forbidden`) on an original attempt means the
/// credential has expired; everything else propagates as an HTTP error.
pub fn classify_failure(
    status: u16,
    body: String,
    attempt: Attempt,
    refresh_on_forbidden: bool,
) -> SessionError {
    let credential_rejected = status == 401 || (refresh_on_forbidden && status == 403);

    if credential_rejected && attempt == Attempt::Original {
        SessionError::AuthExpired { status, body }
    } else {
        SessionError::Http { status, body }
    }
}

/// Request body
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

/// Multipart form kept in replayable form
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, file: FilePart) -> Self {
        self.files.push(file);
        self
    }

    /// Build a fresh form; reqwest forms are consumed on send
    fn to_form(&self) -> Result<reqwest::multipart::Form, SessionError> {
        let mut form = reqwest::multipart::Form::new();

        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }

        for file in &self.files {
            let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
                .file_name(file.file_name.clone())
                .mime_str(&file.mime)
                .map_err(|e| {
                    SessionError::InvalidRequest(format!("invalid MIME type {}: {}", file.mime, e))
                })?;
            form = form.part(file.field.clone(), part);
        }

        Ok(form)
    }
}

/// A request relative to the session's base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: RequestBody::Empty,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Attach a JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, SessionError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = RequestBody::Multipart(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Successful response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SessionError> {
        serde_json::from_slice(&self.body).map_err(|e| SessionError::Decode(e.to_string()))
    }
}

/// HTTP client for the chat backend with bearer attachment and transparent
/// access token refresh
pub struct SessionClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Authentication manager
    auth: Arc<AuthManager>,

    /// Every request path resolves under this URL
    base_url: Url,

    /// Per-request timeout, reported in `SessionError::Timeout`
    timeout: Duration,

    /// Treat 403 like 401
    refresh_on_forbidden: bool,
}

impl SessionClient {
    /// Create a new session client over `store`
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .cookie_store(config.with_credentials)
            .build()
            .context("Failed to create HTTP client")?;

        let refresh_url =
            resolve_url(&config.base_url, REFRESH_PATH).context("Invalid refresh URL")?;
        let auth = AuthManager::new(
            CredentialStore::new(store),
            refresh_url,
            config.request_timeout,
        )?;

        Ok(Self {
            client,
            auth: Arc::new(auth),
            base_url: config.base_url.clone(),
            timeout: config.request_timeout,
            refresh_on_forbidden: config.refresh_on_forbidden,
        })
    }

    /// Stored session credentials
    pub fn credentials(&self) -> &CredentialStore {
        self.auth.credentials()
    }

    /// Send an authenticated request.
    ///
    /// Attaches the stored access token. If the server rejects it, refreshes
    /// once and replays; if the refresh fails the session is cleared and the
    /// refresh error is returned.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        let token = self.auth.access_token()?;

        match self
            .dispatch(&request, token.as_deref(), Attempt::Original)
            .await
        {
            Err(SessionError::AuthExpired { status, .. }) => {
                tracing::warn!(
                    status = status,
                    method = %request.method,
                    path = %request.path,
                    "Credentials rejected, refreshing access token"
                );

                let token = self.auth.recover(token.as_deref()).await?;

                tracing::debug!(path = %request.path, "Replaying request with refreshed token");
                self.dispatch(&request, Some(&token), Attempt::Replay).await
            }
            other => other,
        }
    }

    /// Send an authenticated request and decode the JSON response
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, SessionError> {
        self.send(request).await?.json()
    }

    /// Send a request without credentials and without the refresh path
    pub async fn send_public(&self, request: ApiRequest) -> Result<ApiResponse, SessionError> {
        self.dispatch(&request, None, Attempt::Public).await
    }

    /// Execute one HTTP exchange
    async fn dispatch(
        &self,
        request: &ApiRequest,
        token: Option<&str>,
        attempt: Attempt,
    ) -> Result<ApiResponse, SessionError> {
        let url = resolve_url(&self.base_url, &request.path)?;
        let headers = build_headers(&request.headers, token)?;

        tracing::debug!(
            method = %request.method,
            url = %url,
            attempt = ?attempt,
            authenticated = token.is_some(),
            "Sending HTTP request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .headers(headers);

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(body) => builder.multipart(body.to_form()?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e, &url))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e, &url))?;

        tracing::debug!(status = %status, "Received HTTP response");

        if status.is_success() {
            return Ok(ApiResponse { status, body });
        }

        let error_text = String::from_utf8_lossy(&body).into_owned();
        tracing::warn!(
            status = status.as_u16(),
            url = %url,
            response_body = %error_text,
            attempt = ?attempt,
            "Received error response"
        );

        Err(classify_failure(
            status.as_u16(),
            error_text,
            attempt,
            self.refresh_on_forbidden,
        ))
    }

    /// Categorize a transport failure; never retried
    fn transport_error(&self, e: reqwest::Error, url: &Url) -> SessionError {
        let error_kind = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connection_failed"
        } else if e.is_request() {
            "request_error"
        } else if e.is_body() {
            "body_error"
        } else if e.is_decode() {
            "decode_error"
        } else {
            "unknown"
        };

        tracing::warn!(
            error_kind = error_kind,
            error = %e,
            url = %url,
            "HTTP request error"
        );

        if e.is_timeout() {
            SessionError::Timeout(self.timeout)
        } else {
            SessionError::Network(format!("{} (kind: {})", e, error_kind))
        }
    }
}

/// Caller headers plus the bearer credential, which replaces any caller
/// supplied `Authorization`
fn build_headers(
    extra: &[(String, String)],
    token: Option<&str>,
) -> Result<HeaderMap, SessionError> {
    let mut headers = HeaderMap::new();

    for (name, value) in extra {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| SessionError::InvalidRequest(format!("header {}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| SessionError::InvalidRequest(format!("header {}: {}", name, e)))?;
        headers.insert(header_name, header_value);
    }

    if let Some(token) = token {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            SessionError::InvalidRequest("access token is not a valid header value".to_string())
        })?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn base() -> Url {
        Url::parse("https://api.example.com/v1").unwrap()
    }

    #[test]
    fn test_resolve_url() {
        let url = resolve_url(&base(), "/auth/me").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/auth/me");

        let url = resolve_url(&base(), "chats/getchats?page=2").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/chats/getchats?page=2");

        let root = Url::parse("https://api.livetouch.chat").unwrap();
        let url = resolve_url(&root, "/auth/refresh").unwrap();
        assert_eq!(url.as_str(), "https://api.livetouch.chat/auth/refresh");
    }

    #[test]
    fn test_resolve_url_rejects_escapes() {
        assert!(matches!(
            resolve_url(&base(), "https://evil.example.com/steal"),
            Err(SessionError::InvalidPath(_))
        ));
        assert!(matches!(
            resolve_url(&base(), "/../admin"),
            Err(SessionError::InvalidPath(_))
        ));
        assert!(matches!(
            resolve_url(&base(), "mailto:someone@example.com"),
            Err(SessionError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_failure(401, "expired".into(), Attempt::Original, false);
        assert!(matches!(err, SessionError::AuthExpired { status: 401, .. }));

        // 403 only counts when hardened
        let err = classify_failure(403, String::new(), Attempt::Original, true);
        assert!(matches!(err, SessionError::AuthExpired { status: 403, .. }));
        let err = classify_failure(403, String::new(), Attempt::Original, false);
        assert!(matches!(err, SessionError::Http { status: 403, .. }));

        // A replay is never refreshed again
        let err = classify_failure(401, String::new(), Attempt::Replay, true);
        assert!(matches!(err, SessionError::Http { status: 401, .. }));

        // Public requests never refresh
        let err = classify_failure(401, String::new(), Attempt::Public, true);
        assert!(matches!(err, SessionError::Http { status: 401, .. }));

        let err = classify_failure(500, "boom".into(), Attempt::Original, true);
        match err {
            SessionError::Http { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_build_headers_bearer_replaces_caller_authorization() {
        let extra = vec![
            ("Authorization".to_string(), "Basic abc".to_string()),
            ("X-Client".to_string(), "cli".to_string()),
        ];

        let headers = build_headers(&extra, Some("tok")).unwrap();
        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
        assert_eq!(headers["x-client"], "cli");

        let headers = build_headers(&[], None).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_build_headers_rejects_invalid_values() {
        let extra = vec![("X-Bad".to_string(), "line\nbreak".to_string())];
        assert!(matches!(
            build_headers(&extra, None),
            Err(SessionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_api_request_builder() {
        let req = ApiRequest::post("/chats/createprivate")
            .json(&serde_json::json!({"type": "private", "email": "a@b.com"}))
            .unwrap()
            .header("X-Trace", "1");

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.headers.len(), 1);
        match req.body {
            RequestBody::Json(ref v) => assert_eq!(v["email"], "a@b.com"),
            _ => panic!("expected JSON body"),
        }
    }

    #[test]
    fn test_multipart_rejects_bad_mime() {
        let body = MultipartBody::new().file(FilePart {
            field: "file".into(),
            file_name: "a.png".into(),
            mime: "not a mime".into(),
            bytes: Bytes::from_static(b"x"),
        });
        assert!(matches!(
            body.to_form(),
            Err(SessionError::InvalidRequest(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_resolved_urls_stay_under_base(path in ".{0,40}") {
            let base = base();
            if let Ok(url) = resolve_url(&base, &path) {
                prop_assert!(url.as_str().starts_with("https://api.example.com/v1/"));
            }
        }

        #[test]
        fn prop_segment_paths_always_resolve(segments in prop::collection::vec("[a-z0-9_-]{1,8}", 1..5)) {
            let path = format!("/{}", segments.join("/"));
            let url = resolve_url(&base(), &path).unwrap();
            prop_assert_eq!(url.path(), format!("/v1{}", path));
        }

        #[test]
        fn prop_non_auth_statuses_never_refresh(status in 400u16..600) {
            prop_assume!(status != 401 && status != 403);
            let err = classify_failure(status, String::new(), Attempt::Original, true);
            let is_http = matches!(err, SessionError::Http { .. });
            prop_assert!(is_http);
        }
    }
}
