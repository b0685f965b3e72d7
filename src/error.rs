// Error handling module
// Defines the session, refresh and notification feed error taxonomies

use std::time::Duration;

use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by [`SessionClient`](crate::http_client::SessionClient)
#[derive(Error, Debug)]
pub enum SessionError {
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// No response was received
    #[error("Network error: {0}")]
    Network(String),

    /// Server responded with a non-2xx status that is not eligible for refresh
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },

    /// Credentials were rejected on the original attempt.
    /// Recovered inside `send` and never returned from it.
    #[error("Credentials rejected: {status} - {body}")]
    AuthExpired { status: u16, body: String },

    /// Refresh was needed but no refresh token is stored
    #[error("No refresh token stored")]
    NoRefreshToken,

    /// The refresh endpoint failed; the local session has been wiped
    #[error("Session expired: {0}")]
    RefreshFailed(#[source] RefreshError),

    /// Path does not resolve under the configured base URL
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Request could not be built (bad header, bad multipart part)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(#[from] serde_json::Error),

    /// Successful response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Credential storage failed
    #[error("Credential storage error: {0}")]
    Storage(#[from] StoreError),
}

impl SessionError {
    /// True when the session is gone and the caller should route to login
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            SessionError::NoRefreshToken | SessionError::RefreshFailed(_)
        )
    }

    /// HTTP status of the failing response, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            SessionError::Http { status, .. } | SessionError::AuthExpired { status, .. } => {
                Some(*status)
            }
            SessionError::RefreshFailed(RefreshError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

impl From<RefreshError> for SessionError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::NoRefreshToken => SessionError::NoRefreshToken,
            other => SessionError::RefreshFailed(other),
        }
    }
}

/// Failure of the dedicated refresh call.
///
/// Cloneable so that every caller waiting on a coalesced refresh observes the
/// same outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    #[error("no refresh token stored")]
    NoRefreshToken,

    #[error("refresh request timed out")]
    Timeout,

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed refresh response: {0}")]
    Malformed(String),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("refresh task did not complete: {0}")]
    Interrupted(String),
}

impl RefreshError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RefreshError::Timeout
        } else {
            RefreshError::Network(err.to_string())
        }
    }
}

impl From<StoreError> for RefreshError {
    fn from(err: StoreError) -> Self {
        RefreshError::Storage(err.to_string())
    }
}

/// Errors from the chat notification feed
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to decode feed message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid feed URL: {0}")]
    InvalidUrl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SessionError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP error: 500 - boom");

        let err = SessionError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "Request timed out after 10s");

        let err = SessionError::NoRefreshToken;
        assert_eq!(err.to_string(), "No refresh token stored");
    }

    #[test]
    fn test_refresh_failed_message() {
        let err = SessionError::RefreshFailed(RefreshError::Status {
            status: 401,
            body: "invalid token".to_string(),
        });
        assert_eq!(
            err.to_string(),
            "Session expired: refresh endpoint returned 401: invalid token"
        );
    }

    #[test]
    fn test_from_refresh_error() {
        let err: SessionError = RefreshError::NoRefreshToken.into();
        assert!(matches!(err, SessionError::NoRefreshToken));

        let err: SessionError = RefreshError::Timeout.into();
        assert!(matches!(
            err,
            SessionError::RefreshFailed(RefreshError::Timeout)
        ));
    }

    #[test]
    fn test_is_session_expired() {
        assert!(SessionError::NoRefreshToken.is_session_expired());
        assert!(SessionError::RefreshFailed(RefreshError::Malformed("x".into()))
            .is_session_expired());

        assert!(!SessionError::Timeout(Duration::from_secs(1)).is_session_expired());
        assert!(!SessionError::Network("refused".into()).is_session_expired());
        assert!(!SessionError::Http {
            status: 401,
            body: String::new()
        }
        .is_session_expired());
    }

    #[test]
    fn test_status() {
        let err = SessionError::Http {
            status: 404,
            body: String::new(),
        };
        assert_eq!(err.status(), Some(404));

        let err = SessionError::RefreshFailed(RefreshError::Status {
            status: 503,
            body: String::new(),
        });
        assert_eq!(err.status(), Some(503));

        assert_eq!(SessionError::NoRefreshToken.status(), None);
    }
}
