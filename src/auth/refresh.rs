// Token refresh call
//
// Runs on its own HTTP client: no bearer attachment and no refresh-on-401,
// so a rejected refresh can never trigger another refresh.

use reqwest::{Client, Url};

use crate::error::RefreshError;

use super::types::{RefreshRequest, RefreshResponse};

/// Exchange `refresh_token` for a new access token at `url`
pub async fn refresh_access_token(
    client: &Client,
    url: &Url,
    refresh_token: &str,
) -> Result<String, RefreshError> {
    tracing::info!("Refreshing access token...");

    let response = client
        .post(url.clone())
        .json(&RefreshRequest {
            token: refresh_token,
        })
        .send()
        .await
        .map_err(RefreshError::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        tracing::error!(
            status = status.as_u16(),
            body = %error_text,
            "Token refresh rejected"
        );
        return Err(RefreshError::Status {
            status: status.as_u16(),
            body: error_text,
        });
    }

    let data: RefreshResponse = response
        .json()
        .await
        .map_err(|e| RefreshError::Malformed(e.to_string()))?;

    if data.access_token.is_empty() {
        return Err(RefreshError::Malformed(
            "response does not contain accessToken".to_string(),
        ));
    }

    tracing::info!("Access token refreshed");
    Ok(data.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    async fn refresh_against(server: &mockito::ServerGuard) -> Result<String, RefreshError> {
        let url = Url::parse(&server.url()).unwrap().join("/auth/refresh").unwrap();
        refresh_access_token(&Client::new(), &url, "refresh-1").await
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({"token": "refresh-1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"accessToken":"access-2"}"#)
            .create_async()
            .await;

        assert_eq!(refresh_against(&server).await.unwrap(), "access-2");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .with_body("invalid refresh token")
            .create_async()
            .await;

        let err = refresh_against(&server).await.unwrap_err();
        assert_eq!(
            err,
            RefreshError::Status {
                status: 401,
                body: "invalid refresh token".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_refresh_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"token":"wrong-field"}"#)
            .create_async()
            .await;

        let err = refresh_against(&server).await.unwrap_err();
        assert!(matches!(err, RefreshError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_refresh_empty_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"accessToken":""}"#)
            .create_async()
            .await;

        let err = refresh_against(&server).await.unwrap_err();
        assert!(matches!(err, RefreshError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_refresh_connection_refused() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{}/auth/refresh", port)).unwrap();

        let err = refresh_access_token(&Client::new(), &url, "refresh-1")
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::Network(_)));
    }
}
