use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::{Client, Url};
use tokio::sync::Mutex;

use crate::error::RefreshError;
use crate::store::StoreError;

use super::credentials::CredentialStore;
use super::refresh;

type RefreshFuture = Shared<BoxFuture<'static, Result<String, RefreshError>>>;

/// Refresh running on the runtime, joined by every caller that needs it
struct InFlight {
    outcome: RefreshFuture,
    /// Set by the task itself, so completion is visible even if nobody polled `outcome`
    done: Arc<AtomicBool>,
}

impl InFlight {
    fn is_running(&self) -> bool {
        !self.done.load(Ordering::Acquire)
    }
}

/// Authentication manager
/// Owns the stored credentials and coordinates token refresh across requests
pub struct AuthManager {
    /// Stored session credentials
    credentials: CredentialStore,

    /// Dedicated client for refresh requests (never intercepted)
    client: Client,

    /// Refresh endpoint
    refresh_url: Url,

    /// Refresh currently in flight
    in_flight: Mutex<Option<InFlight>>,
}

impl AuthManager {
    /// Create a new AuthManager
    pub fn new(credentials: CredentialStore, refresh_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create refresh HTTP client")?;

        Ok(Self {
            credentials,
            client,
            refresh_url,
            in_flight: Mutex::new(None),
        })
    }

    /// Stored session credentials
    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    /// Current access token, if any
    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.credentials.access_token()
    }

    /// Obtain a usable access token after the server rejected `rejected`.
    ///
    /// If the stored token has already changed since the rejected request was
    /// sent, it is returned without refreshing. Otherwise joins the refresh in
    /// flight or starts one; all concurrent callers observe the same outcome.
    /// The refresh runs as its own task and completes even if every caller
    /// is cancelled. On failure the session has been cleared.
    pub async fn recover(&self, rejected: Option<&str>) -> Result<String, RefreshError> {
        let outcome = {
            let mut slot = self.in_flight.lock().await;

            if let Some(current) = self.credentials.access_token()? {
                if Some(current.as_str()) != rejected {
                    tracing::debug!("Access token rotated since request was sent");
                    return Ok(current);
                }
            }

            match slot.as_ref() {
                Some(pending) if pending.is_running() => {
                    tracing::debug!("Joining token refresh already in flight");
                    pending.outcome.clone()
                }
                _ if self.credentials.is_empty()? => {
                    tracing::debug!("Session already cleared, nothing to refresh");
                    return Err(RefreshError::NoRefreshToken);
                }
                _ => {
                    let pending = self.spawn_refresh();
                    let outcome = pending.outcome.clone();
                    *slot = Some(pending);
                    outcome
                }
            }
        };

        let result = outcome.await;

        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|p| !p.is_running()) {
            *slot = None;
        }

        result
    }

    fn spawn_refresh(&self) -> InFlight {
        let done = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn({
            let client = self.client.clone();
            let url = self.refresh_url.clone();
            let credentials = self.credentials.clone();
            let done = done.clone();
            async move {
                let outcome = Self::run_refresh(client, url, credentials).await;
                done.store(true, Ordering::Release);
                outcome
            }
        });

        let done_on_join = done.clone();

        let outcome = async move {
            let joined = task.await;
            done_on_join.store(true, Ordering::Release);
            match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Token refresh task failed: {}", e);
                    Err(RefreshError::Interrupted(e.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        InFlight { outcome, done }
    }

    /// Refresh the access token, wiping the session on any failure
    async fn run_refresh(
        client: Client,
        url: Url,
        credentials: CredentialStore,
    ) -> Result<String, RefreshError> {
        let outcome = async {
            let refresh_token = credentials
                .refresh_token()?
                .ok_or(RefreshError::NoRefreshToken)?;

            let token = refresh::refresh_access_token(&client, &url, &refresh_token).await?;
            credentials.set_access_token(&token)?;
            Ok::<_, RefreshError>(token)
        }
        .await;

        match &outcome {
            Ok(token) => {
                tracing::debug!(
                    "Stored refreshed access token ({}...)",
                    token.chars().take(8).collect::<String>()
                );
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {}", e);
                match credentials.clear() {
                    Ok(()) => tracing::warn!("Session credentials cleared"),
                    Err(clear_err) => {
                        tracing::error!("Failed to clear session credentials: {}", clear_err)
                    }
                }
            }
        }

        outcome
    }
}
