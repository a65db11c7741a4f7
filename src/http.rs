//! HTTP transport for tracking sync payloads.
//!
//! Payloads are POSTed as JSON to `{base_url}/fitness/trackingData`:
//! - `submit` spawns the request on a tokio runtime and returns immediately
//! - Network errors, 429 and 5xx are retried with exponential backoff
//! - Other 4xx responses are final

use std::time::Duration;

use base64::Engine;
use log::{debug, info, warn};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use tokio::runtime::Handle;

use crate::error::{Result, TrackError};
use crate::sync::{SyncAdapter, SyncPayload};

const TRACKING_PATH: &str = "/fitness/trackingData";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Credentials attached to every request.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpAuth {
    Bearer(String),
    Basic { username: String, password: String },
}

impl HttpAuth {
    fn header_value(&self) -> String {
        match self {
            HttpAuth::Bearer(token) => format!("Bearer {}", token),
            HttpAuth::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                format!("Basic {}", encoded)
            }
        }
    }
}

/// Retry schedule for failed deliveries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Attempts after the first one. Default: 3
    pub max_retries: u32,
    /// First backoff, doubled on each retry. Default: 500 ms
    pub base_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff_ms: 500,
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, retry: u32) -> Duration {
        // 500ms, 1s, 2s, 4s...
        Duration::from_millis(self.base_backoff_ms.saturating_mul(1 << (retry - 1).min(10)))
    }
}

/// Sync adapter delivering payloads over HTTP.
pub struct HttpSyncAdapter {
    client: Client,
    endpoint: String,
    auth_header: Option<String>,
    retry: RetryPolicy,
    runtime: Handle,
}

impl HttpSyncAdapter {
    /// Adapter posting to `base_url`, spawning deliveries on `runtime`.
    pub fn new(base_url: &str, auth: Option<HttpAuth>, runtime: Handle) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TrackError::ConfigError {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), TRACKING_PATH),
            auth_header: auth.map(|a| a.header_value()),
            retry: RetryPolicy::default(),
            runtime,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Deliver one payload, retrying transient failures.
    pub async fn post(&self, payload: &SyncPayload) -> Result<()> {
        deliver(
            &self.client,
            &self.endpoint,
            self.auth_header.as_deref(),
            self.retry,
            payload,
        )
        .await
    }
}

impl SyncAdapter for HttpSyncAdapter {
    fn submit(&self, payload: SyncPayload) -> Result<()> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let auth = self.auth_header.clone();
        let retry = self.retry;

        self.runtime.spawn(async move {
            let is_final = payload.is_final_sync;
            match deliver(&client, &endpoint, auth.as_deref(), retry, &payload).await {
                Ok(()) => info!(
                    "[HttpSyncAdapter] Delivered {} sync",
                    if is_final { "final" } else { "periodic" }
                ),
                Err(e) => warn!("[HttpSyncAdapter] Giving up on sync: {}", e),
            }
        });
        Ok(())
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

async fn deliver(
    client: &Client,
    endpoint: &str,
    auth: Option<&str>,
    retry: RetryPolicy,
    payload: &SyncPayload,
) -> Result<()> {
    let mut retries = 0;

    loop {
        let mut request = client.post(endpoint).json(payload);
        if let Some(auth) = auth {
            request = request.header(AUTHORIZATION, auth);
        }

        let failure = match request.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    debug!("[HttpSyncAdapter] {} -> {}", endpoint, status);
                    return Ok(());
                }
                let error = TrackError::SyncError {
                    message: format!("HTTP {}", status),
                    status_code: Some(status.as_u16()),
                };
                if !is_retryable(status) {
                    return Err(error);
                }
                error
            }
            Err(e) => TrackError::SyncError {
                message: format!("Request error: {}", e),
                status_code: None,
            },
        };

        retries += 1;
        if retries > retry.max_retries {
            return Err(failure);
        }

        let backoff = retry.backoff(retries);
        warn!(
            "[HttpSyncAdapter] {}, retry {} after {:?}",
            failure, retries, backoff
        );
        tokio::time::sleep(backoff).await;
    }
}
