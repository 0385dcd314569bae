//! Retrying JSON-over-HTTP client shared by every platform adapter.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::BridgeError;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_BASE: Duration = Duration::from_millis(100);
const BACKOFF_MAX: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BACKOFF_BASE,
            max_delay: BACKOFF_MAX,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the given (1-based) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout()
}

#[derive(Debug, Clone)]
pub struct RetryingHttpClient {
    service: &'static str,
    client: reqwest::Client,
    authorization: Option<String>,
    retry: RetryPolicy,
}

impl RetryingHttpClient {
    pub fn new(service: &'static str, api_key: Option<&str>) -> Result<Self, BridgeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|error| {
                BridgeError::service(service, format!("failed to build http client: {error}"), None)
            })?;

        Ok(Self {
            service,
            client,
            authorization: api_key.map(|key| format!("Key {key}")),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// POSTs a JSON body, retrying transient failures, and returns the first
    /// successful response.
    pub async fn post_json<B>(&self, url: &str, body: &B) -> Result<Response, BridgeError>
    where
        B: Serialize + ?Sized,
    {
        let mut attempt = 1u32;
        loop {
            let mut request = self.client.post(url).json(body);
            if let Some(authorization) = &self.authorization {
                request = request.header(AUTHORIZATION, authorization);
            }

            let retry_reason = match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable_status(status) || attempt >= self.retry.max_attempts {
                        let message = error_body_message(response).await;
                        return Err(BridgeError::service(
                            self.service,
                            format!("{status}: {message}"),
                            Some(status.as_u16()),
                        ));
                    }
                    format!("status {status}")
                }
                Err(error) => {
                    if !is_transient(&error) || attempt >= self.retry.max_attempts {
                        return Err(BridgeError::service(
                            self.service,
                            error.to_string(),
                            error.status().map(|status| status.as_u16()),
                        ));
                    }
                    error.to_string()
                }
            };

            let delay = self.retry.delay_after(attempt);
            tracing::warn!(
                component = "http_client",
                event = "request_retry",
                service = self.service,
                attempt,
                delay_ms = delay.as_millis() as u64,
                reason = %retry_reason,
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    pub async fn post_json_for<B, T>(&self, url: &str, body: &B) -> Result<T, BridgeError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.post_json(url, body).await?;
        response.json::<T>().await.map_err(|error| {
            BridgeError::service(self.service, format!("invalid response body: {error}"), None)
        })
    }
}

async fn error_body_message(response: Response) -> String {
    let body = match response.bytes().await {
        Ok(body) => body,
        Err(error) => return format!("failed reading error body: {error}"),
    };

    serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|message| message.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string())
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
