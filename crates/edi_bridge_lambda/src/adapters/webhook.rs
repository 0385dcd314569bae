use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::http::RetryingHttpClient;
use crate::error::BridgeError;

/// Delivers mapped documents; the response body is never consumed.
#[async_trait]
pub trait WebhookClient: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<(), BridgeError>;
}

#[derive(Debug, Clone)]
pub struct HttpWebhookClient {
    http: RetryingHttpClient,
}

impl HttpWebhookClient {
    pub fn new() -> Result<Self, BridgeError> {
        Ok(Self {
            http: RetryingHttpClient::new("webhook", None)?,
        })
    }
}

#[async_trait]
impl WebhookClient for HttpWebhookClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<(), BridgeError> {
        self.http.post_json(url, body).await.map(|_| ())
    }
}
