use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapters::http::{join_url, RetryingHttpClient};
use crate::error::BridgeError;

/// Atomic counter service; atomicity of the increment is its responsibility.
#[async_trait]
pub trait SequenceClient: Send + Sync {
    async fn increment_value(
        &self,
        keyspace: &str,
        key: &str,
        amount: i64,
    ) -> Result<Option<i64>, BridgeError>;
}

#[derive(Serialize)]
struct IncrementRequest {
    amount: i64,
}

#[derive(Deserialize)]
struct IncrementResponse {
    #[serde(default)]
    value: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct HttpSequenceClient {
    http: RetryingHttpClient,
    base_url: String,
}

impl HttpSequenceClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, BridgeError> {
        Ok(Self {
            http: RetryingHttpClient::new("stash", Some(api_key))?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl SequenceClient for HttpSequenceClient {
    async fn increment_value(
        &self,
        keyspace: &str,
        key: &str,
        amount: i64,
    ) -> Result<Option<i64>, BridgeError> {
        let response: IncrementResponse = self
            .http
            .post_json_for(
                &join_url(
                    &self.base_url,
                    &format!("keyspaces/{keyspace}/keys/{key}/increment"),
                ),
                &IncrementRequest { amount },
            )
            .await?;
        Ok(response.value)
    }
}
