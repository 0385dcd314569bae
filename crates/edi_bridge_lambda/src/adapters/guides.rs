use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::http::{join_url, RetryingHttpClient};
use crate::error::BridgeError;

#[async_trait]
pub trait GuidesClient: Send + Sync {
    async fn create_guide(&self, definition: &Value) -> Result<String, BridgeError>;

    async fn publish_guide(&self, guide_id: &str) -> Result<(), BridgeError>;
}

#[derive(Deserialize)]
struct CreatedGuide {
    id: Option<String>,
}

#[derive(Serialize)]
struct PublishRequest {
    visibility: &'static str,
}

#[derive(Debug, Clone)]
pub struct HttpGuidesClient {
    http: RetryingHttpClient,
    base_url: String,
}

impl HttpGuidesClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, BridgeError> {
        Ok(Self {
            http: RetryingHttpClient::new("guides", Some(api_key))?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl GuidesClient for HttpGuidesClient {
    async fn create_guide(&self, definition: &Value) -> Result<String, BridgeError> {
        let created: CreatedGuide = self
            .http
            .post_json_for(&join_url(&self.base_url, "guides"), definition)
            .await?;
        created.id.ok_or_else(|| {
            BridgeError::service(
                self.http.service(),
                "Error creating guide (id not found in response)",
                None,
            )
        })
    }

    async fn publish_guide(&self, guide_id: &str) -> Result<(), BridgeError> {
        self.http
            .post_json(
                &join_url(&self.base_url, &format!("guides/{guide_id}/publish")),
                &PublishRequest {
                    visibility: "INTERNAL",
                },
            )
            .await
            .map(|_| ())
    }
}
