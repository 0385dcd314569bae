use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::http::{join_url, RetryingHttpClient};
use crate::error::BridgeError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappedDocument {
    /// `None` when the mapping produced no content (absent or JSON null).
    #[serde(default)]
    pub content: Option<Value>,
}

#[async_trait]
pub trait MappingClient: Send + Sync {
    async fn map_document(
        &self,
        mapping_id: &str,
        content: &Value,
    ) -> Result<MappedDocument, BridgeError>;
}

/// Creation side of the mappings API, used only by setup tooling.
#[async_trait]
pub trait MappingCatalog: Send + Sync {
    async fn create_mapping(&self, definition: &Value) -> Result<String, BridgeError>;
}

#[derive(Deserialize)]
struct CreatedResource {
    id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpMappingClient {
    http: RetryingHttpClient,
    base_url: String,
}

impl HttpMappingClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, BridgeError> {
        Ok(Self {
            http: RetryingHttpClient::new("mappings", Some(api_key))?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl MappingClient for HttpMappingClient {
    async fn map_document(
        &self,
        mapping_id: &str,
        content: &Value,
    ) -> Result<MappedDocument, BridgeError> {
        self.http
            .post_json_for(
                &join_url(&self.base_url, &format!("mappings/{mapping_id}/map")),
                content,
            )
            .await
    }
}

#[async_trait]
impl MappingCatalog for HttpMappingClient {
    async fn create_mapping(&self, definition: &Value) -> Result<String, BridgeError> {
        let created: CreatedResource = self
            .http
            .post_json_for(&join_url(&self.base_url, "mappings"), definition)
            .await?;
        created.id.ok_or_else(|| {
            BridgeError::service(
                self.http.service(),
                "Error creating mapping (id not found in response)",
                None,
            )
        })
    }
}
