use async_trait::async_trait;
use edi_bridge_core::envelope::X12Envelope;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::http::{join_url, RetryingHttpClient};
use crate::error::BridgeError;

/// Guide-shaped JSON produced from an X12 interchange.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedInterchange {
    #[serde(default)]
    pub envelope: Value,
    #[serde(default)]
    pub transaction_sets: Vec<Value>,
}

#[async_trait]
pub trait TranslationClient: Send + Sync {
    async fn x12_to_json(
        &self,
        input: &str,
        guide_id: &str,
    ) -> Result<TranslatedInterchange, BridgeError>;

    async fn json_to_x12(
        &self,
        input: &Value,
        guide_id: &str,
        envelope: &X12Envelope,
    ) -> Result<String, BridgeError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToJsonRequest<'a> {
    input: &'a str,
    guide_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FromJsonRequest<'a> {
    guide_id: &'a str,
    input: &'a Value,
    envelope: &'a X12Envelope,
}

#[derive(Deserialize)]
struct TranslationOutput<T> {
    output: T,
}

#[derive(Debug, Clone)]
pub struct HttpTranslationClient {
    http: RetryingHttpClient,
    base_url: String,
}

impl HttpTranslationClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, BridgeError> {
        Ok(Self {
            http: RetryingHttpClient::new("edi-translate", Some(api_key))?,
            base_url: base_url.to_string(),
        })
    }
}

#[async_trait]
impl TranslationClient for HttpTranslationClient {
    async fn x12_to_json(
        &self,
        input: &str,
        guide_id: &str,
    ) -> Result<TranslatedInterchange, BridgeError> {
        let response: TranslationOutput<TranslatedInterchange> = self
            .http
            .post_json_for(
                &join_url(&self.base_url, "x12/to-json"),
                &ToJsonRequest { input, guide_id },
            )
            .await?;
        Ok(response.output)
    }

    async fn json_to_x12(
        &self,
        input: &Value,
        guide_id: &str,
        envelope: &X12Envelope,
    ) -> Result<String, BridgeError> {
        let response: TranslationOutput<String> = self
            .http
            .post_json_for(
                &join_url(&self.base_url, "x12/from-json"),
                &FromJsonRequest {
                    guide_id,
                    input,
                    envelope,
                },
            )
            .await?;
        Ok(response.output)
    }
}
