use std::sync::Arc;

use edi_bridge_core::config::{process_env_lookup, InboundConfig, PlatformSettings};
use edi_bridge_core::ConfigError;
use edi_bridge_lambda::adapters::mapping::HttpMappingClient;
use edi_bridge_lambda::adapters::object_store::S3ObjectStore;
use edi_bridge_lambda::adapters::translate::HttpTranslationClient;
use edi_bridge_lambda::adapters::webhook::HttpWebhookClient;
use edi_bridge_lambda::handlers::inbound::{handle_inbound_event, InboundDependencies};
use edi_bridge_lambda::ledger::ExecutionLedger;
use edi_bridge_lambda::telemetry::{init_logging, LogFormat};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct InboundRuntime {
    ledger: ExecutionLedger,
    config: Result<InboundConfig, ConfigError>,
    object_store: Arc<S3ObjectStore>,
    translation: HttpTranslationClient,
    mapping: HttpMappingClient,
    webhook: HttpWebhookClient,
}

impl InboundRuntime {
    async fn from_env() -> Result<Self, Error> {
        let settings = PlatformSettings::from_lookup(&process_env_lookup)
            .map_err(|error| Error::from(format!("invalid platform configuration: {error}")))?;
        let object_store = Arc::new(S3ObjectStore::from_env().await);

        Ok(Self {
            ledger: ExecutionLedger::from_settings(object_store.clone(), &settings),
            config: InboundConfig::from_lookup(&process_env_lookup),
            object_store,
            translation: HttpTranslationClient::new(
                &settings.endpoints.translate,
                &settings.api_key,
            )?,
            mapping: HttpMappingClient::new(&settings.endpoints.mappings, &settings.api_key)?,
            webhook: HttpWebhookClient::new()?,
        })
    }

    async fn handle(&self, event: LambdaEvent<Value>) -> Result<Value, Error> {
        let deps = InboundDependencies {
            object_store: self.object_store.as_ref(),
            translation: &self.translation,
            mapping: &self.mapping,
            webhook: &self.webhook,
        };
        Ok(handle_inbound_event(event.payload, &self.ledger, &self.config, &deps).await)
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(LogFormat::from_env());

    let runtime = Arc::new(InboundRuntime::from_env().await?);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let runtime = runtime.clone();
        async move { runtime.handle(event).await }
    }))
    .await
}
