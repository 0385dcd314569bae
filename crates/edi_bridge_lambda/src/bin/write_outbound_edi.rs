use std::sync::Arc;

use chrono::Utc;
use edi_bridge_core::config::{process_env_lookup, OutboundConfig, PlatformSettings};
use edi_bridge_core::ConfigError;
use edi_bridge_lambda::adapters::mapping::HttpMappingClient;
use edi_bridge_lambda::adapters::object_store::S3ObjectStore;
use edi_bridge_lambda::adapters::sequence::HttpSequenceClient;
use edi_bridge_lambda::adapters::translate::HttpTranslationClient;
use edi_bridge_lambda::handlers::outbound::{handle_outbound_event, OutboundDependencies};
use edi_bridge_lambda::ledger::ExecutionLedger;
use edi_bridge_lambda::telemetry::{init_logging, LogFormat};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

struct OutboundRuntime {
    ledger: ExecutionLedger,
    config: Result<OutboundConfig, ConfigError>,
    object_store: Arc<S3ObjectStore>,
    sequence: HttpSequenceClient,
    mapping: HttpMappingClient,
    translation: HttpTranslationClient,
}

impl OutboundRuntime {
    async fn from_env() -> Result<Self, Error> {
        let settings = PlatformSettings::from_lookup(&process_env_lookup)
            .map_err(|error| Error::from(format!("invalid platform configuration: {error}")))?;
        let object_store = Arc::new(S3ObjectStore::from_env().await);

        Ok(Self {
            ledger: ExecutionLedger::from_settings(object_store.clone(), &settings),
            config: OutboundConfig::from_lookup(&process_env_lookup),
            object_store,
            sequence: HttpSequenceClient::new(&settings.endpoints.stash, &settings.api_key)?,
            mapping: HttpMappingClient::new(&settings.endpoints.mappings, &settings.api_key)?,
            translation: HttpTranslationClient::new(
                &settings.endpoints.translate,
                &settings.api_key,
            )?,
        })
    }

    async fn handle(&self, event: LambdaEvent<Value>) -> Result<Value, Error> {
        let deps = OutboundDependencies {
            object_store: self.object_store.as_ref(),
            sequence: &self.sequence,
            mapping: &self.mapping,
            translation: &self.translation,
        };
        Ok(handle_outbound_event(
            event.payload,
            &self.ledger,
            &self.config,
            &deps,
            Utc::now(),
        )
        .await)
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(LogFormat::from_env());

    let runtime = Arc::new(OutboundRuntime::from_env().await?);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let runtime = runtime.clone();
        async move { runtime.handle(event).await }
    }))
    .await
}
