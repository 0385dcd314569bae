use edi_bridge_core::classifier::group_event_keys;
use edi_bridge_core::config::{ConfigError, InboundConfig};
use edi_bridge_core::contract::{parse_notification_event, KeyToProcess, ProcessingResult};
use edi_bridge_core::envelope::build_inbound_mapping_input;
use serde_json::Value;
use tracing::{info, warn};

use crate::adapters::mapping::MappingClient;
use crate::adapters::object_store::ObjectStore;
use crate::adapters::translate::TranslationClient;
use crate::adapters::webhook::WebhookClient;
use crate::error::BridgeError;
use crate::ledger::ExecutionLedger;

use super::EMPTY_MAPPING_MESSAGE;

const COMPONENT: &str = "inbound";
pub const MISSING_OBJECT_MESSAGE: &str = "object no longer exists in bucket";

pub struct InboundDependencies<'a> {
    pub object_store: &'a dyn ObjectStore,
    pub translation: &'a dyn TranslationClient,
    pub mapping: &'a dyn MappingClient,
    pub webhook: &'a dyn WebhookClient,
}

/// Outcome of a single accepted key that did not fail the whole batch.
enum KeyOutcome {
    Delivered,
    Rejected(String),
}

/// Invocation entry point: tracks the execution and always returns JSON.
pub async fn handle_inbound_event(
    event: Value,
    ledger: &ExecutionLedger,
    config: &Result<InboundConfig, ConfigError>,
    deps: &InboundDependencies<'_>,
) -> Value {
    ledger
        .track(event, |_, event| async move {
            let config = config
                .as_ref()
                .map_err(|error| BridgeError::from(error.clone()))?;
            process_inbound_event(&event, config, deps).await
        })
        .await
}

/// Classifies the notification keys and runs each accepted key through
/// read, translate, map, deliver and delete, in order.
pub async fn process_inbound_event(
    event: &Value,
    config: &InboundConfig,
    deps: &InboundDependencies<'_>,
) -> Result<ProcessingResult, BridgeError> {
    let notification = parse_notification_event(event)?;
    let grouped = group_event_keys(&notification.records);

    for filtered in &grouped.filtered_keys {
        info!(
            component = COMPONENT,
            event = "key_filtered",
            key = %filtered.key,
            reason = %filtered.reason,
        );
    }

    let mut result = ProcessingResult::from_filtered(grouped.filtered_keys);
    for item in grouped.keys_to_process {
        match process_key(&item, config, deps).await? {
            KeyOutcome::Delivered => {
                info!(
                    component = COMPONENT,
                    event = "key_processed",
                    bucket = %item.bucket_name,
                    key = %item.key,
                );
                result.record_processed(item.key);
            }
            KeyOutcome::Rejected(message) => {
                warn!(
                    component = COMPONENT,
                    event = "key_failed",
                    bucket = %item.bucket_name,
                    key = %item.key,
                    error = %message,
                );
                result.record_error(item.key, message);
            }
        }
    }

    info!(
        component = COMPONENT,
        event = "batch_summary",
        filtered = result.filtered_keys.len(),
        processed = result.processed_keys.len(),
        failed = result.processing_errors.len(),
        total = result.total_keys(),
    );
    Ok(result)
}

async fn process_key(
    item: &KeyToProcess,
    config: &InboundConfig,
    deps: &InboundDependencies<'_>,
) -> Result<KeyOutcome, BridgeError> {
    // A retried batch sees keys an earlier attempt already delivered and deleted.
    let bytes = match deps
        .object_store
        .get_object(&item.bucket_name, &item.key)
        .await
    {
        Ok(bytes) => bytes,
        Err(error) if error.is_not_found() => {
            return Ok(KeyOutcome::Rejected(MISSING_OBJECT_MESSAGE.to_string()))
        }
        Err(error) => return Err(error),
    };
    let edi = String::from_utf8_lossy(&bytes);

    let translated = deps
        .translation
        .x12_to_json(&edi, &config.resources.guide_id)
        .await?;

    let [transaction_set] = translated.transaction_sets.as_slice() else {
        return Ok(KeyOutcome::Rejected(format!(
            "expected exactly 1 transaction set in input, found {}",
            translated.transaction_sets.len()
        )));
    };

    let content = match build_inbound_mapping_input(&translated.envelope, transaction_set) {
        Ok(content) => content,
        Err(error) => return Ok(KeyOutcome::Rejected(error.message().to_string())),
    };

    let mapped = deps
        .mapping
        .map_document(&config.resources.mapping_id, &content)
        .await?;
    let Some(mapped_content) = mapped.content else {
        return Ok(KeyOutcome::Rejected(EMPTY_MAPPING_MESSAGE.to_string()));
    };

    deps.webhook
        .post_json(&config.destination_webhook_url, &mapped_content)
        .await?;

    deps.object_store
        .delete_object(&item.bucket_name, &item.key)
        .await?;
    Ok(KeyOutcome::Delivered)
}
