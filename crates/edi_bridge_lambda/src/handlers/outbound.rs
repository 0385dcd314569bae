use chrono::{DateTime, Utc};
use edi_bridge_core::config::{required_transaction_set, ConfigError, OutboundConfig};
use edi_bridge_core::contract::{OutboundSuccessResponse, ValidationError, OUTBOUND_SUCCESS_STATUS_CODE};
use edi_bridge_core::envelope::{
    build_outbound_envelope, build_outbound_mapping_input, format_control_number, EnvelopeProfile,
    CONTROL_NUMBER_KEYSPACE,
};
use edi_bridge_core::execution::ExecutionId;
use edi_bridge_core::storage_keys::outbound_document_key;
use serde_json::Value;
use tracing::info;

use super::EMPTY_MAPPING_MESSAGE;
use crate::adapters::mapping::MappingClient;
use crate::adapters::object_store::ObjectStore;
use crate::adapters::sequence::SequenceClient;
use crate::adapters::translate::TranslationClient;
use crate::error::BridgeError;
use crate::ledger::ExecutionLedger;

const COMPONENT: &str = "outbound";
pub const CONTROL_NUMBER_ISSUE_MESSAGE: &str = "Issue generating control number";

pub struct OutboundDependencies<'a> {
    pub object_store: &'a dyn ObjectStore,
    pub sequence: &'a dyn SequenceClient,
    pub mapping: &'a dyn MappingClient,
    pub translation: &'a dyn TranslationClient,
}

/// Invocation entry point: tracks the execution and always returns JSON.
///
/// `document_date` stamps both envelope headers.
pub async fn handle_outbound_event(
    event: Value,
    ledger: &ExecutionLedger,
    config: &Result<OutboundConfig, ConfigError>,
    deps: &OutboundDependencies<'_>,
    document_date: DateTime<Utc>,
) -> Value {
    ledger
        .track(event, |execution_id, event| async move {
            write_outbound_document(&execution_id, &event, ledger, config, deps, document_date)
                .await
        })
        .await
}

pub async fn write_outbound_document(
    execution_id: &ExecutionId,
    input: &Value,
    ledger: &ExecutionLedger,
    config: &Result<OutboundConfig, ConfigError>,
    deps: &OutboundDependencies<'_>,
    document_date: DateTime<Utc>,
) -> Result<OutboundSuccessResponse, BridgeError> {
    let transaction_set = required_transaction_set(input)?;
    let fields = input
        .as_object()
        .ok_or(ConfigError::MissingTransactionSet)?;

    let config = config
        .as_ref()
        .map_err(|error| BridgeError::from(error.clone()))?;
    let resources = config.resources_for(transaction_set)?;

    let issued = issue_control_number(execution_id, ledger, &config.envelope, deps.sequence).await?;
    let control_number = format_control_number(issued)?;
    let envelope = build_outbound_envelope(&config.envelope, &control_number, document_date);

    let mapped = deps
        .mapping
        .map_document(
            &resources.mapping_id,
            &build_outbound_mapping_input(&control_number, fields),
        )
        .await?;
    let Some(content) = mapped.content else {
        return Err(ValidationError::new(EMPTY_MAPPING_MESSAGE).into());
    };

    let x12 = deps
        .translation
        .json_to_x12(&content, &resources.guide_id, &envelope)
        .await?;

    let key = outbound_document_key(&config.envelope.receiver_id, &control_number);
    deps.object_store
        .put_object(&config.output_bucket, &key, x12.into_bytes())
        .await?;
    info!(
        component = COMPONENT,
        event = "document_written",
        transaction_set = transaction_set,
        bucket = %config.output_bucket,
        key = %key,
        control_number = %control_number,
    );

    Ok(OutboundSuccessResponse {
        status_code: OUTBOUND_SUCCESS_STATUS_CODE,
        bucket_name: config.output_bucket.clone(),
        key,
        control_number,
    })
}

/// Reuses the number already issued to this execution, otherwise draws the
/// next one and records it before any later step can fail.
async fn issue_control_number(
    execution_id: &ExecutionId,
    ledger: &ExecutionLedger,
    profile: &EnvelopeProfile,
    sequence: &dyn SequenceClient,
) -> Result<i64, BridgeError> {
    if let Some(value) = ledger.issued_control_number(execution_id).await? {
        info!(
            component = COMPONENT,
            event = "control_number_reused",
            control_number = value,
        );
        return Ok(value);
    }

    let sequence_key = profile.sequence_key();
    let value = sequence
        .increment_value(CONTROL_NUMBER_KEYSPACE, &sequence_key, 1)
        .await?
        .ok_or_else(|| BridgeError::service("stash", CONTROL_NUMBER_ISSUE_MESSAGE, None))?;
    ledger.record_issued_control_number(execution_id, value).await?;
    info!(
        component = COMPONENT,
        event = "control_number_issued",
        sequence_key = %sequence_key,
        control_number = value,
    );
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::test_helpers::{
        CountingSequenceClient, FakeMappingClient, FakeTranslationClient, InMemoryObjectStore,
    };

    const EXECUTIONS: &str = "executions";
    const SFTP: &str = "sftp-bucket";

    fn config() -> Result<OutboundConfig, ConfigError> {
        let values: HashMap<&str, &str> = HashMap::from([
            ("ENABLED_TRANSACTION_SETS", "x12-850"),
            ("X12_850_GUIDE_ID", "GUIDE850"),
            ("X12_850_MAPPING_ID", "MAP850"),
            ("SFTP_BUCKET_NAME", SFTP),
        ]);
        OutboundConfig::from_lookup(&|name: &str| values.get(name).map(|value| value.to_string()))
    }

    fn document_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7)
            .single()
            .expect("valid timestamp")
    }

    fn ledger(store: &Arc<InMemoryObjectStore>) -> ExecutionLedger {
        ExecutionLedger::new(store.clone(), EXECUTIONS, "write-outbound-edi")
    }

    #[tokio::test]
    async fn writes_enveloped_document_with_padded_control_number() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sequence = CountingSequenceClient::starting_after(41);
        let mapping = FakeMappingClient::new();
        let translation = FakeTranslationClient::new().with_x12_output("ISA*...~");
        let deps = OutboundDependencies {
            object_store: store.as_ref(),
            sequence: &sequence,
            mapping: &mapping,
            translation: &translation,
        };

        let output = handle_outbound_event(
            json!({"transactionSet": "x12-850", "purchaseOrder": "PO-1"}),
            &ledger(&store),
            &config(),
            &deps,
            document_date(),
        )
        .await;

        let key = "trading_partners/ANOTHERMERCH/outbound/000000042.edi";
        assert_eq!(
            output,
            json!({
                "statusCode": 200,
                "bucketName": SFTP,
                "key": key,
                "controlNumber": "000000042",
            })
        );
        assert_eq!(store.object(SFTP, key), Some(b"ISA*...~".to_vec()));
        assert!(store.keys(EXECUTIONS).is_empty());

        let map_calls = mapping.calls();
        assert_eq!(map_calls[0].mapping_id, "MAP850");
        assert_eq!(
            map_calls[0].content,
            json!({
                "controlNumber": "000000042",
                "transactionSet": "x12-850",
                "purchaseOrder": "PO-1",
            })
        );

        let from_json = translation.from_json_calls();
        assert_eq!(from_json[0].guide_id, "GUIDE850");
        let envelope = &from_json[0].envelope;
        assert_eq!(envelope.interchange_header.control_number, "000000042");
        assert_eq!(envelope.group_header.control_number, "000000042");
        assert_eq!(envelope.interchange_header.date, "2026-03-01");
        assert_eq!(envelope.interchange_header.time, "09:05");
        assert_eq!(envelope.group_header.time, "09:05:07");
    }

    #[tokio::test]
    async fn missing_transaction_set_fails_before_any_external_call() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sequence = CountingSequenceClient::starting_after(0);
        let mapping = FakeMappingClient::new();
        let translation = FakeTranslationClient::new();
        let deps = OutboundDependencies {
            object_store: store.as_ref(),
            sequence: &sequence,
            mapping: &mapping,
            translation: &translation,
        };

        let output = handle_outbound_event(
            json!({"purchaseOrder": "PO-1"}),
            &ledger(&store),
            &config(),
            &deps,
            document_date(),
        )
        .await;

        assert_eq!(output["statusCode"], 500);
        assert_eq!(
            output["error"]["message"],
            "Required property `transactionSet` missing from input event"
        );
        assert_eq!(sequence.call_count(), 0);
        assert!(mapping.calls().is_empty());
    }

    #[tokio::test]
    async fn retry_after_failure_reuses_issued_control_number() {
        let store = Arc::new(InMemoryObjectStore::new());
        let ledger = ledger(&store);
        let sequence = CountingSequenceClient::starting_after(99);
        let mapping = FakeMappingClient::new();
        let event = json!({"transactionSet": "x12-850", "purchaseOrder": "PO-7"});

        let failing_translation = FakeTranslationClient::new().failing_with(503);
        let first = handle_outbound_event(
            event.clone(),
            &ledger,
            &config(),
            &OutboundDependencies {
                object_store: store.as_ref(),
                sequence: &sequence,
                mapping: &mapping,
                translation: &failing_translation,
            },
            document_date(),
        )
        .await;
        assert_eq!(first["statusCode"], 503);

        let translation = FakeTranslationClient::new();
        let second = handle_outbound_event(
            event,
            &ledger,
            &config(),
            &OutboundDependencies {
                object_store: store.as_ref(),
                sequence: &sequence,
                mapping: &mapping,
                translation: &translation,
            },
            document_date(),
        )
        .await;

        assert_eq!(second["controlNumber"], "000000100");
        assert_eq!(sequence.call_count(), 1);
        assert!(store.keys(EXECUTIONS).is_empty());
    }

    #[tokio::test]
    async fn absent_sequence_value_is_reported() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sequence = CountingSequenceClient::without_value();
        let mapping = FakeMappingClient::new();
        let translation = FakeTranslationClient::new();
        let deps = OutboundDependencies {
            object_store: store.as_ref(),
            sequence: &sequence,
            mapping: &mapping,
            translation: &translation,
        };

        let output = handle_outbound_event(
            json!({"transactionSet": "x12-850"}),
            &ledger(&store),
            &config(),
            &deps,
            document_date(),
        )
        .await;

        assert_eq!(output["statusCode"], 500);
        assert!(output["error"]["message"]
            .as_str()
            .expect("message should be a string")
            .contains(CONTROL_NUMBER_ISSUE_MESSAGE));
        assert!(mapping.calls().is_empty());
    }

    #[tokio::test]
    async fn disabled_transaction_set_is_a_configuration_error() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sequence = CountingSequenceClient::starting_after(0);
        let mapping = FakeMappingClient::new();
        let translation = FakeTranslationClient::new();
        let deps = OutboundDependencies {
            object_store: store.as_ref(),
            sequence: &sequence,
            mapping: &mapping,
            translation: &translation,
        };

        let output = handle_outbound_event(
            json!({"transactionSet": "x12-855"}),
            &ledger(&store),
            &config(),
            &deps,
            document_date(),
        )
        .await;

        assert_eq!(output["error"]["name"], "configuration_error");
        assert_eq!(sequence.call_count(), 0);
    }

    #[tokio::test]
    async fn configuration_load_failure_is_returned_per_invocation() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sequence = CountingSequenceClient::starting_after(0);
        let mapping = FakeMappingClient::new();
        let translation = FakeTranslationClient::new();
        let deps = OutboundDependencies {
            object_store: store.as_ref(),
            sequence: &sequence,
            mapping: &mapping,
            translation: &translation,
        };
        let broken = Err(ConfigError::MissingVariable {
            name: "X12_850_MAPPING_ID".to_string(),
        });

        let output = handle_outbound_event(
            json!({"transactionSet": "x12-850"}),
            &ledger(&store),
            &broken,
            &deps,
            document_date(),
        )
        .await;

        assert_eq!(output["statusCode"], 500);
        assert!(output["error"]["message"]
            .as_str()
            .expect("message should be a string")
            .contains("X12_850_MAPPING_ID"));
    }

    #[tokio::test]
    async fn empty_mapping_fails_without_writing_output() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sequence = CountingSequenceClient::starting_after(0);
        let mapping = FakeMappingClient::new().with_response("MAP850", None);
        let translation = FakeTranslationClient::new();
        let deps = OutboundDependencies {
            object_store: store.as_ref(),
            sequence: &sequence,
            mapping: &mapping,
            translation: &translation,
        };

        let output = handle_outbound_event(
            json!({"transactionSet": "x12-850"}),
            &ledger(&store),
            &config(),
            &deps,
            document_date(),
        )
        .await;

        assert_eq!(output["error"]["message"], EMPTY_MAPPING_MESSAGE);
        assert!(store.keys(SFTP).is_empty());
        assert!(translation.from_json_calls().is_empty());
    }

    #[tokio::test]
    async fn mapping_not_found_status_is_echoed() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sequence = CountingSequenceClient::starting_after(0);
        let mapping = FakeMappingClient::new().failing_with(404);
        let translation = FakeTranslationClient::new();
        let deps = OutboundDependencies {
            object_store: store.as_ref(),
            sequence: &sequence,
            mapping: &mapping,
            translation: &translation,
        };

        let output = handle_outbound_event(
            json!({"transactionSet": "x12-850"}),
            &ledger(&store),
            &config(),
            &deps,
            document_date(),
        )
        .await;

        assert_eq!(output["statusCode"], 404);
        assert_eq!(output["error"]["statusCode"], 404);
    }

    #[tokio::test]
    async fn input_fields_override_generated_control_number_in_mapping_input() {
        let store = Arc::new(InMemoryObjectStore::new());
        let sequence = CountingSequenceClient::starting_after(0);
        let mapping = FakeMappingClient::new();
        let translation = FakeTranslationClient::new();
        let deps = OutboundDependencies {
            object_store: store.as_ref(),
            sequence: &sequence,
            mapping: &mapping,
            translation: &translation,
        };

        handle_outbound_event(
            json!({"transactionSet": "x12-850", "controlNumber": "CUSTOM"}),
            &ledger(&store),
            &config(),
            &deps,
            document_date(),
        )
        .await;

        assert_eq!(mapping.calls()[0].content["controlNumber"], "CUSTOM");
    }
}
