mod support;

use std::sync::Arc;

use edi_bridge_lambda::adapters::translate::TranslatedInterchange;
use edi_bridge_lambda::handlers::inbound::{
    handle_inbound_event, InboundDependencies, MISSING_OBJECT_MESSAGE,
};
use edi_bridge_lambda::test_helpers::{
    sample_inbound_envelope, single_transaction_set_interchange, FakeMappingClient,
    FakeTranslationClient, InMemoryObjectStore, RecordingWebhookClient,
};
use serde_json::json;
use support::fixtures::{
    execution_keys, inbound_config, ledger, notification_event, INBOUND_FUNCTION, SFTP_BUCKET,
};

const ORDER_KEY: &str = "trading_partners/acme/inbound/850.edi";
const BATCH_KEY: &str = "trading_partners/acme/inbound/batch.edi";

#[tokio::test]
async fn processed_key_is_delivered_once_and_removed() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert(SFTP_BUCKET, ORDER_KEY, "ISA*order~");
    let translation = FakeTranslationClient::new().with_interchange(
        "ISA*order~",
        single_transaction_set_interchange(json!({"heading": {"purchaseOrder": "PO-1"}})),
    );
    let mapping = FakeMappingClient::new()
        .with_response("MAP850", Some(json!({"orderNumber": "PO-1"})));
    let webhook = RecordingWebhookClient::new();
    let deps = InboundDependencies {
        object_store: store.as_ref(),
        translation: &translation,
        mapping: &mapping,
        webhook: &webhook,
    };

    let output = handle_inbound_event(
        notification_event(&[ORDER_KEY]),
        &ledger(&store, INBOUND_FUNCTION),
        &inbound_config(),
        &deps,
    )
    .await;

    assert_eq!(
        output,
        json!({
            "filteredKeys": [],
            "processedKeys": [ORDER_KEY],
            "processingErrors": [],
        })
    );
    assert!(!store.contains(SFTP_BUCKET, ORDER_KEY));
    assert_eq!(webhook.posts().len(), 1);
    assert_eq!(webhook.posts()[0].body, json!({"orderNumber": "PO-1"}));
    assert!(execution_keys(&store).is_empty());
}

#[tokio::test]
async fn multi_transaction_set_input_is_kept_for_inspection() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert(SFTP_BUCKET, BATCH_KEY, "ISA*batch~");
    let translation = FakeTranslationClient::new().with_interchange(
        "ISA*batch~",
        TranslatedInterchange {
            envelope: sample_inbound_envelope(),
            transaction_sets: vec![json!({"heading": {}}), json!({"heading": {}})],
        },
    );
    let mapping = FakeMappingClient::new();
    let webhook = RecordingWebhookClient::new();
    let deps = InboundDependencies {
        object_store: store.as_ref(),
        translation: &translation,
        mapping: &mapping,
        webhook: &webhook,
    };

    let output = handle_inbound_event(
        notification_event(&[BATCH_KEY]),
        &ledger(&store, INBOUND_FUNCTION),
        &inbound_config(),
        &deps,
    )
    .await;

    assert_eq!(
        output["processingErrors"],
        json!([{
            "key": BATCH_KEY,
            "error": "expected exactly 1 transaction set in input, found 2",
        }])
    );
    assert!(store.contains(SFTP_BUCKET, BATCH_KEY));
    assert!(webhook.posts().is_empty());
    assert!(execution_keys(&store).is_empty());
}

#[tokio::test]
async fn every_key_lands_in_exactly_one_outcome() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert(SFTP_BUCKET, ORDER_KEY, "ISA*order~");
    store.insert(SFTP_BUCKET, BATCH_KEY, "ISA*empty~");
    let translation = FakeTranslationClient::new().with_interchange(
        "ISA*order~",
        single_transaction_set_interchange(json!({"heading": {}})),
    );
    let mapping = FakeMappingClient::new();
    let webhook = RecordingWebhookClient::new();
    let deps = InboundDependencies {
        object_store: store.as_ref(),
        translation: &translation,
        mapping: &mapping,
        webhook: &webhook,
    };
    let keys = [
        "trading_partners/acme/inbound/",
        ORDER_KEY,
        "trading_partners/acme/outbound/855.edi",
        BATCH_KEY,
        "inbound",
    ];

    let output = handle_inbound_event(
        notification_event(&keys),
        &ledger(&store, INBOUND_FUNCTION),
        &inbound_config(),
        &deps,
    )
    .await;

    let filtered = output["filteredKeys"].as_array().expect("filtered keys");
    let processed = output["processedKeys"].as_array().expect("processed keys");
    let errors = output["processingErrors"].as_array().expect("processing errors");
    assert_eq!(filtered.len(), 3);
    assert_eq!(processed, &vec![json!(ORDER_KEY)]);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["key"], BATCH_KEY);
    assert_eq!(
        errors[0]["error"],
        "expected exactly 1 transaction set in input, found 0"
    );
    assert_eq!(filtered.len() + processed.len() + errors.len(), keys.len());
}

#[tokio::test]
async fn webhook_failure_returns_failure_payload_and_keeps_records() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert(SFTP_BUCKET, ORDER_KEY, "ISA*order~");
    let translation = FakeTranslationClient::new().with_interchange(
        "ISA*order~",
        single_transaction_set_interchange(json!({"heading": {}})),
    );
    let mapping = FakeMappingClient::new();
    let webhook = RecordingWebhookClient::new().fail_next_with(503);
    let deps = InboundDependencies {
        object_store: store.as_ref(),
        translation: &translation,
        mapping: &mapping,
        webhook: &webhook,
    };
    let ledger = ledger(&store, INBOUND_FUNCTION);
    let event = notification_event(&[ORDER_KEY]);
    let execution_id = ledger.execution_id(&event);

    let output = handle_inbound_event(event.clone(), &ledger, &inbound_config(), &deps).await;

    assert_eq!(output["statusCode"], 503);
    assert_eq!(output["message"], "execution failed");
    assert!(store.contains(SFTP_BUCKET, ORDER_KEY));
    assert_eq!(
        execution_keys(&store),
        vec![
            format!("functions/{INBOUND_FUNCTION}/{execution_id}/failure.json"),
            format!("functions/{INBOUND_FUNCTION}/{execution_id}/input.json"),
        ]
    );

    let retried = handle_inbound_event(event, &ledger, &inbound_config(), &deps).await;

    assert_eq!(retried["processedKeys"], json!([ORDER_KEY]));
    assert!(execution_keys(&store).is_empty());
    assert_eq!(webhook.posts().len(), 1);
}

#[tokio::test]
async fn retried_batch_delivers_keys_left_by_a_mid_batch_failure() {
    let store = Arc::new(InMemoryObjectStore::new());
    store.insert(SFTP_BUCKET, ORDER_KEY, "ISA*order~");
    store.insert(SFTP_BUCKET, BATCH_KEY, "ISA*order~");
    let translation = FakeTranslationClient::new().with_interchange(
        "ISA*order~",
        single_transaction_set_interchange(json!({"heading": {}})),
    );
    let mapping = FakeMappingClient::new();
    let webhook = RecordingWebhookClient::new().pass_next().fail_next_with(503);
    let deps = InboundDependencies {
        object_store: store.as_ref(),
        translation: &translation,
        mapping: &mapping,
        webhook: &webhook,
    };
    let ledger = ledger(&store, INBOUND_FUNCTION);
    let event = notification_event(&[ORDER_KEY, BATCH_KEY]);

    let first = handle_inbound_event(event.clone(), &ledger, &inbound_config(), &deps).await;

    assert_eq!(first["statusCode"], 503);
    assert!(!store.contains(SFTP_BUCKET, ORDER_KEY));
    assert!(store.contains(SFTP_BUCKET, BATCH_KEY));

    let retried = handle_inbound_event(event, &ledger, &inbound_config(), &deps).await;

    assert_eq!(retried["processedKeys"], json!([BATCH_KEY]));
    assert_eq!(
        retried["processingErrors"],
        json!([{"key": ORDER_KEY, "error": MISSING_OBJECT_MESSAGE}])
    );
    assert!(!store.contains(SFTP_BUCKET, BATCH_KEY));
    assert_eq!(webhook.posts().len(), 2);
    assert!(execution_keys(&store).is_empty());
}

#[tokio::test]
async fn missing_inbound_configuration_fails_every_invocation() {
    let store = Arc::new(InMemoryObjectStore::new());
    let translation = FakeTranslationClient::new();
    let mapping = FakeMappingClient::new();
    let webhook = RecordingWebhookClient::new();
    let deps = InboundDependencies {
        object_store: store.as_ref(),
        translation: &translation,
        mapping: &mapping,
        webhook: &webhook,
    };
    let config = support::fixtures::lookup_from(&[("FUNCTION_NAMESPACE", "x12-850")]);
    let config = edi_bridge_core::config::InboundConfig::from_lookup(&config);

    let output = handle_inbound_event(
        notification_event(&[ORDER_KEY]),
        &ledger(&store, INBOUND_FUNCTION),
        &config,
        &deps,
    )
    .await;

    assert_eq!(output["statusCode"], 500);
    assert_eq!(output["error"]["name"], "configuration_error");
    assert!(output["error"]["message"]
        .as_str()
        .expect("message")
        .contains("X12_850_GUIDE_ID"));
    assert!(translation.to_json_calls().is_empty());
}
