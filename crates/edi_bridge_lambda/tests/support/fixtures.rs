use std::collections::HashMap;
use std::sync::Arc;

use edi_bridge_core::config::{InboundConfig, OutboundConfig};
use edi_bridge_core::ConfigError;
use edi_bridge_lambda::ledger::ExecutionLedger;
use edi_bridge_lambda::test_helpers::InMemoryObjectStore;
use serde_json::{json, Value};

pub const EXECUTIONS_BUCKET: &str = "edi-bridge-executions";
pub const SFTP_BUCKET: &str = "edi-bridge-sftp";
pub const INBOUND_FUNCTION: &str = "read-inbound-edi";
pub const OUTBOUND_FUNCTION: &str = "write-outbound-edi";

pub fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    move |name: &str| values.get(name).cloned()
}

pub fn inbound_config() -> Result<InboundConfig, ConfigError> {
    let lookup = lookup_from(&[
        ("FUNCTION_NAMESPACE", "x12-850"),
        ("X12_850_GUIDE_ID", "GUIDE850"),
        ("X12_850_MAPPING_ID", "MAP850"),
        ("READ_DESTINATION_WEBHOOK_URL", "https://erp.example.com/edi"),
    ]);
    InboundConfig::from_lookup(&lookup)
}

pub fn outbound_config() -> Result<OutboundConfig, ConfigError> {
    let lookup = lookup_from(&[
        ("ENABLED_TRANSACTION_SETS", "x12-850,x12-855"),
        ("X12_850_GUIDE_ID", "GUIDE850"),
        ("X12_850_MAPPING_ID", "MAP850"),
        ("X12_855_GUIDE_ID", "GUIDE855"),
        ("X12_855_MAPPING_ID", "MAP855"),
        ("SFTP_BUCKET_NAME", SFTP_BUCKET),
    ]);
    OutboundConfig::from_lookup(&lookup)
}

pub fn notification_event(keys: &[&str]) -> Value {
    json!({
        "Records": keys
            .iter()
            .map(|key| {
                json!({
                    "eventName": "ObjectCreated:Put",
                    "s3": {
                        "bucket": {"name": SFTP_BUCKET},
                        "object": {"key": key, "size": 128}
                    }
                })
            })
            .collect::<Vec<_>>()
    })
}

pub fn ledger(store: &Arc<InMemoryObjectStore>, function_name: &str) -> ExecutionLedger {
    ExecutionLedger::new(store.clone(), EXECUTIONS_BUCKET, function_name)
}

pub fn execution_keys(store: &InMemoryObjectStore) -> Vec<String> {
    store.keys(EXECUTIONS_BUCKET)
}
