//! In-memory and recording fakes for every adapter trait.
//!
//! Available to unit tests and, through the `test-helpers` feature, to the
//! integration tests under `tests/`.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use edi_bridge_core::envelope::X12Envelope;
use serde_json::{json, Value};

use crate::adapters::guides::GuidesClient;
use crate::adapters::mapping::{MappedDocument, MappingCatalog, MappingClient};
use crate::adapters::object_store::ObjectStore;
use crate::adapters::sequence::SequenceClient;
use crate::adapters::translate::{TranslatedInterchange, TranslationClient};
use crate::adapters::webhook::WebhookClient;
use crate::error::{BridgeError, NOT_FOUND_STATUS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectOperation {
    Get { bucket: String, key: String },
    Put { bucket: String, key: String },
    Delete { bucket: String, key: String },
}

#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    operations: Mutex<Vec<ObjectOperation>>,
    failing_put_suffixes: Mutex<BTreeSet<String>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, bucket: &str, key: &str, body: impl Into<Vec<u8>>) {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .insert((bucket.to_string(), key.to_string()), body.into());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn json_object(&self, bucket: &str, key: &str) -> Option<Value> {
        self.object(bucket, key)
            .map(|bytes| serde_json::from_slice(&bytes).expect("stored object should be JSON"))
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.object(bucket, key).is_some()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .keys()
            .filter(|(stored_bucket, _)| stored_bucket == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn operations(&self) -> Vec<ObjectOperation> {
        self.operations.lock().expect("poisoned mutex").clone()
    }

    /// Every later `put_object` whose key ends with `suffix` fails with a 503.
    pub fn fail_puts_ending_with(&self, suffix: &str) {
        self.failing_put_suffixes
            .lock()
            .expect("poisoned mutex")
            .insert(suffix.to_string());
    }

    fn record(&self, operation: ObjectOperation) {
        self.operations
            .lock()
            .expect("poisoned mutex")
            .push(operation);
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BridgeError> {
        self.record(ObjectOperation::Get {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.object(bucket, key)
            .ok_or_else(|| BridgeError::ObjectStore {
                operation: "get_object",
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "NoSuchKey".to_string(),
                status_code: Some(NOT_FOUND_STATUS),
            })
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BridgeError> {
        self.record(ObjectOperation::Put {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        let failing = self
            .failing_put_suffixes
            .lock()
            .expect("poisoned mutex")
            .iter()
            .any(|suffix| key.ends_with(suffix.as_str()));
        if failing {
            return Err(BridgeError::ObjectStore {
                operation: "put_object",
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: "SlowDown".to_string(),
                status_code: Some(503),
            });
        }
        self.insert(bucket, key, body);
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BridgeError> {
        self.record(ObjectOperation::Delete {
            bucket: bucket.to_string(),
            key: key.to_string(),
        });
        self.objects
            .lock()
            .expect("poisoned mutex")
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToJsonCall {
    pub input: String,
    pub guide_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromJsonCall {
    pub input: Value,
    pub guide_id: String,
    pub envelope: X12Envelope,
}

/// Translation fake keyed by the exact X12 text it receives.
#[derive(Debug, Default)]
pub struct FakeTranslationClient {
    interchanges: Mutex<BTreeMap<String, TranslatedInterchange>>,
    x12_output: Mutex<Option<String>>,
    failure: Mutex<Option<u16>>,
    to_json_calls: Mutex<Vec<ToJsonCall>>,
    from_json_calls: Mutex<Vec<FromJsonCall>>,
}

impl FakeTranslationClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interchange(self, input: &str, interchange: TranslatedInterchange) -> Self {
        self.interchanges
            .lock()
            .expect("poisoned mutex")
            .insert(input.to_string(), interchange);
        self
    }

    pub fn with_x12_output(self, output: &str) -> Self {
        *self.x12_output.lock().expect("poisoned mutex") = Some(output.to_string());
        self
    }

    /// Every call fails with a service error carrying `status_code`.
    pub fn failing_with(self, status_code: u16) -> Self {
        *self.failure.lock().expect("poisoned mutex") = Some(status_code);
        self
    }

    pub fn to_json_calls(&self) -> Vec<ToJsonCall> {
        self.to_json_calls.lock().expect("poisoned mutex").clone()
    }

    pub fn from_json_calls(&self) -> Vec<FromJsonCall> {
        self.from_json_calls.lock().expect("poisoned mutex").clone()
    }

    fn failure(&self) -> Result<(), BridgeError> {
        match *self.failure.lock().expect("poisoned mutex") {
            Some(status) => Err(BridgeError::service(
                "edi-translate",
                format!("translation rejected with status {status}"),
                Some(status),
            )),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TranslationClient for FakeTranslationClient {
    async fn x12_to_json(
        &self,
        input: &str,
        guide_id: &str,
    ) -> Result<TranslatedInterchange, BridgeError> {
        self.to_json_calls
            .lock()
            .expect("poisoned mutex")
            .push(ToJsonCall {
                input: input.to_string(),
                guide_id: guide_id.to_string(),
            });
        self.failure()?;
        Ok(self
            .interchanges
            .lock()
            .expect("poisoned mutex")
            .get(input)
            .cloned()
            .unwrap_or_default())
    }

    async fn json_to_x12(
        &self,
        input: &Value,
        guide_id: &str,
        envelope: &X12Envelope,
    ) -> Result<String, BridgeError> {
        self.from_json_calls
            .lock()
            .expect("poisoned mutex")
            .push(FromJsonCall {
                input: input.clone(),
                guide_id: guide_id.to_string(),
                envelope: envelope.clone(),
            });
        self.failure()?;
        Ok(self
            .x12_output
            .lock()
            .expect("poisoned mutex")
            .clone()
            .unwrap_or_else(|| {
                format!(
                    "ISA*{}~",
                    envelope.interchange_header.control_number
                )
            }))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapCall {
    pub mapping_id: String,
    pub content: Value,
}

/// Echoes its input unless a response was registered for the mapping id.
#[derive(Debug, Default)]
pub struct FakeMappingClient {
    responses: Mutex<BTreeMap<String, MappedDocument>>,
    failure: Mutex<Option<u16>>,
    calls: Mutex<Vec<MapCall>>,
    created: Mutex<Vec<Value>>,
}

impl FakeMappingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, mapping_id: &str, content: Option<Value>) -> Self {
        self.responses
            .lock()
            .expect("poisoned mutex")
            .insert(mapping_id.to_string(), MappedDocument { content });
        self
    }

    pub fn failing_with(self, status_code: u16) -> Self {
        *self.failure.lock().expect("poisoned mutex") = Some(status_code);
        self
    }

    pub fn calls(&self) -> Vec<MapCall> {
        self.calls.lock().expect("poisoned mutex").clone()
    }

    pub fn created_mappings(&self) -> Vec<Value> {
        self.created.lock().expect("poisoned mutex").clone()
    }
}

#[async_trait]
impl MappingClient for FakeMappingClient {
    async fn map_document(
        &self,
        mapping_id: &str,
        content: &Value,
    ) -> Result<MappedDocument, BridgeError> {
        self.calls.lock().expect("poisoned mutex").push(MapCall {
            mapping_id: mapping_id.to_string(),
            content: content.clone(),
        });
        if let Some(status) = *self.failure.lock().expect("poisoned mutex") {
            return Err(BridgeError::service(
                "mappings",
                format!("mapping {mapping_id} rejected with status {status}"),
                Some(status),
            ));
        }
        Ok(self
            .responses
            .lock()
            .expect("poisoned mutex")
            .get(mapping_id)
            .cloned()
            .unwrap_or_else(|| MappedDocument {
                content: Some(content.clone()),
            }))
    }
}

#[async_trait]
impl MappingCatalog for FakeMappingClient {
    async fn create_mapping(&self, definition: &Value) -> Result<String, BridgeError> {
        let mut created = self.created.lock().expect("poisoned mutex");
        created.push(definition.clone());
        Ok(format!("MAP{:03}", created.len()))
    }
}

/// Monotonic counter starting after `start`.
#[derive(Debug)]
pub struct CountingSequenceClient {
    next: AtomicI64,
    calls: AtomicUsize,
    returns_value: bool,
}

impl CountingSequenceClient {
    pub fn starting_after(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
            calls: AtomicUsize::new(0),
            returns_value: true,
        }
    }

    /// Every increment answers without a value.
    pub fn without_value() -> Self {
        Self {
            returns_value: false,
            ..Self::starting_after(0)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SequenceClient for CountingSequenceClient {
    async fn increment_value(
        &self,
        _keyspace: &str,
        _key: &str,
        amount: i64,
    ) -> Result<Option<i64>, BridgeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let value = self.next.fetch_add(amount, Ordering::SeqCst) + amount;
        Ok(self.returns_value.then_some(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebhookPost {
    pub url: String,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct RecordingWebhookClient {
    posts: Mutex<Vec<WebhookPost>>,
    failures: Mutex<VecDeque<Option<u16>>>,
}

impl RecordingWebhookClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next call fails with `status_code`; queued failures are consumed in order.
    pub fn fail_next_with(self, status_code: u16) -> Self {
        self.failures
            .lock()
            .expect("poisoned mutex")
            .push_back(Some(status_code));
        self
    }

    /// Queues one successful call; queued outcomes are consumed in call order.
    pub fn pass_next(self) -> Self {
        self.failures.lock().expect("poisoned mutex").push_back(None);
        self
    }

    pub fn posts(&self) -> Vec<WebhookPost> {
        self.posts.lock().expect("poisoned mutex").clone()
    }
}

#[async_trait]
impl WebhookClient for RecordingWebhookClient {
    async fn post_json(&self, url: &str, body: &Value) -> Result<(), BridgeError> {
        let queued = self.failures.lock().expect("poisoned mutex").pop_front();
        if let Some(Some(status)) = queued {
            return Err(BridgeError::service(
                "webhook",
                format!("destination responded with status {status}"),
                Some(status),
            ));
        }
        self.posts.lock().expect("poisoned mutex").push(WebhookPost {
            url: url.to_string(),
            body: body.clone(),
        });
        Ok(())
    }
}

/// Returns prefixed ids (`01ABC_GUIDE001`) the way the guides API does.
#[derive(Debug, Default)]
pub struct RecordingGuidesClient {
    created: Mutex<Vec<Value>>,
    published: Mutex<Vec<String>>,
}

impl RecordingGuidesClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created_guides(&self) -> Vec<Value> {
        self.created.lock().expect("poisoned mutex").clone()
    }

    pub fn published_guides(&self) -> Vec<String> {
        self.published.lock().expect("poisoned mutex").clone()
    }
}

#[async_trait]
impl GuidesClient for RecordingGuidesClient {
    async fn create_guide(&self, definition: &Value) -> Result<String, BridgeError> {
        let mut created = self.created.lock().expect("poisoned mutex");
        created.push(definition.clone());
        Ok(format!("01ABC_GUIDE{:03}", created.len()))
    }

    async fn publish_guide(&self, guide_id: &str) -> Result<(), BridgeError> {
        self.published
            .lock()
            .expect("poisoned mutex")
            .push(guide_id.to_string());
        Ok(())
    }
}

pub fn single_transaction_set_interchange(transaction_set: Value) -> TranslatedInterchange {
    TranslatedInterchange {
        envelope: sample_inbound_envelope(),
        transaction_sets: vec![transaction_set],
    }
}

pub fn sample_inbound_envelope() -> Value {
    json!({
        "interchangeHeader": {
            "senderId": "ANOTHERMERCH",
            "receiverId": "AMERCHANT",
            "controlNumber": "000000101"
        },
        "groupHeader": {
            "applicationSenderCode": "072271711TMS",
            "applicationReceiverCode": "WRITEDEMO",
            "controlNumber": "000000101"
        }
    })
}
