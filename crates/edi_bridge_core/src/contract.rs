use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const FAILED_EXECUTION_MESSAGE: &str = "execution failed";
pub const DEFAULT_FAILURE_STATUS_CODE: u16 = 500;
pub const OUTBOUND_SUCCESS_STATUS_CODE: u16 = 200;

/// Storage-change notification delivered to the inbound function.
///
/// Only the fields the pipeline reads are modelled; everything else in the
/// S3 event shape is ignored during deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketNotificationEvent {
    #[serde(rename = "Records")]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    pub s3: NotificationEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationEntity {
    pub bucket: NotificationBucket,
    pub object: NotificationObject,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationBucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationObject {
    pub key: String,
}

impl NotificationRecord {
    pub fn new(bucket_name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            s3: NotificationEntity {
                bucket: NotificationBucket {
                    name: bucket_name.into(),
                },
                object: NotificationObject { key: key.into() },
            },
        }
    }

    pub fn bucket_name(&self) -> &str {
        &self.s3.bucket.name
    }

    pub fn key(&self) -> &str {
        &self.s3.object.key
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyToProcess {
    pub bucket_name: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilteredKey {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupedEventKeys {
    pub filtered_keys: Vec<FilteredKey>,
    pub keys_to_process: Vec<KeyToProcess>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingError {
    pub key: String,
    pub error: String,
}

/// Per-invocation summary of an inbound batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub filtered_keys: Vec<FilteredKey>,
    pub processed_keys: Vec<String>,
    pub processing_errors: Vec<ProcessingError>,
}

impl ProcessingResult {
    pub fn from_filtered(filtered_keys: Vec<FilteredKey>) -> Self {
        Self {
            filtered_keys,
            ..Self::default()
        }
    }

    pub fn record_error(&mut self, key: impl Into<String>, error: impl Into<String>) {
        self.processing_errors.push(ProcessingError {
            key: key.into(),
            error: error.into(),
        });
    }

    pub fn record_processed(&mut self, key: impl Into<String>) {
        self.processed_keys.push(key.into());
    }

    pub fn total_keys(&self) -> usize {
        self.filtered_keys.len() + self.processed_keys.len() + self.processing_errors.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecordRef {
    pub bucket_name: String,
    pub key: String,
}

/// Persisted and returned description of an invocation-fatal error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SerializedError {
    pub name: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailurePayload {
    pub status_code: u16,
    pub message: String,
    pub failure_record: FailureRecordRef,
    pub error: SerializedError,
}

impl FailurePayload {
    pub fn new(failure_record: FailureRecordRef, error: SerializedError) -> Self {
        Self {
            status_code: error.status_code.unwrap_or(DEFAULT_FAILURE_STATUS_CODE),
            message: FAILED_EXECUTION_MESSAGE.to_string(),
            failure_record,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundSuccessResponse {
    pub status_code: u16,
    pub bucket_name: String,
    pub key: String,
    pub control_number: String,
}

/// Write-ahead record of a control number already issued to an execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IssuedControlNumberRecord {
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn parse_notification_event(event: &Value) -> Result<BucketNotificationEvent, ValidationError> {
    if !event.is_object() {
        return Err(ValidationError::new(
            "Notification payload must be a JSON object",
        ));
    }

    BucketNotificationEvent::deserialize(event)
        .map_err(|error| ValidationError::new(format!("Malformed bucket notification: {error}")))
}
