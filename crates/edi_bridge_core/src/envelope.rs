//! Interchange/group envelope handling for both pipeline directions.
//!
//! Inbound: trims a translated envelope down to the fields the mapping
//! consumes. Outbound: builds the envelope the translation service wraps
//! around the mapped transaction set, including the fixed-width control
//! number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::contract::ValidationError;

pub const CONTROL_NUMBER_WIDTH: usize = 9;
pub const CONTROL_NUMBER_KEYSPACE: &str = "outbound-control-numbers";
const MAX_CONTROL_NUMBER: i64 = 999_999_999;

/// Zero-pads a control number to the 9-digit X12 field width.
pub fn format_control_number(value: i64) -> Result<String, ValidationError> {
    if !(0..=MAX_CONTROL_NUMBER).contains(&value) {
        return Err(ValidationError::new(format!(
            "control number {value} does not fit in {CONTROL_NUMBER_WIDTH} digits"
        )));
    }

    Ok(format!("{value:0width$}", width = CONTROL_NUMBER_WIDTH))
}

/// Trading-partner identity used for every outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeProfile {
    pub sender_qualifier: String,
    pub sender_id: String,
    pub receiver_qualifier: String,
    pub receiver_id: String,
    pub usage_indicator_code: String,
    pub functional_identifier_code: String,
    pub application_sender_code: String,
    pub application_receiver_code: String,
}

impl Default for EnvelopeProfile {
    fn default() -> Self {
        Self {
            sender_qualifier: "ZZ".to_string(),
            sender_id: "AMERCHANT".to_string(),
            receiver_qualifier: "14".to_string(),
            receiver_id: "ANOTHERMERCH".to_string(),
            usage_indicator_code: "T".to_string(),
            functional_identifier_code: "OW".to_string(),
            application_sender_code: "WRITEDEMO".to_string(),
            application_receiver_code: "072271711TMS".to_string(),
        }
    }
}

impl EnvelopeProfile {
    /// Sequence key scoping control numbers to one sender/receiver pair.
    pub fn sequence_key(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.usage_indicator_code,
            self.functional_identifier_code,
            self.sender_id,
            self.receiver_id
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterchangeHeader {
    pub sender_qualifier: String,
    pub sender_id: String,
    pub receiver_qualifier: String,
    pub receiver_id: String,
    pub date: String,
    pub time: String,
    pub control_number: String,
    pub usage_indicator_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupHeader {
    pub functional_identifier_code: String,
    pub application_sender_code: String,
    pub application_receiver_code: String,
    pub date: String,
    pub time: String,
    pub control_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct X12Envelope {
    pub interchange_header: InterchangeHeader,
    pub group_header: GroupHeader,
}

pub fn build_outbound_envelope(
    profile: &EnvelopeProfile,
    control_number: &str,
    document_date: DateTime<Utc>,
) -> X12Envelope {
    let date = document_date.format("%Y-%m-%d").to_string();

    X12Envelope {
        interchange_header: InterchangeHeader {
            sender_qualifier: profile.sender_qualifier.clone(),
            sender_id: profile.sender_id.clone(),
            receiver_qualifier: profile.receiver_qualifier.clone(),
            receiver_id: profile.receiver_id.clone(),
            date: date.clone(),
            time: document_date.format("%H:%M").to_string(),
            control_number: control_number.to_string(),
            usage_indicator_code: profile.usage_indicator_code.clone(),
        },
        group_header: GroupHeader {
            functional_identifier_code: profile.functional_identifier_code.clone(),
            application_sender_code: profile.application_sender_code.clone(),
            application_receiver_code: profile.application_receiver_code.clone(),
            date,
            time: document_date.format("%H:%M:%S").to_string(),
            control_number: control_number.to_string(),
        },
    }
}

/// Mapping input for outbound documents: `{controlNumber, ...input}`.
///
/// Fields already present on the input win over the generated control number.
pub fn build_outbound_mapping_input(
    control_number: &str,
    input: &Map<String, Value>,
) -> Value {
    let mut content = Map::new();
    content.insert(
        "controlNumber".to_string(),
        Value::String(control_number.to_string()),
    );
    for (name, value) in input {
        content.insert(name.clone(), value.clone());
    }
    Value::Object(content)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedEnvelope {
    interchange_header: Option<TranslatedInterchangeHeader>,
    group_header: Option<TranslatedGroupHeader>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedInterchangeHeader {
    sender_id: Option<Value>,
    receiver_id: Option<Value>,
    control_number: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedGroupHeader {
    application_sender_code: Option<Value>,
    application_receiver_code: Option<Value>,
    control_number: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeData {
    interchange_header: EnvelopeInterchangeData,
    group_header: EnvelopeGroupData,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeInterchangeData {
    #[serde(skip_serializing_if = "Option::is_none")]
    sender_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    receiver_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interchange_control_number: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeGroupData {
    #[serde(skip_serializing_if = "Option::is_none")]
    application_sender_code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    application_receiver_code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_control_number: Option<Value>,
}

/// Combines selected envelope fields with a single translated transaction set.
///
/// The result is `{envelopeData, ...transactionSet}`; transaction-set fields
/// are spread at the top level and win on collision.
pub fn build_inbound_mapping_input(
    envelope: &Value,
    transaction_set: &Value,
) -> Result<Value, ValidationError> {
    let translated = TranslatedEnvelope::deserialize(envelope)
        .map_err(|error| ValidationError::new(format!("Malformed translated envelope: {error}")))?;
    let interchange = translated.interchange_header.ok_or_else(|| {
        ValidationError::new("translated envelope is missing the interchange header")
    })?;
    let group = translated
        .group_header
        .ok_or_else(|| ValidationError::new("translated envelope is missing the group header"))?;

    let Some(transaction_fields) = transaction_set.as_object() else {
        return Err(ValidationError::new(
            "translated transaction set must be a JSON object",
        ));
    };

    let envelope_data = EnvelopeData {
        interchange_header: EnvelopeInterchangeData {
            sender_id: interchange.sender_id,
            receiver_id: interchange.receiver_id,
            interchange_control_number: interchange.control_number,
        },
        group_header: EnvelopeGroupData {
            application_sender_code: group.application_sender_code,
            application_receiver_code: group.application_receiver_code,
            group_control_number: group.control_number,
        },
    };

    let mut content = Map::new();
    content.insert(
        "envelopeData".to_string(),
        serde_json::to_value(envelope_data)
            .map_err(|error| ValidationError::new(format!("envelope data: {error}")))?,
    );
    for (name, value) in transaction_fields {
        content.insert(name.clone(), value.clone());
    }

    Ok(Value::Object(content))
}
