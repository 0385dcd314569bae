//! Environment-driven configuration, resolved eagerly into lookup tables.
//!
//! All readers take a lookup function instead of touching the process
//! environment directly so tests can supply a plain map.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::envelope::EnvelopeProfile;

pub const API_KEY_VAR: &str = "STEDI_API_KEY";
pub const EXECUTIONS_BUCKET_VAR: &str = "EXECUTIONS_BUCKET_NAME";
pub const FUNCTION_NAME_VAR: &str = "BRIDGE_FUNCTION_NAME";
pub const LAMBDA_FUNCTION_NAME_VAR: &str = "AWS_LAMBDA_FUNCTION_NAME";
pub const FUNCTION_NAMESPACE_VAR: &str = "FUNCTION_NAMESPACE";
pub const DESTINATION_WEBHOOK_VAR: &str = "READ_DESTINATION_WEBHOOK_URL";
pub const ENABLED_TRANSACTION_SETS_VAR: &str = "ENABLED_TRANSACTION_SETS";
pub const OUTPUT_BUCKET_VAR: &str = "SFTP_BUCKET_NAME";

pub const DEFAULT_TRANSLATE_URL: &str = "https://edi-translate.us.stedi.com/2022-01-01";
pub const DEFAULT_MAPPINGS_URL: &str = "https://mappings.us.stedi.com/2021-06-01";
pub const DEFAULT_STASH_URL: &str = "https://stash.us.stedi.com/2022-04-20";
pub const DEFAULT_GUIDES_URL: &str = "https://guides.us.stedi.com/2022-03-09";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable `{name}` is not set")]
    MissingVariable { name: String },
    #[error("environment variable `{name}` is invalid: {message}")]
    InvalidVariable { name: String, message: String },
    #[error("Required property `transactionSet` missing from input event")]
    MissingTransactionSet,
    #[error("transaction set `{transaction_set}` is not enabled for this function")]
    TransactionSetNotEnabled { transaction_set: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Guide,
    Mapping,
}

impl ResourceKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Guide => "GUIDE_ID",
            Self::Mapping => "MAPPING_ID",
        }
    }
}

/// Upper-cases an identifier and replaces anything non-alphanumeric with `_`.
pub fn resource_env_prefix(identifier: &str) -> String {
    identifier
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// `x12-850` + guide → `X12_850_GUIDE_ID`.
pub fn resource_env_var(identifier: &str, kind: ResourceKind) -> String {
    format!("{}_{}", resource_env_prefix(identifier), kind.suffix())
}

pub fn process_env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn required(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Result<String, ConfigError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingVariable {
            name: name.to_string(),
        }),
    }
}

fn optional(lookup: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub translate: String,
    pub mappings: String,
    pub stash: String,
    pub guides: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            translate: DEFAULT_TRANSLATE_URL.to_string(),
            mappings: DEFAULT_MAPPINGS_URL.to_string(),
            stash: DEFAULT_STASH_URL.to_string(),
            guides: DEFAULT_GUIDES_URL.to_string(),
        }
    }
}

impl ServiceEndpoints {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            translate: optional(lookup, "TRANSLATE_API_URL").unwrap_or(defaults.translate),
            mappings: optional(lookup, "MAPPINGS_API_URL").unwrap_or(defaults.mappings),
            stash: optional(lookup, "STASH_API_URL").unwrap_or(defaults.stash),
            guides: optional(lookup, "GUIDES_API_URL").unwrap_or(defaults.guides),
        }
    }
}

/// Settings every function needs regardless of direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSettings {
    pub api_key: String,
    pub executions_bucket: String,
    pub function_name: String,
    pub endpoints: ServiceEndpoints,
}

impl PlatformSettings {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let function_name = required(lookup, FUNCTION_NAME_VAR)
            .or_else(|_| required(lookup, LAMBDA_FUNCTION_NAME_VAR))
            .map_err(|_| ConfigError::MissingVariable {
                name: FUNCTION_NAME_VAR.to_string(),
            })?;

        Ok(Self {
            api_key: required(lookup, API_KEY_VAR)?,
            executions_bucket: required(lookup, EXECUTIONS_BUCKET_VAR)?,
            function_name,
            endpoints: ServiceEndpoints::from_lookup(lookup),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSetResources {
    pub transaction_set: String,
    pub guide_id: String,
    pub mapping_id: String,
}

impl TransactionSetResources {
    fn from_lookup(
        lookup: &dyn Fn(&str) -> Option<String>,
        transaction_set: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            transaction_set: transaction_set.to_string(),
            guide_id: required(lookup, &resource_env_var(transaction_set, ResourceKind::Guide))?,
            mapping_id: required(
                lookup,
                &resource_env_var(transaction_set, ResourceKind::Mapping),
            )?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundConfig {
    pub resources: TransactionSetResources,
    pub destination_webhook_url: String,
}

impl InboundConfig {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let namespace = required(lookup, FUNCTION_NAMESPACE_VAR)?;
        Ok(Self {
            resources: TransactionSetResources::from_lookup(lookup, &namespace)?,
            destination_webhook_url: required(lookup, DESTINATION_WEBHOOK_VAR)?,
        })
    }
}

pub fn parse_enabled_transaction_sets(raw: &str) -> Vec<String> {
    let mut sets: Vec<String> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
        if !sets.iter().any(|existing| existing == entry) {
            sets.push(entry.to_string());
        }
    }
    sets
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundConfig {
    pub output_bucket: String,
    pub envelope: EnvelopeProfile,
    transaction_sets: BTreeMap<String, TransactionSetResources>,
}

impl OutboundConfig {
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let enabled = parse_enabled_transaction_sets(&required(
            lookup,
            ENABLED_TRANSACTION_SETS_VAR,
        )?);
        if enabled.is_empty() {
            return Err(ConfigError::InvalidVariable {
                name: ENABLED_TRANSACTION_SETS_VAR.to_string(),
                message: "must list at least one transaction set".to_string(),
            });
        }

        let mut transaction_sets = BTreeMap::new();
        for transaction_set in &enabled {
            transaction_sets.insert(
                resource_env_prefix(transaction_set),
                TransactionSetResources::from_lookup(lookup, transaction_set)?,
            );
        }

        Ok(Self {
            output_bucket: required(lookup, OUTPUT_BUCKET_VAR)?,
            envelope: envelope_profile_from_lookup(lookup),
            transaction_sets,
        })
    }

    pub fn resources_for(&self, transaction_set: &str) -> Result<&TransactionSetResources, ConfigError> {
        self.transaction_sets
            .get(&resource_env_prefix(transaction_set))
            .ok_or_else(|| ConfigError::TransactionSetNotEnabled {
                transaction_set: transaction_set.to_string(),
            })
    }
}

fn envelope_profile_from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> EnvelopeProfile {
    let defaults = EnvelopeProfile::default();
    let pick = |name: &str, fallback: String| optional(lookup, name).unwrap_or(fallback);

    EnvelopeProfile {
        sender_qualifier: pick("OUTBOUND_SENDER_QUALIFIER", defaults.sender_qualifier),
        sender_id: pick("OUTBOUND_SENDER_ID", defaults.sender_id),
        receiver_qualifier: pick("OUTBOUND_RECEIVER_QUALIFIER", defaults.receiver_qualifier),
        receiver_id: pick("OUTBOUND_RECEIVER_ID", defaults.receiver_id),
        usage_indicator_code: pick("OUTBOUND_USAGE_INDICATOR", defaults.usage_indicator_code),
        functional_identifier_code: pick(
            "OUTBOUND_FUNCTIONAL_IDENTIFIER",
            defaults.functional_identifier_code,
        ),
        application_sender_code: pick(
            "OUTBOUND_APPLICATION_SENDER_CODE",
            defaults.application_sender_code,
        ),
        application_receiver_code: pick(
            "OUTBOUND_APPLICATION_RECEIVER_CODE",
            defaults.application_receiver_code,
        ),
    }
}

/// Reads the transaction-set identifier an outbound invocation must carry.
pub fn required_transaction_set(input: &Value) -> Result<&str, ConfigError> {
    input
        .get("transactionSet")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingTransactionSet)
}
