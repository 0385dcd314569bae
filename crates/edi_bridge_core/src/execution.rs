use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Deterministic identity of one invocation attempt.
///
/// Retries of the same input for the same function collapse to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes `{functionName, event}` into a hex SHA-256 execution id.
///
/// `serde_json` objects keep their keys sorted, so the canonical form does not
/// depend on the key order of the incoming event.
pub fn generate_execution_id(function_name: &str, event: &Value) -> ExecutionId {
    let canonical = json!({
        "functionName": function_name,
        "event": event,
    });

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string());
    ExecutionId(format!("{:x}", hasher.finalize()))
}
