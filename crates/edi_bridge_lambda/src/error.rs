use std::error::Error as _;

use edi_bridge_core::contract::SerializedError;
use edi_bridge_core::{ConfigError, ValidationError};
use serde_json::json;

pub const NOT_FOUND_STATUS: u16 = 404;

/// Every error a handler can surface at its outermost boundary.
///
/// External-client variants carry the transport status explicitly so the
/// failure payload can echo it instead of a blanket 500.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{operation} s3://{bucket}/{key} failed: {message}")]
    ObjectStore {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
        status_code: Option<u16>,
    },
    #[error("{service} request failed: {message}")]
    Service {
        service: &'static str,
        message: String,
        status_code: Option<u16>,
    },
    #[error("execution ledger: {0}")]
    Ledger(String),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("setup: {0}")]
    Setup(String),
}

impl BridgeError {
    pub fn service(service: &'static str, message: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Service {
            service,
            message: message.into(),
            status_code,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ObjectStore { status_code, .. } | Self::Service { status_code, .. } => {
                *status_code
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::Validation(_) => "validation_error",
            Self::ObjectStore { .. } => "object_store_error",
            Self::Service { .. } => "service_error",
            Self::Ledger(_) => "ledger_error",
            Self::Serialization(_) => "serialization_error",
            Self::Setup(_) => "setup_error",
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(NOT_FOUND_STATUS)
    }

    pub fn to_serialized(&self) -> SerializedError {
        let mut sources = Vec::new();
        let mut current = self.source();
        while let Some(source) = current {
            sources.push(source.to_string());
            current = source.source();
        }

        let details = match self {
            Self::ObjectStore {
                operation,
                bucket,
                key,
                ..
            } => Some(json!({
                "operation": operation,
                "bucketName": bucket,
                "key": key,
            })),
            Self::Service { service, .. } => Some(json!({ "service": service })),
            _ => None,
        };

        SerializedError {
            name: self.kind().to_string(),
            message: self.to_string(),
            sources,
            status_code: self.status_code(),
            details,
        }
    }
}
