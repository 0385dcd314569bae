//! Invocation handlers for the two document directions.

pub mod inbound;
pub mod outbound;

pub const EMPTY_MAPPING_MESSAGE: &str = "Failed to map document. No content returned";
