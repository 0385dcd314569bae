//! AWS-oriented adapters and handlers for the EDI bridge functions.
//!
//! This crate owns runtime integration details (Lambda handlers, S3 and
//! platform HTTP clients, the execution ledger, setup tooling) on top of the
//! pure primitives in `edi_bridge_core`.

pub mod adapters;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod setup;
pub mod telemetry;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
