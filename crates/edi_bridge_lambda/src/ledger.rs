//! Per-invocation execution records in the executions bucket.
//!
//! Every handler runs inside [`ExecutionLedger::track`]: the raw input is
//! recorded before any work, success deletes every record for the execution,
//! and failure leaves the input next to a serialized error.

use std::future::Future;
use std::sync::Arc;

use edi_bridge_core::config::PlatformSettings;
use edi_bridge_core::contract::{
    FailurePayload, FailureRecordRef, IssuedControlNumberRecord, DEFAULT_FAILURE_STATUS_CODE,
    FAILED_EXECUTION_MESSAGE,
};
use edi_bridge_core::execution::{generate_execution_id, ExecutionId};
use edi_bridge_core::storage_keys::{
    execution_failure_key, execution_input_key, issued_control_number_key,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, Instrument};

use crate::adapters::object_store::ObjectStore;
use crate::error::BridgeError;
use crate::telemetry::execution_span;

const COMPONENT: &str = "execution_ledger";

#[derive(Clone)]
pub struct ExecutionLedger {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    function_name: String,
}

impl ExecutionLedger {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        function_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            function_name: function_name.into(),
        }
    }

    pub fn from_settings(store: Arc<dyn ObjectStore>, settings: &PlatformSettings) -> Self {
        Self::new(
            store,
            settings.executions_bucket.clone(),
            settings.function_name.clone(),
        )
    }

    pub fn execution_id(&self, event: &Value) -> ExecutionId {
        generate_execution_id(&self.function_name, event)
    }

    /// Overwrites any record left by an earlier attempt with the same input.
    pub async fn record_new_execution(
        &self,
        execution_id: &ExecutionId,
        input: &Value,
    ) -> Result<(), BridgeError> {
        let key = execution_input_key(&self.function_name, execution_id);
        self.store
            .put_object(&self.bucket, &key, serde_json::to_vec(input)?)
            .await?;
        info!(
            component = COMPONENT,
            event = "execution_recorded",
            execution_id = %execution_id,
            key = %key,
        );
        Ok(())
    }

    /// Idempotent: deleting records that are already gone succeeds.
    pub async fn mark_execution_as_successful(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<(), BridgeError> {
        for key in [
            execution_input_key(&self.function_name, execution_id),
            execution_failure_key(&self.function_name, execution_id),
            issued_control_number_key(&self.function_name, execution_id),
        ] {
            self.store.delete_object(&self.bucket, &key).await?;
        }
        info!(
            component = COMPONENT,
            event = "execution_succeeded",
            execution_id = %execution_id,
        );
        Ok(())
    }

    /// Persists the failure record and builds the payload returned to the caller.
    ///
    /// A failed write of the failure record is logged; the payload is returned
    /// regardless.
    pub async fn failed_execution(
        &self,
        execution_id: &ExecutionId,
        failure: &BridgeError,
    ) -> FailurePayload {
        let key = execution_failure_key(&self.function_name, execution_id);
        let serialized = failure.to_serialized();

        let written = match serde_json::to_vec(&serialized) {
            Ok(body) => self.store.put_object(&self.bucket, &key, body).await,
            Err(source) => Err(BridgeError::from(source)),
        };
        if let Err(write_error) = written {
            error!(
                component = COMPONENT,
                event = "failure_record_write_failed",
                execution_id = %execution_id,
                key = %key,
                error = %write_error,
            );
        }

        error!(
            component = COMPONENT,
            event = "execution_failed",
            execution_id = %execution_id,
            error_kind = failure.kind(),
            status_code = failure.status_code().unwrap_or(DEFAULT_FAILURE_STATUS_CODE),
            error = %failure,
        );

        FailurePayload::new(
            FailureRecordRef {
                bucket_name: self.bucket.clone(),
                key,
            },
            serialized,
        )
    }

    /// `None` when no record exists. A 403 from a role without `s3:ListBucket`
    /// is not treated as absent and fails the invocation.
    pub async fn issued_control_number(
        &self,
        execution_id: &ExecutionId,
    ) -> Result<Option<i64>, BridgeError> {
        let key = issued_control_number_key(&self.function_name, execution_id);
        match self.store.get_object(&self.bucket, &key).await {
            Ok(bytes) => {
                let record: IssuedControlNumberRecord = serde_json::from_slice(&bytes)?;
                Ok(Some(record.value))
            }
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub async fn record_issued_control_number(
        &self,
        execution_id: &ExecutionId,
        value: i64,
    ) -> Result<(), BridgeError> {
        let key = issued_control_number_key(&self.function_name, execution_id);
        let body = serde_json::to_vec(&IssuedControlNumberRecord { value })?;
        self.store.put_object(&self.bucket, &key, body).await
    }

    /// Runs `pipeline` as one tracked execution and never fails past this call.
    ///
    /// Returns the pipeline output on success, or a serialized
    /// [`FailurePayload`] when recording, the pipeline, or the success mark
    /// fails.
    pub async fn track<F, Fut, T>(&self, event: Value, pipeline: F) -> Value
    where
        F: FnOnce(ExecutionId, Value) -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
        T: Serialize,
    {
        let execution_id = self.execution_id(&event);
        let span = execution_span(&self.function_name, execution_id.as_str());

        async move {
            match self.run_tracked(&execution_id, event, pipeline).await {
                Ok(output) => output,
                Err(failure) => {
                    let payload = self.failed_execution(&execution_id, &failure).await;
                    serde_json::to_value(&payload).unwrap_or_else(|source| {
                        json!({
                            "statusCode": DEFAULT_FAILURE_STATUS_CODE,
                            "message": FAILED_EXECUTION_MESSAGE,
                            "error": { "name": "serialization_error", "message": source.to_string() },
                        })
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run_tracked<F, Fut, T>(
        &self,
        execution_id: &ExecutionId,
        event: Value,
        pipeline: F,
    ) -> Result<Value, BridgeError>
    where
        F: FnOnce(ExecutionId, Value) -> Fut,
        Fut: Future<Output = Result<T, BridgeError>>,
        T: Serialize,
    {
        self.record_new_execution(execution_id, &event).await?;
        let output = pipeline(execution_id.clone(), event).await?;
        let output = serde_json::to_value(&output)?;
        self.mark_execution_as_successful(execution_id).await?;
        Ok(output)
    }
}
