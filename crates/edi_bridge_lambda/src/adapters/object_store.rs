use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;

use crate::adapters::http::{CONNECT_TIMEOUT, MAX_ATTEMPTS};
use crate::error::{BridgeError, NOT_FOUND_STATUS};

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// A missing key fails with a 404 status (`BridgeError::is_not_found`).
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BridgeError>;

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BridgeError>;

    /// Deleting a key that does not exist succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BridgeError>;
}

/// S3 answers a missing key with 403 AccessDenied unless the caller holds
/// `s3:ListBucket` on the bucket. Both function roles need it on the
/// executions bucket, and the inbound role on the SFTP bucket, so that
/// missing keys surface as `NoSuchKey`.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Builds a client from the ambient AWS configuration with the bounded
    /// retry and connect-timeout settings used by every external client.
    pub async fn from_env() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .retry_config(aws_config::retry::RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
            .timeout_config(
                aws_config::timeout::TimeoutConfig::builder()
                    .connect_timeout(CONNECT_TIMEOUT)
                    .build(),
            )
            .load()
            .await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

fn s3_error<E>(
    operation: &'static str,
    bucket: &str,
    key: &str,
    error: SdkError<E, HttpResponse>,
) -> BridgeError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let status_code = error
        .raw_response()
        .map(|response| response.status().as_u16());
    BridgeError::ObjectStore {
        operation,
        bucket: bucket.to_string(),
        key: key.to_string(),
        message: DisplayErrorContext(&error).to_string(),
        status_code,
    }
}

/// `NoSuchKey` always reads as not-found, whatever status carried it.
fn get_object_status(no_such_key: bool, response_status: Option<u16>) -> Option<u16> {
    if no_such_key {
        Some(NOT_FOUND_STATUS)
    } else {
        response_status
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, BridgeError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|error| {
                let no_such_key = error
                    .as_service_error()
                    .is_some_and(|service| service.is_no_such_key());
                let mut mapped = s3_error("get_object", bucket, key, error);
                if let BridgeError::ObjectStore { status_code, .. } = &mut mapped {
                    *status_code = get_object_status(no_such_key, *status_code);
                }
                mapped
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|error| BridgeError::ObjectStore {
                operation: "get_object",
                bucket: bucket.to_string(),
                key: key.to_string(),
                message: format!("failed to read object body: {error}"),
                status_code: None,
            })?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), BridgeError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map(|_| ())
            .map_err(|error| s3_error("put_object", bucket, key, error))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BridgeError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map(|_| ())
            .map_err(|error| s3_error("delete_object", bucket, key, error))
    }
}
