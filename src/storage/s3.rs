//! AWS S3 JSON document store.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{AppError, Result};
use crate::storage::ObjectStore;

/// S3-based JSON document store.
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Decode a document body; an empty object stands in for an empty file.
pub fn decode_body(bytes: &[u8]) -> Result<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(json!({}));
    }
    Ok(serde_json::from_slice(bytes)?)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_json(&self, bucket: &str, key: &str) -> Result<Option<Value>> {
        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(AppError::object_store)?
                    .into_bytes();
                Ok(Some(decode_body(&bytes)?))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    info!("No object at s3://{}/{}", bucket, key);
                    Ok(None)
                } else {
                    Err(AppError::object_store(format!(
                        "GetObject s3://{}/{} failed: {}",
                        bucket,
                        key,
                        DisplayErrorContext(&service_err)
                    )))
                }
            }
        }
    }

    async fn put_json(&self, bucket: &str, key: &str, value: &Value) -> Result<()> {
        let json = serde_json::to_vec(value)?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(json))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| {
                AppError::object_store(format!(
                    "PutObject s3://{}/{} failed: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        info!("Wrote s3://{}/{}", bucket, key);
        Ok(())
    }
}
