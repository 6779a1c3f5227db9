//! Storage and messaging ports.
//!
//! Each external system the handlers write to sits behind a trait so the
//! pipelines can be exercised against in-memory doubles:
//!
//! - [`JobStore`]: durable job state (DynamoDB, TTL on `expireAt`)
//! - [`WorkQueue`]: outbound transcription events (SQS)
//! - [`ObjectStore`]: JSON documents (S3)
//! - [`GroupDirectory`]: permission groups of a user (DynamoDB)

pub mod dynamodb;
pub mod s3;
pub mod sqs;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{PermissionGroup, TranscribeOnRequestJob};

pub use dynamodb::{DynamoGroupDirectory, DynamoJobStore};
pub use s3::S3ObjectStore;
pub use sqs::SqsWorkQueue;

/// Durable keyed store for job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Write every record. Items may land individually; a failure is not
    /// rolled back.
    async fn write_batch(&self, table: &str, jobs: &[TranscribeOnRequestJob]) -> Result<()>;
}

/// Work queue accepting independent text messages.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    async fn send_batch(&self, queue_url: &str, messages: &[String]) -> Result<()>;
}

/// JSON document store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read a JSON document, `None` if the key does not exist.
    async fn get_json(&self, bucket: &str, key: &str) -> Result<Option<Value>>;

    async fn put_json(&self, bucket: &str, key: &str, value: &Value) -> Result<()>;
}

/// Resolves the permission groups of a user.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn user_groups(&self, email: &str) -> Result<Vec<PermissionGroup>>;
}
