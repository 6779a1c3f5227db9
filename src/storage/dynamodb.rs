//! DynamoDB-backed job store and permission group directory.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::models::{PermissionGroup, TranscribeOnRequestJob};
use crate::storage::{GroupDirectory, JobStore};

/// Maximum put requests per `BatchWriteItem` call.
const MAX_BATCH_WRITE: usize = 25;

type Item = HashMap<String, AttributeValue>;

/// Job state table writer.
pub struct DynamoJobStore {
    client: Client,
}

impl DynamoJobStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Convert a job record into a DynamoDB item.
pub fn job_item(job: &TranscribeOnRequestJob) -> Item {
    HashMap::from([
        ("jobId".to_string(), AttributeValue::S(job.job_id.clone())),
        ("callId".to_string(), AttributeValue::S(job.call_id.clone())),
        ("userId".to_string(), AttributeValue::S(job.user_id.clone())),
        (
            "lastUpdate".to_string(),
            AttributeValue::N(job.last_update.to_string()),
        ),
        (
            "expireAt".to_string(),
            AttributeValue::N(job.expire_at.to_string()),
        ),
        (
            "status".to_string(),
            AttributeValue::S(job.status.as_str().to_string()),
        ),
    ])
}

#[async_trait]
impl JobStore for DynamoJobStore {
    async fn write_batch(&self, table: &str, jobs: &[TranscribeOnRequestJob]) -> Result<()> {
        for chunk in jobs.chunks(MAX_BATCH_WRITE) {
            let requests = chunk
                .iter()
                .map(|job| -> Result<WriteRequest> {
                    let put = PutRequest::builder()
                        .set_item(Some(job_item(job)))
                        .build()
                        .map_err(AppError::store)?;
                    Ok(WriteRequest::builder().put_request(put).build())
                })
                .collect::<Result<Vec<_>>>()?;

            let output = self
                .client
                .batch_write_item()
                .request_items(table, requests)
                .send()
                .await
                .map_err(|e| {
                    AppError::store(format!(
                        "BatchWriteItem on {} failed: {}",
                        table,
                        DisplayErrorContext(&e)
                    ))
                })?;

            let unprocessed = output
                .unprocessed_items()
                .and_then(|items| items.get(table))
                .map_or(0, Vec::len);
            if unprocessed > 0 {
                return Err(AppError::store(format!(
                    "{} of {} job records were not written to {}",
                    unprocessed,
                    chunk.len(),
                    table
                )));
            }
        }

        info!("Wrote {} job records to {}", jobs.len(), table);
        Ok(())
    }
}

/// Permission group table: one item per group, with a `members` string set
/// of user emails.
pub struct DynamoGroupDirectory {
    client: Client,
    table: String,
}

impl DynamoGroupDirectory {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl GroupDirectory for DynamoGroupDirectory {
    async fn user_groups(&self, email: &str) -> Result<Vec<PermissionGroup>> {
        let mut groups = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table)
                .filter_expression("contains(#members, :email)")
                .expression_attribute_names("#members", "members")
                .expression_attribute_values(":email", AttributeValue::S(email.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    AppError::store(format!(
                        "Scan on {} failed: {}",
                        self.table,
                        DisplayErrorContext(&e)
                    ))
                })?;

            for item in output.items() {
                groups.push(group_from_item(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        debug!("User {} belongs to {} permission groups", email, groups.len());
        Ok(groups)
    }
}

/// Decode a permission group item.
pub fn group_from_item(item: &Item) -> Result<PermissionGroup> {
    let id = string_attr(item, "id")
        .ok_or_else(|| AppError::store("Permission group item has no id"))?;
    Ok(PermissionGroup {
        name: string_attr(item, "name").unwrap_or_else(|| id.clone()),
        description: string_attr(item, "description").unwrap_or_default(),
        distributors: string_list_attr(item, "distributors"),
        lines_of_business: string_list_attr(item, "linesOfBusiness"),
        id,
    })
}

fn string_attr(item: &Item, name: &str) -> Option<String> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Some(s.clone()),
        _ => None,
    }
}

/// Accepts both string sets and lists of strings.
fn string_list_attr(item: &Item, name: &str) -> Vec<String> {
    match item.get(name) {
        Some(AttributeValue::Ss(values)) => values.clone(),
        Some(AttributeValue::L(values)) => values
            .iter()
            .filter_map(|v| match v {
                AttributeValue::S(s) => Some(s.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
