//! SQS-backed work queue.

use async_trait::async_trait;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::SendMessageBatchRequestEntry;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::storage::WorkQueue;

/// Maximum entries per `SendMessageBatch` call.
const MAX_SQS_BATCH_SIZE: usize = 10;

pub struct SqsWorkQueue {
    client: Client,
}

impl SqsWorkQueue {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Build batch entries; ids are positions in the whole message list.
pub fn batch_entries(offset: usize, messages: &[String]) -> Result<Vec<SendMessageBatchRequestEntry>> {
    messages
        .iter()
        .enumerate()
        .map(|(i, body)| {
            SendMessageBatchRequestEntry::builder()
                .id((offset + i).to_string())
                .message_body(body)
                .build()
                .map_err(AppError::queue)
        })
        .collect()
}

#[async_trait]
impl WorkQueue for SqsWorkQueue {
    async fn send_batch(&self, queue_url: &str, messages: &[String]) -> Result<()> {
        for (chunk_index, chunk) in messages.chunks(MAX_SQS_BATCH_SIZE).enumerate() {
            let entries = batch_entries(chunk_index * MAX_SQS_BATCH_SIZE, chunk)?;

            let output = self
                .client
                .send_message_batch()
                .queue_url(queue_url)
                .set_entries(Some(entries))
                .send()
                .await
                .map_err(|e| {
                    AppError::queue(format!(
                        "SendMessageBatch to {} failed: {}",
                        queue_url,
                        DisplayErrorContext(&e)
                    ))
                })?;

            let failed = output.failed();
            if !failed.is_empty() {
                for entry in failed {
                    error!(
                        "Message {} rejected: {} {}",
                        entry.id(),
                        entry.code(),
                        entry.message().unwrap_or_default()
                    );
                }
                return Err(AppError::queue(format!(
                    "{} of {} messages were rejected by {}",
                    failed.len(),
                    chunk.len(),
                    queue_url
                )));
            }
        }

        info!("Sent {} messages to {}", messages.len(), queue_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_entry_ids_continue_across_chunks() {
        let messages = vec!["a".to_string(), "b".to_string()];
        let entries = batch_entries(10, &messages).unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id(), "10");
        assert_eq!(entries[1].id(), "11");
        assert_eq!(entries[1].message_body(), "b");
    }
}
