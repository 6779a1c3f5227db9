// src/services/publisher.rs

//! Metadata fetcher and event publisher.
//!
//! Re-reads the full record of already validated calls and sends one
//! transcription event per call to the work queue. The access filter is not
//! applied again here.

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{CallMetadata, JobId, OnRequestEvent, wav_url};
use crate::services::search::{Hit, SearchIndex};
use crate::services::validator::transcribable_clauses;
use crate::storage::WorkQueue;

/// Build the metadata query for validated ids.
pub fn metadata_query(call_ids: &[String]) -> Value {
    let [recent, untranscribed] = transcribable_clauses();
    json!({
        "_source": CallMetadata::SOURCE_FIELDS,
        "query": {
            "bool": {
                "must": [
                    recent,
                    { "ids": { "values": call_ids } },
                    untranscribed,
                ]
            }
        },
        "size": call_ids.len()
    })
}

/// Merge a hit into a [`CallMetadata`], adding `sid` and `wav_url`.
pub fn call_metadata_from_hit(hit: &Hit, bucket: &str, prefix: &str) -> Result<CallMetadata> {
    let invalid = |message: String| AppError::InvalidRecord {
        sid: hit.id.clone(),
        message,
    };

    let mut fields = match &hit.source {
        Value::Object(fields) => fields.clone(),
        other => return Err(invalid(format!("_source is not an object: {other}"))),
    };

    let filename_prefix = fields
        .get("filename_prefix")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing filename_prefix".to_string()))?
        .to_string();

    fields.insert("sid".to_string(), Value::String(hit.id.clone()));
    fields.insert(
        "wav_url".to_string(),
        Value::String(wav_url(bucket, prefix, &filename_prefix)),
    );

    serde_json::from_value(Value::Object(fields)).map_err(|e| invalid(e.to_string()))
}

/// Fetches call metadata and publishes transcription events.
pub struct EventPublisher<'a> {
    search: &'a dyn SearchIndex,
    index: &'a str,
    queue: &'a dyn WorkQueue,
    queue_url: &'a str,
    audio_bucket: &'a str,
    audio_prefix: &'a str,
}

impl<'a> EventPublisher<'a> {
    pub fn new(
        search: &'a dyn SearchIndex,
        index: &'a str,
        queue: &'a dyn WorkQueue,
        queue_url: &'a str,
    ) -> Self {
        Self {
            search,
            index,
            queue,
            queue_url,
            audio_bucket: "",
            audio_prefix: "",
        }
    }

    /// Location of call audio used to derive `wav_url`.
    pub fn with_audio_source(mut self, bucket: &'a str, prefix: &'a str) -> Self {
        self.audio_bucket = bucket;
        self.audio_prefix = prefix;
        self
    }

    /// Fetch the metadata of every id. One malformed record fails the lot.
    pub async fn fetch_metadata(&self, call_ids: &[String]) -> Result<Vec<CallMetadata>> {
        let response = self
            .search
            .search_hits(self.index, &metadata_query(call_ids))
            .await?;

        response
            .hits
            .hits
            .iter()
            .map(|hit| call_metadata_from_hit(hit, self.audio_bucket, self.audio_prefix))
            .collect()
    }

    /// Publish one event per call. Returns the number of messages sent.
    ///
    /// Finding no record at all is a [`AppError::Queue`] failure: the job
    /// would otherwise stay in progress with nothing queued.
    pub async fn publish(
        &self,
        call_ids: &[String],
        job_id: &JobId,
        user_email: &str,
    ) -> Result<usize> {
        let records = self.fetch_metadata(call_ids).await?;
        if records.len() != call_ids.len() {
            warn!(
                "Job {}: {} of {} calls still transcribable at publish time",
                job_id,
                records.len(),
                call_ids.len()
            );
        }
        if records.is_empty() {
            return Err(AppError::queue(format!(
                "Job {job_id}: no call metadata found, nothing to publish"
            )));
        }

        let messages = records
            .into_iter()
            .map(|record| OnRequestEvent::new(job_id.as_str(), user_email, record).to_queue_message())
            .collect::<Result<Vec<_>>>()?;

        self.queue.send_batch(self.queue_url, &messages).await?;

        info!("Job {}: published {} events", job_id, messages.len());
        Ok(messages.len())
    }
}
