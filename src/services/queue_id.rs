// src/services/queue_id.rs

//! `queue_id` backfill.
//!
//! Internal calls (`call_direction = "3"`) are indexed without a queue id.
//! Each one is matched to the inbound call (`call_direction = "1"`) sharing
//! its `original_contact_id`, whose queue id is copied onto the internal call
//! and into its extra-metadata document.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::models::BackfillConfig;
use crate::services::search::{DEFAULT_MAX_RETRIES, Hit, SearchIndex};
use crate::storage::ObjectStore;

const INBOUND: &str = "1";
const INTERNAL: &str = "3";

/// Internal calls of the last `number_of_days` days with an empty queue id.
pub fn empty_queue_id_query(number_of_days: u32) -> Value {
    json!({
        "_source": ["queue_id", "original_contact_id", "filename_prefix"],
        "query": {
            "bool": {
                "must": [
                    { "range": { "created_at_": { "gte": format!("now-{}d", number_of_days) } } },
                    { "term": { "call_direction": INTERNAL } },
                    { "term": { "queue_id": "" } },
                ]
            }
        }
    })
}

/// Inbound calls sharing `original_contact_id`.
pub fn inbound_call_query(original_contact_id: &str) -> Value {
    json!({
        "_source": ["original_contact_id", "call_direction", "queue_id"],
        "query": {
            "bool": {
                "must": [
                    { "term": { "call_direction": INBOUND } },
                    { "term": { "original_contact_id": original_contact_id } },
                ]
            }
        }
    })
}

pub fn set_queue_id_script(queue_id: &str) -> Value {
    json!({
        "script": {
            "source": "ctx._source.queue_id = params.queue_id;",
            "lang": "painless",
            "params": { "queue_id": queue_id }
        }
    })
}

pub fn extra_metadata_key(prefix: &str, purpose: &str, filename_prefix: &str) -> String {
    format!("{}/{}-{}.json", prefix, purpose, filename_prefix)
}

/// Outcome of one backfill run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub scanned: usize,
    pub updated: usize,
    pub unmatched: usize,
}

pub struct QueueIdBackfill<'a> {
    search: &'a dyn SearchIndex,
    objects: &'a dyn ObjectStore,
    config: &'a BackfillConfig,
}

impl<'a> QueueIdBackfill<'a> {
    pub fn new(
        search: &'a dyn SearchIndex,
        objects: &'a dyn ObjectStore,
        config: &'a BackfillConfig,
    ) -> Self {
        Self {
            search,
            objects,
            config,
        }
    }

    pub async fn run(&self) -> Result<BackfillSummary> {
        let calls = self.internal_calls_with_empty_queue_id().await?;
        let mut summary = BackfillSummary {
            scanned: calls.len(),
            ..Default::default()
        };

        for call in &calls {
            let index = call
                .index
                .as_deref()
                .unwrap_or(&self.config.call_details_index);
            let Some(contact_id) = call.source.get("original_contact_id").and_then(Value::as_str)
            else {
                warn!("Call {} has no original_contact_id, skipping", call.id);
                summary.unmatched += 1;
                continue;
            };
            info!("Handling call {}", contact_id);

            let Some(queue_id) = self.inbound_queue_id(index, contact_id).await? else {
                info!("No matching inbound call found for call {}", contact_id);
                summary.unmatched += 1;
                continue;
            };

            info!("Updating queue_id value for call {}", contact_id);
            self.search
                .update_by_script(index, &call.id, &set_queue_id_script(&queue_id), DEFAULT_MAX_RETRIES)
                .await?;

            match call.source.get("filename_prefix").and_then(Value::as_str) {
                Some(filename_prefix) => {
                    self.update_extra_metadata(filename_prefix, &queue_id).await?;
                }
                None => warn!("Call {} has no filename_prefix, extra metadata left as is", call.id),
            }
            summary.updated += 1;
        }

        info!(
            "queue_id backfill done: {} scanned, {} updated, {} unmatched",
            summary.scanned, summary.updated, summary.unmatched
        );
        Ok(summary)
    }

    async fn internal_calls_with_empty_queue_id(&self) -> Result<Vec<Hit>> {
        let response = self
            .search
            .search_hits(
                &self.config.call_details_index,
                &empty_queue_id_query(self.config.number_of_days),
            )
            .await?;
        info!("Number of hits in response: {}", response.total());
        Ok(response.hits.hits)
    }

    /// Queue id of the first inbound call for `contact_id`, if any is set.
    async fn inbound_queue_id(&self, index: &str, contact_id: &str) -> Result<Option<String>> {
        let response = self
            .search
            .search_hits(index, &inbound_call_query(contact_id))
            .await?;

        Ok(response
            .hits
            .hits
            .first()
            .and_then(|hit| hit.source.get("queue_id"))
            .and_then(Value::as_str)
            .filter(|queue_id| !queue_id.is_empty())
            .map(str::to_string))
    }

    /// Patch `queue_id` into the call's extra metadata. A missing document is
    /// logged and skipped.
    async fn update_extra_metadata(&self, filename_prefix: &str, queue_id: &str) -> Result<()> {
        let key = extra_metadata_key(
            &self.config.extra_metadata_prefix,
            &self.config.purpose,
            filename_prefix,
        );

        let Some(mut metadata) = self.objects.get_json(&self.config.metadata_bucket, &key).await?
        else {
            error!("Couldn't find file {}, skipping updating extra_metadata", key);
            return Ok(());
        };

        if let Some(fields) = metadata.as_object_mut() {
            fields.insert("queue_id".to_string(), Value::String(queue_id.to_string()));
        }
        self.objects
            .put_json(&self.config.metadata_bucket, &key, &metadata)
            .await
    }
}
