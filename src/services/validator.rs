// src/services/validator.rs

//! Call validator.
//!
//! A batch of requested call ids is valid only if every id names a recent,
//! not yet transcribed call the user may see. An id can be missing for any
//! of those reasons and the error never says which one.

use std::collections::HashSet;

use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::models::AccessFilter;
use crate::services::search::SearchIndex;

/// Only calls created inside this window can be transcribed on request.
pub const RECENT_CALLS_WINDOW: &str = "now-365d";

/// Clauses shared by every query over transcribable calls.
pub(crate) fn transcribable_clauses() -> [Value; 2] {
    [
        json!({ "range": { "created_at_": { "gte": RECENT_CALLS_WINDOW } } }),
        json!({ "match": { "transcribed": false } }),
    ]
}

/// Build the validation query. `size` is the number of requested ids.
pub fn validation_query(call_ids: &[String], filter: &AccessFilter) -> Value {
    let [recent, untranscribed] = transcribable_clauses();
    json!({
        "_source": ["_id"],
        "query": {
            "bool": {
                "must": [
                    recent,
                    { "terms": { "_id": call_ids } },
                    untranscribed,
                    filter.to_query(),
                ]
            }
        },
        "size": call_ids.len()
    })
}

/// Requested ids absent from `found`, in request order, without duplicates.
pub fn missing_ids(requested: &[String], found: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    requested
        .iter()
        .filter(|id| !found.contains(*id) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Render ids as `['a', 'b']`.
pub fn format_id_list(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{}'", id)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Validates call ids against the call-details index.
pub struct CallValidator<'a> {
    search: &'a dyn SearchIndex,
    index: &'a str,
}

impl<'a> CallValidator<'a> {
    pub fn new(search: &'a dyn SearchIndex, index: &'a str) -> Self {
        Self { search, index }
    }

    /// Fail with `Validation("Invalid call_ids: [...]")` unless every id
    /// matches.
    pub async fn validate(&self, call_ids: &[String], filter: &AccessFilter) -> Result<()> {
        let query = validation_query(call_ids, filter);

        let response = self
            .search
            .search_hits(self.index, &query)
            .await
            .map_err(|e| match e {
                AppError::AccessDenied(_) => {
                    error!("Access denied when querying the search index: {}", e);
                    AppError::access_denied("Access to the search index was denied.")
                }
                other => {
                    error!("An error occurred while querying the search index: {}", other);
                    AppError::validation(format!("Search query failed with error: {other}"))
                }
            })?;

        let found: HashSet<String> = response.hits.hits.into_iter().map(|h| h.id).collect();
        let missing = missing_ids(call_ids, &found);

        if !missing.is_empty() {
            let listed = format_id_list(&missing);
            info!("Invalid call_ids: {}", listed);
            return Err(AppError::validation(format!("Invalid call_ids: {listed}")));
        }

        info!("Validated {} call ids", call_ids.len());
        Ok(())
    }
}
