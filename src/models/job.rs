//! On-request transcription job records.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of one call within a job.
///
/// Only `InProgress` is written here; downstream consumers move the record on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }
}

/// Identifier of one on-request job: `job_{8 hex}_{YYYY-MM-DDTHH:MM:SS}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh job id stamped with the current UTC time.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(now: DateTime<Utc>) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        let timestamp = now
            .to_rfc3339_opts(SecondsFormat::Secs, true)
            .trim_end_matches('Z')
            .to_string();
        Self(format!("job_{}_{}", &random[..8], timestamp))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable record that transcription of `call_id` was requested under `job_id`.
///
/// Keyed by (`jobId`, `callId`); `expireAt` is the store's TTL attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeOnRequestJob {
    pub job_id: String,
    pub call_id: String,
    pub user_id: String,
    /// Epoch seconds at creation
    pub last_update: i64,
    /// Epoch seconds after which the store reaps the record
    pub expire_at: i64,
    pub status: JobStatus,
}
