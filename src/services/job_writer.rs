// src/services/job_writer.rs

//! Job state writer: records one IN_PROGRESS item per call before anything
//! is published.

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info};

use crate::error::Result;
use crate::models::{JobId, JobStatus, TranscribeOnRequestJob};
use crate::storage::JobStore;

/// Build the job records of one request. Every record shares the same
/// `lastUpdate` and `expireAt`.
pub fn build_jobs(
    job_id: &JobId,
    call_ids: &[String],
    user_email: &str,
    days_to_expire: u32,
    now: DateTime<Utc>,
) -> Vec<TranscribeOnRequestJob> {
    let last_update = now.timestamp();
    let expire_at = (now + Duration::days(i64::from(days_to_expire))).timestamp();

    call_ids
        .iter()
        .map(|call_id| TranscribeOnRequestJob {
            job_id: job_id.to_string(),
            call_id: call_id.clone(),
            user_id: user_email.to_string(),
            last_update,
            expire_at,
            status: JobStatus::InProgress,
        })
        .collect()
}

pub struct JobStateWriter<'a> {
    store: &'a dyn JobStore,
    table: &'a str,
}

impl<'a> JobStateWriter<'a> {
    pub fn new(store: &'a dyn JobStore, table: &'a str) -> Self {
        Self { store, table }
    }

    pub async fn record_job(
        &self,
        job_id: &JobId,
        call_ids: &[String],
        user_email: &str,
        days_to_expire: u32,
    ) -> Result<()> {
        self.record_job_at(job_id, call_ids, user_email, days_to_expire, Utc::now())
            .await
    }

    /// Write the whole batch. A failure leaves already written items to
    /// expire through the table TTL.
    pub async fn record_job_at(
        &self,
        job_id: &JobId,
        call_ids: &[String],
        user_email: &str,
        days_to_expire: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let jobs = build_jobs(job_id, call_ids, user_email, days_to_expire, now);

        self.store
            .write_batch(self.table, &jobs)
            .await
            .inspect_err(|e| error!("Failed to record job {}: {}", job_id, e))?;

        info!(
            "Recorded job {} for {} calls in {}",
            job_id,
            jobs.len(),
            self.table
        );
        Ok(())
    }
}
