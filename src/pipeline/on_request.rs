// src/pipeline/on_request.rs

//! On-request transcription workflow.
//!
//! One request moves linearly through
//!
//! ```text
//! Received → IdentityResolved → AccessBuilt → CallsValidated
//!          → JobRecorded → EventsPublished → Accepted
//! ```
//!
//! and any failing step ends it in `Rejected`. Nothing done by an earlier
//! step is undone: job records written before a failed publish stay until
//! their TTL reaps them.
//!
//! Repeated call ids are collapsed before anything else happens, since one
//! job holds a single record per call. The accepted list echoed back is
//! therefore the deduplicated one, in first-seen order.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;
use tracing::{error, info};

use crate::clients::ClientFactory;
use crate::error::{AppError, Result};
use crate::models::{DelegatedCredentials, JobId, OnRequestConfig, SearchConfig, User};
use crate::services::{
    CallValidator, EventPublisher, JobStateWriter, check_access_rights, resolve_access,
};

/// Progress of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    IdentityResolved,
    AccessBuilt,
    CallsValidated,
    JobRecorded,
    EventsPublished,
    Accepted,
    Rejected,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "RECEIVED",
            Stage::IdentityResolved => "IDENTITY_RESOLVED",
            Stage::AccessBuilt => "ACCESS_BUILT",
            Stage::CallsValidated => "CALLS_VALIDATED",
            Stage::JobRecorded => "JOB_RECORDED",
            Stage::EventsPublished => "EVENTS_PUBLISHED",
            Stage::Accepted => "ACCEPTED",
            Stage::Rejected => "REJECTED",
        };
        f.write_str(name)
    }
}

/// Records and logs stage transitions.
#[derive(Debug)]
struct StageTracker {
    current: Stage,
    history: Vec<Stage>,
}

impl StageTracker {
    fn new() -> Self {
        info!("On-request stage: {}", Stage::Received);
        Self {
            current: Stage::Received,
            history: vec![Stage::Received],
        }
    }

    fn advance(&mut self, next: Stage) {
        info!("On-request stage: {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
    }

    fn reject(&mut self, reason: &AppError) {
        error!(
            "On-request rejected after {} (status {}): {}",
            self.current,
            reason.status_code(),
            reason
        );
        self.current = Stage::Rejected;
        self.history.push(Stage::Rejected);
    }
}

/// An authenticated on-request submission.
#[derive(Debug, Clone)]
pub struct OnRequest {
    pub user: User,
    pub credentials: DelegatedCredentials,
    pub body: Value,
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub job_id: JobId,
    pub call_ids: Vec<String>,
    pub published: usize,
    pub stages: Vec<Stage>,
}

/// Parse the request body: a non-empty list of call id strings.
///
/// Repeated ids are kept once, in first-seen order.
pub fn parse_call_ids(body: &Value) -> Result<Vec<String>> {
    let items = body
        .as_array()
        .ok_or_else(|| AppError::validation("Request body must be a list of call_ids"))?;

    let mut seen = HashSet::new();
    let mut call_ids = Vec::with_capacity(items.len());
    for item in items {
        let id = item
            .as_str()
            .ok_or_else(|| AppError::validation(format!("Invalid call_id: {item}")))?;
        if seen.insert(id) {
            call_ids.push(id.to_string());
        }
    }

    if call_ids.is_empty() {
        return Err(AppError::validation("Request body must contain at least one call_id"));
    }
    Ok(call_ids)
}

/// Run the workflow for one submission.
pub async fn run_on_request(
    clients: &dyn ClientFactory,
    search_config: &SearchConfig,
    config: &OnRequestConfig,
    request: OnRequest,
) -> Result<Accepted> {
    let mut tracker = StageTracker::new();

    match process(&mut tracker, clients, search_config, config, &request).await {
        Ok((job_id, call_ids, published)) => {
            tracker.advance(Stage::Accepted);
            Ok(Accepted {
                job_id,
                call_ids,
                published,
                stages: tracker.history,
            })
        }
        Err(e) => {
            tracker.reject(&e);
            Err(e)
        }
    }
}

async fn process(
    tracker: &mut StageTracker,
    clients: &dyn ClientFactory,
    search_config: &SearchConfig,
    config: &OnRequestConfig,
    request: &OnRequest,
) -> Result<(JobId, Vec<String>, usize)> {
    let call_ids = parse_call_ids(&request.body)?;
    let email = request.user.email.as_str();
    info!("User {} requested transcription of {} calls", email, call_ids.len());

    let search = clients.search_index(&request.credentials).await?;
    tracker.advance(Stage::IdentityResolved);

    let directory = clients.group_directory(&config.permission_groups_table);
    let policy = resolve_access(directory.as_ref(), email).await?;
    if let Some(index) = &search_config.access_rights_index {
        check_access_rights(search.as_ref(), index, &policy).await?;
    }
    tracker.advance(Stage::AccessBuilt);

    CallValidator::new(search.as_ref(), &search_config.index)
        .validate(&call_ids, &policy.filter)
        .await?;
    tracker.advance(Stage::CallsValidated);

    let job_id = JobId::generate();
    let store = clients.job_store(&request.credentials);
    JobStateWriter::new(store.as_ref(), &config.status_table)
        .record_job(&job_id, &call_ids, email, config.days_to_expire)
        .await?;
    tracker.advance(Stage::JobRecorded);

    let queue = clients.work_queue(&request.credentials);
    let published = EventPublisher::new(
        search.as_ref(),
        &search_config.index,
        queue.as_ref(),
        &config.sqs_queue_url,
    )
    .with_audio_source(&config.audio_source_bucket, &config.audio_source_prefix)
    .publish(&call_ids, &job_id, email)
    .await?;
    tracker.advance(Stage::EventsPublished);

    Ok((job_id, call_ids, published))
}
