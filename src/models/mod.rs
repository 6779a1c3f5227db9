// src/models/mod.rs

//! Domain models for the transcription handlers.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod access;
mod call;
pub(crate) mod config;
mod feedback;
mod job;

// Re-export all public types
pub use access::{AccessFilter, PermissionGroup};
pub use call::{CallMetadata, OnRequestEvent, wav_url};
pub use config::{BackfillConfig, Config, FeedbackConfig, OnRequestConfig, SearchConfig};
pub use feedback::Feedback;
pub use job::{JobId, JobStatus, TranscribeOnRequestJob};

/// Delegated AWS credentials carried by the request authorizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
}
