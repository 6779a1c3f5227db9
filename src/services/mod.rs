//! Service layer for the transcription handlers.
//!
//! This module contains the business logic for:
//! - Search index access (`search`)
//! - Access policy resolution (`resolve_access`, `check_access_rights`)
//! - Call id validation (`CallValidator`)
//! - Job state recording (`JobStateWriter`)
//! - Metadata fetching and event publishing (`EventPublisher`)
//! - Answer feedback capture (`FeedbackRecorder`)
//! - `queue_id` backfill (`QueueIdBackfill`)

pub mod access;
pub mod feedback;
pub mod job_writer;
pub mod publisher;
pub mod queue_id;
pub mod search;
pub mod validator;

pub use access::{AccessPolicy, check_access_rights, resolve_access};
pub use feedback::FeedbackRecorder;
pub use job_writer::JobStateWriter;
pub use publisher::EventPublisher;
pub use queue_id::{BackfillSummary, QueueIdBackfill};
pub use validator::CallValidator;
