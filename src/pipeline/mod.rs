//! Pipeline entry points, one per handler.
//!
//! - `run_on_request`: Validate calls, record the job and publish events
//! - `run_feedback`: Save answer feedback next to its question
//! - `run_backfill`: Copy inbound queue ids onto internal calls

pub mod backfill;
pub mod feedback;
pub mod on_request;

pub use backfill::run_backfill;
pub use feedback::run_feedback;
pub use on_request::{Accepted, OnRequest, Stage, run_on_request};
