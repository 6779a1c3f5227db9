// src/pipeline/feedback.rs

//! Answer feedback capture.

use serde_json::Value;
use tracing::{error, info};

use crate::clients::ClientFactory;
use crate::error::{AppError, Result};
use crate::models::{Feedback, FeedbackConfig};
use crate::services::FeedbackRecorder;
use crate::services::feedback::saved_message;

/// Save the feedback in `body` for `question_id` and return the success body.
pub async fn run_feedback(
    clients: &dyn ClientFactory,
    config: &FeedbackConfig,
    question_id: Option<&str>,
    body: &Value,
) -> Result<Value> {
    let question_id = question_id.filter(|id| !id.trim().is_empty()).ok_or_else(|| {
        error!("questionId is missing from pathParameters.");
        AppError::validation("questionId is missing from pathParameters.")
    })?;

    let feedback = Feedback::from_body(body)?;

    let store = clients.object_store();
    let key = FeedbackRecorder::new(store.as_ref(), config)
        .record(question_id, &feedback)
        .await?;

    info!("Feedback for {} saved to {}", question_id, key);
    Ok(saved_message(question_id))
}
