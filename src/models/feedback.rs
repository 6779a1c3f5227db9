//! Answer feedback submitted by a user.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};

/// Feedback on one generated answer. Members other than `helpful` are kept
/// as submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub helpful: bool,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const INVALID_FEEDBACK: &str = "Invalid feedback value: Must be a boolean True or False";

impl Feedback {
    /// Extract the `feedback` member of a request body.
    pub fn from_body(body: &Value) -> Result<Self> {
        let feedback = body
            .get("feedback")
            .ok_or_else(|| AppError::validation(INVALID_FEEDBACK))?;
        serde_json::from_value(feedback.clone()).map_err(|_| AppError::validation(INVALID_FEEDBACK))
    }
}
