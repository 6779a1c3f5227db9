// src/services/feedback.rs

//! Feedback recorder: copies a stored question with the user's feedback
//! attached into the feedback area of the bucket.

use serde_json::{Value, json};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Feedback, FeedbackConfig};
use crate::storage::ObjectStore;

pub fn question_key(question_prefix: &str, question_id: &str) -> String {
    format!("{}/{}.json", question_prefix, question_id)
}

pub fn feedback_key(feedback_prefix: &str, feedback_id: &Uuid, question_id: &str) -> String {
    format!("{}/feedback_{}_{}.json", feedback_prefix, feedback_id, question_id)
}

pub struct FeedbackRecorder<'a> {
    store: &'a dyn ObjectStore,
    config: &'a FeedbackConfig,
}

impl<'a> FeedbackRecorder<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a FeedbackConfig) -> Self {
        Self { store, config }
    }

    /// Save `feedback` for `question_id`. Returns the key written.
    pub async fn record(&self, question_id: &str, feedback: &Feedback) -> Result<String> {
        self.record_as(question_id, feedback, Uuid::new_v4()).await
    }

    pub async fn record_as(
        &self,
        question_id: &str,
        feedback: &Feedback,
        feedback_id: Uuid,
    ) -> Result<String> {
        let source_key = question_key(&self.config.question_prefix, question_id);
        info!("Getting question data from key {}", source_key);

        let mut document = self
            .store
            .get_json(&self.config.bucket, &source_key)
            .await?
            .ok_or_else(|| {
                error!("No question data at {}", source_key);
                AppError::NotFound(format!("questionId {} not found in S3.", question_id))
            })?;

        if !document.is_object() {
            document = json!({ "question": document });
        }
        document["feedback"] = serde_json::to_value(feedback)?;

        let target_key = feedback_key(&self.config.feedback_prefix, &feedback_id, question_id);
        info!("Saving feedback with question data to key {}", target_key);
        self.store
            .put_json(&self.config.bucket, &target_key, &document)
            .await
            .inspect_err(|e| error!("Error saving feedback: {}", e))?;

        Ok(target_key)
    }
}

/// Success body of the feedback handler.
pub fn saved_message(question_id: &str) -> Value {
    json!({ "message": format!("Feedback for questionId {} saved successfully.", question_id) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeObjectStore;

    fn config() -> FeedbackConfig {
        FeedbackConfig {
            bucket: "history".into(),
            feedback_prefix: "feedback".into(),
            question_prefix: "questions".into(),
        }
    }

    fn feedback(helpful: bool) -> Feedback {
        Feedback::from_body(&json!({"feedback": {"helpful": helpful}})).unwrap()
    }

    #[tokio::test]
    async fn test_record_copies_question_with_feedback() {
        let store = FakeObjectStore::new();
        store.insert("history", "questions/q1.json", json!({"question": "why?", "answer": "because"}));
        let config = config();
        let recorder = FeedbackRecorder::new(&store, &config);
        let id = Uuid::nil();

        let key = recorder.record_as("q1", &feedback(true), id).await.unwrap();

        assert_eq!(key, format!("feedback/feedback_{}_q1.json", id));
        let saved = store.get("history", &key).unwrap();
        assert_eq!(saved["answer"], "because");
        assert_eq!(saved["feedback"], json!({"helpful": true}));
        // The question itself is left untouched.
        assert!(store.get("history", "questions/q1.json").unwrap().get("feedback").is_none());
    }

    #[tokio::test]
    async fn test_record_missing_question_is_not_found() {
        let store = FakeObjectStore::new();
        let config = config();
        let err = FeedbackRecorder::new(&store, &config)
            .record("missing", &feedback(false))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "questionId missing not found in S3.");
    }

    #[tokio::test]
    async fn test_record_write_failure() {
        let store = FakeObjectStore::failing_writes();
        store.insert("history", "questions/q1.json", json!({}));
        let config = config();

        let err = FeedbackRecorder::new(&store, &config)
            .record("q1", &feedback(true))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ObjectStore(_)));
    }

    #[test]
    fn test_saved_message() {
        assert_eq!(
            saved_message("q1"),
            json!({"message": "Feedback for questionId q1 saved successfully."})
        );
    }
}
