// src/lambda/mod.rs

//! AWS Lambda handlers.
//!
//! One deployment artifact serves three functions, selected by the `HANDLER`
//! environment variable:
//! 1. `transcribe-on-request` (default): accept a list of call ids
//! 2. `feedback`: save feedback on a generated answer
//! 3. `queue-id-backfill`: scheduled `queue_id` reconciliation
//!
//! Configuration and clients are built once per process in [`App::from_env`]
//! and shared by every invocation.

pub mod event;
pub mod response;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{error, info, instrument};

use crate::clients::{AwsClients, ClientFactory};
use crate::config;
use crate::error::{AppError, Result};
use crate::models::{BackfillConfig, FeedbackConfig, OnRequestConfig, SearchConfig};
use crate::pipeline::{OnRequest, run_backfill, run_feedback, run_on_request};

pub use event::ApiEvent;
pub use response::ApiResponse;

/// Which function this process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerKind {
    #[default]
    TranscribeOnRequest,
    Feedback,
    QueueIdBackfill,
}

impl FromStr for HandlerKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | "transcribe-on-request" => Ok(Self::TranscribeOnRequest),
            "feedback" => Ok(Self::Feedback),
            "queue-id-backfill" => Ok(Self::QueueIdBackfill),
            other => Err(AppError::config(format!("Unknown HANDLER: {other}"))),
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TranscribeOnRequest => "transcribe-on-request",
            Self::Feedback => "feedback",
            Self::QueueIdBackfill => "queue-id-backfill",
        })
    }
}

/// Configuration of the selected handler.
#[derive(Debug, Clone)]
pub enum HandlerConfig {
    OnRequest {
        search: SearchConfig,
        config: OnRequestConfig,
    },
    Feedback(FeedbackConfig),
    Backfill {
        search: SearchConfig,
        config: BackfillConfig,
    },
}

impl HandlerConfig {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::OnRequest { .. } => HandlerKind::TranscribeOnRequest,
            Self::Feedback(_) => HandlerKind::Feedback,
            Self::Backfill { .. } => HandlerKind::QueueIdBackfill,
        }
    }

    fn search(&self) -> SearchConfig {
        match self {
            Self::OnRequest { search, .. } | Self::Backfill { search, .. } => search.clone(),
            Self::Feedback(_) => SearchConfig::default(),
        }
    }
}

/// A configured handler with its clients.
pub struct App {
    clients: Arc<dyn ClientFactory>,
    config: HandlerConfig,
}

impl App {
    pub fn new(clients: Arc<dyn ClientFactory>, config: HandlerConfig) -> Self {
        Self { clients, config }
    }

    /// Read `HANDLER` and the handler's variables, then build AWS clients.
    pub async fn from_env() -> Result<Self> {
        let kind: HandlerKind = std::env::var("HANDLER").unwrap_or_default().parse()?;
        let config = match kind {
            HandlerKind::TranscribeOnRequest => {
                let (search, config) = config::on_request_from_env()?;
                HandlerConfig::OnRequest { search, config }
            }
            HandlerKind::Feedback => HandlerConfig::Feedback(config::feedback_from_env()?),
            HandlerKind::QueueIdBackfill => {
                let (search, config) = config::backfill_from_env()?;
                HandlerConfig::Backfill { search, config }
            }
        };

        let clients = AwsClients::from_env(config.search()).await?;
        info!("Serving {} handler", kind);
        Ok(Self::new(Arc::new(clients), config))
    }

    pub fn kind(&self) -> HandlerKind {
        self.config.kind()
    }

    /// Handle one invocation.
    ///
    /// API handlers always answer with a proxy response; the scheduled
    /// backfill fails the invocation instead.
    #[instrument(skip(self, payload), fields(handler = %self.kind()))]
    pub async fn handle(&self, payload: Value) -> Result<Value> {
        match &self.config {
            HandlerConfig::OnRequest { search, config } => {
                let response = match self.on_request(search, config, payload).await {
                    Ok(call_ids) => ApiResponse::created(&json!(call_ids)),
                    Err(e) => ApiResponse::from_error(&e, config.sanitize_errors),
                };
                Ok(response.into_value())
            }
            HandlerConfig::Feedback(config) => {
                let response = match self.feedback(config, payload).await {
                    Ok(body) => ApiResponse::ok(&body),
                    Err(e) => ApiResponse::from_error(&e, true),
                };
                Ok(response.into_value())
            }
            HandlerConfig::Backfill { config, .. } => {
                info!("Event received: {}", payload);
                let summary = run_backfill(self.clients.as_ref(), config)
                    .await
                    .inspect_err(|e| error!("queue_id backfill failed: {}", e))?;
                Ok(serde_json::to_value(summary)?)
            }
        }
    }

    async fn on_request(
        &self,
        search: &SearchConfig,
        config: &OnRequestConfig,
        payload: Value,
    ) -> Result<Vec<String>> {
        let event = ApiEvent::from_value(payload)?;
        let request = OnRequest {
            user: event.user()?,
            credentials: event.credentials()?,
            body: event.json_body()?,
        };

        let accepted = run_on_request(self.clients.as_ref(), search, config, request).await?;
        info!(
            "Job {} accepted for {} calls",
            accepted.job_id,
            accepted.call_ids.len()
        );
        Ok(accepted.call_ids)
    }

    async fn feedback(&self, config: &FeedbackConfig, payload: Value) -> Result<Value> {
        let event = ApiEvent::from_value(payload)?;
        let body = event.json_body()?;
        run_feedback(
            self.clients.as_ref(),
            config,
            event.path_parameter("questionId"),
            &body,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeClients, FakeSearch, call_source, hit, permission_group};

    fn on_request_app(search: FakeSearch) -> (Arc<FakeClients>, App) {
        let clients = Arc::new(FakeClients::new(
            search,
            vec![permission_group("Call Transcribers", &["BEL"], &["RE"])],
        ));
        let config = HandlerConfig::OnRequest {
            search: SearchConfig {
                host: "search.example.com".into(),
                index: "call-details".into(),
                ..Default::default()
            },
            config: OnRequestConfig {
                status_table: "status".into(),
                audio_source_bucket: "audio".into(),
                audio_source_prefix: "raw".into(),
                sqs_queue_url: "https://sqs/queue".into(),
                permission_groups_table: "groups".into(),
                ..Default::default()
            },
        };
        (clients.clone(), App::new(clients, config))
    }

    fn api_event(body: Value) -> Value {
        json!({
            "body": body,
            "requestContext": {
                "authorizer": {
                    "username": "AzureId_test.user@example.com",
                    "id_access_token": "access",
                    "id_secret_key": "secret",
                    "id_session_token": "session"
                }
            }
        })
    }

    #[test]
    fn test_handler_kind_parsing() {
        assert_eq!("".parse::<HandlerKind>().unwrap(), HandlerKind::TranscribeOnRequest);
        assert_eq!("feedback".parse::<HandlerKind>().unwrap(), HandlerKind::Feedback);
        assert_eq!(
            "queue-id-backfill".parse::<HandlerKind>().unwrap(),
            HandlerKind::QueueIdBackfill
        );
        assert!("transcribe".parse::<HandlerKind>().is_err());
        assert_eq!(HandlerKind::QueueIdBackfill.to_string(), "queue-id-backfill");
    }

    #[tokio::test]
    async fn test_on_request_created() {
        let (clients, app) = on_request_app(FakeSearch::with_hits(vec![
            hit("7654321", call_source("f_7654321", "BEL", "RE")),
            hit("1234567", call_source("f_1234567", "BEL", "RE")),
        ]));

        let response = app
            .handle(api_event(json!("[\"7654321\", \"1234567\"]")))
            .await
            .unwrap();

        assert_eq!(response["statusCode"], 201);
        let body: Value = serde_json::from_str(response["body"].as_str().unwrap()).unwrap();
        assert_eq!(body, json!(["7654321", "1234567"]));
        assert_eq!(clients.jobs.jobs()[0].user_id, "test.user@example.com");
        assert_eq!(clients.queue.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_on_request_error_responses() {
        let (_, app) = on_request_app(FakeSearch::with_hits(vec![hit(
            "7654321",
            call_source("f_7654321", "BEL", "RE"),
        )]));

        let response = app
            .handle(api_event(json!(["7654321", "1234567"])))
            .await
            .unwrap();
        assert_eq!(response["statusCode"], 400);
        assert!(
            response["body"]
                .as_str()
                .unwrap()
                .contains("Invalid call_ids: ['1234567']")
        );

        let response = app.handle(json!({"body": "[]"})).await.unwrap();
        assert_eq!(response["statusCode"], 403);

        let response = app.handle(api_event(json!({"ids": []}))).await.unwrap();
        assert_eq!(response["statusCode"], 400);
    }

    #[tokio::test]
    async fn test_unreadable_validation_response() {
        let (_, app) = on_request_app(FakeSearch::with_responder(|_, endpoint, _| {
            if endpoint.contains("_search") {
                Ok(json!({"unexpected": true}))
            } else {
                Ok(json!({}))
            }
        }));

        let response = app.handle(api_event(json!(["1"]))).await.unwrap();

        assert_eq!(response["statusCode"], 400);
        assert!(
            response["body"]
                .as_str()
                .unwrap()
                .contains("Search query failed with error")
        );
    }

    #[tokio::test]
    async fn test_feedback_handler() {
        let clients = Arc::new(FakeClients::new(FakeSearch::new(), vec![]));
        clients
            .objects
            .insert("history", "questions/q1.json", json!({"question": "?"}));
        let app = App::new(
            clients.clone(),
            HandlerConfig::Feedback(FeedbackConfig {
                bucket: "history".into(),
                feedback_prefix: "feedback".into(),
                question_prefix: "questions".into(),
            }),
        );

        let response = app
            .handle(json!({
                "pathParameters": {"questionId": "q1"},
                "body": "{\"feedback\": {\"helpful\": true}}"
            }))
            .await
            .unwrap();
        assert_eq!(response["statusCode"], 200);

        let response = app
            .handle(json!({
                "pathParameters": {"questionId": "missing"},
                "body": "{\"feedback\": {\"helpful\": true}}"
            }))
            .await
            .unwrap();
        assert_eq!(response["statusCode"], 404);
    }

    #[tokio::test]
    async fn test_backfill_handler_returns_summary() {
        let clients = Arc::new(FakeClients::new(FakeSearch::with_hits(vec![]), vec![]));
        let app = App::new(
            clients,
            HandlerConfig::Backfill {
                search: SearchConfig::default(),
                config: BackfillConfig {
                    call_details_index: "call-details".into(),
                    ..Default::default()
                },
            },
        );

        let summary = app.handle(json!({"source": "aws.events"})).await.unwrap();
        assert_eq!(summary, json!({"scanned": 0, "updated": 0, "unmatched": 0}));
    }
}
