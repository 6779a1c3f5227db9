//! AWS Lambda entry point for the call transcription handlers
//!
//! Deploy with `cargo lambda build --release --features lambda`; the
//! `HANDLER` environment variable selects the function served.

use std::sync::Arc;

use call_transcription::error::AppError;
use call_transcription::lambda::{ApiResponse, App};
use lambda_runtime::{Error as LambdaError, LambdaEvent, service_fn};
use serde_json::Value;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the AWS Lambda function.
#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Call transcription Lambda starting...");

    let app = match App::from_env().await {
        Ok(app) => Arc::new(app),
        Err(e) => {
            error!("Handler setup failed: {}", e);
            return serve_configuration_error(e.to_string()).await;
        }
    };

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let app = Arc::clone(&app);
        async move { handler(&app, event).await }
    }))
    .await
}

/// Handler for AWS Lambda events.
async fn handler(app: &App, event: LambdaEvent<Value>) -> Result<Value, LambdaError> {
    let (payload, context) = event.into_parts();
    info!("Received event (request id {})", context.request_id);

    Ok(app.handle(payload).await?)
}

/// Answer every invocation with a 500 when the deployment is misconfigured.
async fn serve_configuration_error(message: String) -> Result<(), LambdaError> {
    lambda_runtime::run(service_fn(move |_event: LambdaEvent<Value>| {
        let err = AppError::Configuration(message.clone());
        async move { Ok::<Value, LambdaError>(ApiResponse::from_error(&err, true).into_value()) }
    }))
    .await
}
