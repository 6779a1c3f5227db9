// src/lambda/response.rs

//! Proxy responses: `{statusCode, body}` with a JSON-encoded body.

use serde_json::{Value, json};
use tracing::error;

use crate::error::AppError;

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status_code: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status_code: u16, body: &Value) -> Self {
        Self {
            status_code,
            body: body.to_string(),
        }
    }

    pub fn ok(body: &Value) -> Self {
        Self::new(200, body)
    }

    pub fn created(body: &Value) -> Self {
        Self::new(201, body)
    }

    /// Render an error as `{"errorMessage": ...}`. With `sanitize`, internal
    /// errors only carry a generic message and the detail goes to the log.
    pub fn from_error(err: &AppError, sanitize: bool) -> Self {
        let status_code = err.status_code();
        error!("Request failed with status {}: {}", status_code, err);

        let message = if sanitize && err.is_internal() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            err.to_string()
        };
        Self::new(status_code, &json!({ "errorMessage": message }))
    }

    pub fn into_value(self) -> Value {
        json!({ "statusCode": self.status_code, "body": self.body })
    }
}
