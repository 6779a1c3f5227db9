// src/lambda/event.rs

//! API Gateway proxy events.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{DelegatedCredentials, User};

/// Inbound proxy event; fields not listed here are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    /// JSON text, or already decoded JSON
    #[serde(default)]
    pub body: Option<Value>,

    #[serde(default)]
    pub path_parameters: Option<HashMap<String, String>>,

    #[serde(default)]
    pub request_context: RequestContext,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestContext {
    /// Context set by the request authorizer
    #[serde(default)]
    pub authorizer: Map<String, Value>,
}

impl ApiEvent {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| AppError::validation(format!("Malformed request event: {e}")))
    }

    /// Decoded body; a missing body decodes to `null`.
    pub fn json_body(&self) -> Result<Value> {
        match &self.body {
            None | Some(Value::Null) => Ok(Value::Null),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(Value::Null),
            Some(Value::String(text)) => serde_json::from_str(text)
                .map_err(|_| AppError::validation("BAD REQUEST: body is not valid JSON")),
            Some(other) => Ok(other.clone()),
        }
    }

    pub fn path_parameter(&self, name: &str) -> Option<&str> {
        self.path_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
    }

    fn authorizer_str(&self, key: &str) -> Option<&str> {
        self.request_context
            .authorizer
            .get(key)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The caller, from the authorizer's `username` (`<provider>_<email>`).
    pub fn user(&self) -> Result<User> {
        let username = self
            .authorizer_str("username")
            .ok_or_else(|| AppError::access_denied("No authenticated user in request"))?;
        Ok(User {
            email: email_from_username(username).to_string(),
        })
    }

    /// Delegated credentials issued to the caller by the authorizer.
    pub fn credentials(&self) -> Result<DelegatedCredentials> {
        let access_key_id = self.authorizer_str("id_access_token");
        let secret_access_key = self.authorizer_str("id_secret_key");

        match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(DelegatedCredentials {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                session_token: self.authorizer_str("id_session_token").map(str::to_string),
            }),
            _ => Err(AppError::config(
                "Search client configuration failed due to missing credentials.",
            )),
        }
    }
}

/// Strip the identity-provider prefix from a federated user name.
pub fn email_from_username(username: &str) -> &str {
    username
        .split_once('_')
        .map_or(username, |(_, email)| email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(body: Value) -> ApiEvent {
        ApiEvent::from_value(json!({
            "headers": {"Accept-Encoding": "identity"},
            "body": body,
            "pathParameters": {"questionId": "q1"},
            "requestContext": {
                "authorizer": {
                    "id_session_token": "session",
                    "id_secret_key": "secret",
                    "identity_id": "ca-central-1:abc123",
                    "principalId": "abc123",
                    "integrationLatency": 440,
                    "id_access_token": "access",
                    "username": "AzureId_test.user@example.com"
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_identity_from_authorizer() {
        let event = event(json!(["1"]));

        assert_eq!(event.user().unwrap().email, "test.user@example.com");
        assert_eq!(
            event.credentials().unwrap(),
            DelegatedCredentials {
                access_key_id: "access".into(),
                secret_access_key: "secret".into(),
                session_token: Some("session".into()),
            }
        );
        assert_eq!(event.path_parameter("questionId"), Some("q1"));
        assert_eq!(event.path_parameter("other"), None);
    }

    #[test]
    fn test_missing_identity() {
        let event = ApiEvent::from_value(json!({"body": "[]"})).unwrap();
        assert_eq!(event.user().unwrap_err().status_code(), 403);
        assert_eq!(event.credentials().unwrap_err().status_code(), 500);
    }

    #[test]
    fn test_body_forms() {
        assert_eq!(event(json!(["1", "2"])).json_body().unwrap(), json!(["1", "2"]));
        assert_eq!(event(json!("[\"1\"]")).json_body().unwrap(), json!(["1"]));
        assert_eq!(event(Value::Null).json_body().unwrap(), Value::Null);
        assert_eq!(event(json!("not json")).json_body().unwrap_err().status_code(), 400);
    }

    #[test]
    fn test_email_from_username() {
        assert_eq!(email_from_username("Idp_a_b@example.com"), "a_b@example.com");
        assert_eq!(email_from_username("plain@example.com"), "plain@example.com");
    }
}
