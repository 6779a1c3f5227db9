// src/services/search/mod.rs

//! Search index client.
//!
//! [`SearchIndex`] is the seam the rest of the crate talks to: one required
//! `send` method plus the document operations built on it. [`SearchClient`]
//! implements it over HTTP with a pluggable [`AuthStrategy`].
//!
//! ## Endpoints
//!
//! ```text
//! GET  {index}/_doc/{id}
//! GET  {index}/_search
//! PUT  {index}/_doc/{id}
//! POST {index}/_update/{id}?retry_on_conflict={n}
//! POST {index}/_update_by_query/?retry_on_conflict={n}
//! ```
//!
//! `retry_on_conflict` is a server-side hint; the client itself never retries.

pub mod auth;

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::SearchConfig;

pub use auth::{AuthStrategy, RequestSigner};

/// Default `retry_on_conflict` hint for updates.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Operations against a document search index.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Issue one request and return the parsed JSON response.
    async fn send(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value>;

    /// Fetch a single document by id.
    async fn get_document(&self, index: &str, id: &str) -> Result<Value> {
        self.send(Method::GET, &format!("{}/_doc/{}", index, id), None)
            .await
    }

    /// Run a read-only query.
    async fn search(&self, index: &str, query: &Value) -> Result<Value> {
        self.send(Method::GET, &format!("{}/_search", index), Some(query))
            .await
    }

    /// Run a query and decode the hit list.
    async fn search_hits(&self, index: &str, query: &Value) -> Result<SearchResponse> {
        let raw = self.search(index, query).await?;
        SearchResponse::from_value(raw)
    }

    /// Create or replace a full document.
    async fn add_document(&self, index: &str, id: &str, document: &Value) -> Result<Value> {
        self.send(Method::PUT, &format!("{}/_doc/{}", index, id), Some(document))
            .await
    }

    /// Update a document with a full update body (`doc`, `script`, ...).
    async fn update_document(
        &self,
        index: &str,
        id: &str,
        document: &Value,
        max_retries: u32,
    ) -> Result<Value> {
        let endpoint = format!("{}/_update/{}?retry_on_conflict={}", index, id, max_retries);
        self.send(Method::POST, &endpoint, Some(document)).await
    }

    /// Merge `partial` into an existing document.
    async fn update_partial(
        &self,
        index: &str,
        id: &str,
        partial: &Value,
        max_retries: u32,
    ) -> Result<Value> {
        let body = json!({ "doc": partial });
        self.update_document(index, id, &body, max_retries).await
    }

    /// Update a document with a script.
    async fn update_by_script(
        &self,
        index: &str,
        id: &str,
        script: &Value,
        max_retries: u32,
    ) -> Result<Value> {
        self.update_document(index, id, script, max_retries).await
    }

    /// Update every document matching `update_query`.
    async fn update_by_query(
        &self,
        index: &str,
        update_query: &Value,
        max_retries: u32,
    ) -> Result<Value> {
        let endpoint = format!("{}/_update_by_query/?retry_on_conflict={}", index, max_retries);
        self.send(Method::POST, &endpoint, Some(update_query)).await
    }
}

/// Decoded `_search` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub hits: Hits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub total: Option<HitTotal>,
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HitTotal {
    pub value: u64,
}

/// One matching document.
#[derive(Debug, Clone, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_index", default)]
    pub index: Option<String>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl SearchResponse {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| AppError::search(None, format!("Unexpected search response: {e}")))
    }

    /// Total hit count reported by the index (falls back to the page size).
    pub fn total(&self) -> u64 {
        self.hits
            .total
            .as_ref()
            .map_or(self.hits.hits.len() as u64, |t| t.value)
    }
}

/// Map an HTTP status to the error taxonomy. 2xx passes.
pub fn classify_status(status: u16, body: &str) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        403 => Err(AppError::access_denied(
            "403 Forbidden: Access to the search index denied.",
        )),
        _ => Err(AppError::search(Some(status), body)),
    }
}

/// HTTP search index client.
pub struct SearchClient {
    http: reqwest::Client,
    base_url: Url,
    auth: AuthStrategy,
}

impl SearchClient {
    /// Create a client for the configured host.
    pub fn new(config: &SearchConfig, auth: AuthStrategy) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Self::with_client(http, &config.host, config.use_ssl, auth)
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        host: &str,
        use_ssl: bool,
        auth: AuthStrategy,
    ) -> Result<Self> {
        let base_url = base_url(host, use_ssl)?;
        Ok(Self {
            http,
            base_url,
            auth,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

fn base_url(host: &str, use_ssl: bool) -> Result<Url> {
    let protocol = if use_ssl { "https" } else { "http" };
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(AppError::config("Search host is empty"));
    }
    Ok(Url::parse(&format!("{}://{}/", protocol, host))?)
}

#[async_trait]
impl SearchIndex for SearchClient {
    async fn send(&self, method: Method, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        let url = self.base_url.join(endpoint)?;
        let payload = body.map(serde_json::to_vec).transpose()?.unwrap_or_default();

        info!("Search request: {} {}", method, url);
        info!("Search body: {}", String::from_utf8_lossy(&payload));

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json");
        for (name, value) in self.auth.headers(&method, &url, &payload, Utc::now())? {
            request = request.header(name, value);
        }
        if body.is_some() {
            request = request.body(payload);
        }

        let response = request.send().await.map_err(|e| {
            error!("Search transport error: {}", e);
            AppError::search(None, format!("Error with search server: {e}"))
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            error!("Failed to read search response: {}", e);
            AppError::search(Some(status), format!("Failed to read response body: {e}"))
        })?;

        info!("Search response ({}): {}", status, text);

        if let Err(e) = classify_status(status, &text) {
            error!("Search request failed: {}", e);
            return Err(e);
        }

        serde_json::from_str(&text).map_err(|e| {
            AppError::search(Some(status), format!("Invalid JSON in search response: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSearch;

    #[test]
    fn test_classify_status() {
        assert!(classify_status(200, "").is_ok());
        assert!(classify_status(201, "").is_ok());
        assert!(matches!(
            classify_status(403, "forbidden"),
            Err(AppError::AccessDenied(_))
        ));
        match classify_status(409, "version conflict") {
            Err(AppError::SearchRequest { status, body }) => {
                assert_eq!(status, Some(409));
                assert_eq!(body, "version conflict");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_base_url() {
        let client = SearchClient::with_client(
            reqwest::Client::new(),
            "search.example.com",
            true,
            AuthStrategy::StaticHeaders(Default::default()),
        )
        .unwrap();
        assert_eq!(client.base_url().as_str(), "https://search.example.com/");
        assert_eq!(
            client.base_url().join("calls/_search").unwrap().as_str(),
            "https://search.example.com/calls/_search"
        );

        let plain = base_url("localhost:9200/", false).unwrap();
        assert_eq!(plain.as_str(), "http://localhost:9200/");
        assert!(base_url("  ", true).is_err());
    }

    #[tokio::test]
    async fn test_document_endpoints() {
        let search = FakeSearch::new();
        let doc = json!({"queue_id": "42"});

        search.get_document("calls", "1").await.unwrap();
        search.add_document("calls", "1", &doc).await.unwrap();
        search.update_document("calls", "1", &doc, 5).await.unwrap();
        search
            .update_partial("calls", "1", &doc, DEFAULT_MAX_RETRIES)
            .await
            .unwrap();
        search.update_by_query("calls", &doc, 2).await.unwrap();

        let requests = search.requests();
        let lines: Vec<_> = requests
            .iter()
            .map(|r| format!("{} {}", r.method, r.endpoint))
            .collect();
        assert_eq!(
            lines,
            vec![
                "GET calls/_doc/1",
                "PUT calls/_doc/1",
                "POST calls/_update/1?retry_on_conflict=5",
                "POST calls/_update/1?retry_on_conflict=3",
                "POST calls/_update_by_query/?retry_on_conflict=2",
            ]
        );
        assert_eq!(requests[3].body, Some(json!({"doc": {"queue_id": "42"}})));
    }

    #[test]
    fn test_search_response_decoding() {
        let response = SearchResponse::from_value(json!({
            "hits": {
                "total": {"value": 7, "relation": "eq"},
                "hits": [{"_index": "calls-1", "_id": "a", "_source": {"x": 1}}]
            }
        }))
        .unwrap();
        assert_eq!(response.total(), 7);
        assert_eq!(response.hits.hits[0].id, "a");
        assert_eq!(response.hits.hits[0].index.as_deref(), Some("calls-1"));

        assert!(SearchResponse::from_value(json!({"error": "x"})).is_err());
    }
}
