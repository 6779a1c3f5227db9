// src/services/search/auth.rs

//! Authentication strategies for the search client.
//!
//! The strategy is chosen once when the client is built and applied to every
//! request: either a fixed set of headers (token style) or AWS Signature
//! Version 4 request signing with delegated credentials.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Method;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::DelegatedCredentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "es";

/// How requests to the search index are authenticated.
#[derive(Debug, Clone)]
pub enum AuthStrategy {
    /// Headers added verbatim to every request
    StaticHeaders(BTreeMap<String, String>),
    /// Per-request SigV4 signature
    RequestSigning(RequestSigner),
}

impl AuthStrategy {
    /// Sign requests with delegated credentials.
    pub fn signing(credentials: DelegatedCredentials, region: impl Into<String>) -> Self {
        Self::RequestSigning(RequestSigner::new(credentials, region))
    }

    /// Headers to attach to one request.
    pub fn headers(
        &self,
        method: &Method,
        url: &Url,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>> {
        match self {
            AuthStrategy::StaticHeaders(headers) => Ok(headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            AuthStrategy::RequestSigning(signer) => signer.sign(method, url, payload, now),
        }
    }
}

/// SigV4 signer for the managed search service.
#[derive(Clone)]
pub struct RequestSigner {
    credentials: DelegatedCredentials,
    region: String,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("access_key_id", &self.credentials.access_key_id)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    pub fn new(credentials: DelegatedCredentials, region: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
        }
    }

    /// Compute the `authorization`, `x-amz-date` and (with a session token)
    /// `x-amz-security-token` headers for one request.
    pub fn sign(
        &self,
        method: &Method,
        url: &Url,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, String)>> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();
        let payload_hash = hex::encode(Sha256::digest(payload));

        // Sorted by name
        let mut signed = vec![
            ("content-type", "application/json".to_string()),
            ("host", host_header(url)?),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            signed.push(("x-amz-security-token", token.clone()));
        }

        let canonical_headers: String = signed
            .iter()
            .map(|(name, value)| format!("{}:{}\n", name, value.trim()))
            .collect();
        let signed_headers = signed
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            method.as_str(),
            canonical_uri(url),
            canonical_query(url),
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let scope = format!("{}/{}/{}/aws4_request", date_stamp, self.region, SERVICE);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = self.signing_key(&date_stamp)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, self.credentials.access_key_id, scope, signed_headers, signature
        );

        let mut headers = vec![
            ("authorization".to_string(), authorization),
            ("x-amz-date".to_string(), amz_date),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        Ok(headers)
    }

    fn signing_key(&self, date_stamp: &str) -> Result<Vec<u8>> {
        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), date_stamp.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| AppError::config(format!("Invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Host header value as the HTTP client will send it.
fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::config(format!("URL has no host: {url}")))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Path segments are encoded a second time on top of the URL's own encoding.
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// RFC 3986 encoding: everything but unreserved characters is escaped.
fn uri_encode(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
