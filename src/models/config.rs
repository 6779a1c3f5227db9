//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root configuration, used by the CLI to drive every handler from one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search index connection settings
    #[serde(default)]
    pub search: SearchConfig,

    /// On-request transcription settings
    #[serde(default)]
    pub on_request: OnRequestConfig,

    /// Answer feedback capture settings
    #[serde(default)]
    pub feedback: FeedbackConfig,

    /// queue_id backfill settings
    #[serde(default)]
    pub backfill: BackfillConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        self.on_request.validate()?;
        Ok(())
    }
}

/// Search index connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Host name of the search domain (no scheme)
    #[serde(default)]
    pub host: String,

    /// Index (or alias) holding call records
    #[serde(default)]
    pub index: String,

    /// Use https
    #[serde(default = "defaults::use_ssl")]
    pub use_ssl: bool,

    /// Region used when signing requests
    #[serde(default = "defaults::region")]
    pub region: String,

    /// Index listing groups allowed to request transcriptions
    #[serde(default)]
    pub access_rights_index: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Fixed headers (e.g. `Authorization`) sent instead of signing requests
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            index: String::new(),
            use_ssl: defaults::use_ssl(),
            region: defaults::region(),
            access_rights_index: None,
            timeout_secs: defaults::timeout(),
            headers: BTreeMap::new(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::config("search.host is empty"));
        }
        if self.index.trim().is_empty() {
            return Err(AppError::config("search.index is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::config("search.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// On-request transcription settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnRequestConfig {
    /// DynamoDB table holding job state
    #[serde(default)]
    pub status_table: String,

    /// Days before job records expire
    #[serde(default = "defaults::days_to_expire")]
    pub days_to_expire: u32,

    /// Bucket holding call audio
    #[serde(default)]
    pub audio_source_bucket: String,

    /// Key prefix of call audio inside the bucket
    #[serde(default)]
    pub audio_source_prefix: String,

    /// Work queue receiving transcription events
    #[serde(default)]
    pub sqs_queue_url: String,

    /// DynamoDB table of permission groups
    #[serde(default)]
    pub permission_groups_table: String,

    /// Replace internal error detail with a generic message
    #[serde(default = "defaults::sanitize")]
    pub sanitize_errors: bool,
}

impl Default for OnRequestConfig {
    fn default() -> Self {
        Self {
            status_table: String::new(),
            days_to_expire: defaults::days_to_expire(),
            audio_source_bucket: String::new(),
            audio_source_prefix: String::new(),
            sqs_queue_url: String::new(),
            permission_groups_table: String::new(),
            sanitize_errors: defaults::sanitize(),
        }
    }
}

impl OnRequestConfig {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("on_request.status_table", &self.status_table),
            ("on_request.audio_source_bucket", &self.audio_source_bucket),
            ("on_request.audio_source_prefix", &self.audio_source_prefix),
            ("on_request.sqs_queue_url", &self.sqs_queue_url),
            ("on_request.permission_groups_table", &self.permission_groups_table),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::config(format!("{name} is empty")));
            }
        }
        if self.days_to_expire == 0 {
            return Err(AppError::config("on_request.days_to_expire must be > 0"));
        }
        Ok(())
    }
}

/// Answer feedback capture settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Bucket holding question history and feedback
    #[serde(default)]
    pub bucket: String,

    #[serde(default)]
    pub feedback_prefix: String,

    #[serde(default)]
    pub question_prefix: String,
}

/// queue_id backfill settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    /// Index (or alias) of call details
    #[serde(default)]
    pub call_details_index: String,

    /// Bucket holding extra metadata documents
    #[serde(default)]
    pub metadata_bucket: String,

    /// Purpose tag prefixed to extra metadata file names
    #[serde(default)]
    pub purpose: String,

    #[serde(default)]
    pub extra_metadata_prefix: String,

    /// How far back to look for internal calls
    #[serde(default = "defaults::number_of_days")]
    pub number_of_days: u32,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            call_details_index: String::new(),
            metadata_bucket: String::new(),
            purpose: String::new(),
            extra_metadata_prefix: String::new(),
            number_of_days: defaults::number_of_days(),
        }
    }
}

pub(crate) mod defaults {
    pub fn use_ssl() -> bool {
        true
    }
    pub fn region() -> String {
        "ca-central-1".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn days_to_expire() -> u32 {
        60
    }
    pub fn sanitize() -> bool {
        true
    }
    pub fn number_of_days() -> u32 {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.search.host = "search.example.com".into();
        config.search.index = "call-details".into();
        config.on_request.status_table = "status".into();
        config.on_request.audio_source_bucket = "audio".into();
        config.on_request.audio_source_prefix = "raw".into();
        config.on_request.sqs_queue_url = "https://sqs/queue".into();
        config.on_request.permission_groups_table = "groups".into();
        config
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_host() {
        let mut config = valid_config();
        config.search.host = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_expiry() {
        let mut config = valid_config();
        config.on_request.days_to_expire = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[search]
host = "search.example.com"
index = "call-details"

[on_request]
status_table = "status"
audio_source_bucket = "audio"
audio_source_prefix = "raw"
sqs_queue_url = "https://sqs/queue"
permission_groups_table = "groups"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.search.use_ssl);
        assert_eq!(config.search.region, "ca-central-1");
        assert_eq!(config.on_request.days_to_expire, 60);
        assert!(config.on_request.sanitize_errors);
        assert_eq!(config.backfill.number_of_days, 4);
        assert!(config.search.headers.is_empty());
    }

    #[test]
    fn load_toml_with_search_headers() {
        let config: Config = toml::from_str(
            r#"
[search]
host = "localhost:9200"
index = "call-details"
use_ssl = false

[search.headers]
Authorization = "ApiKey abc"
"#,
        )
        .unwrap();

        assert_eq!(
            config.search.headers.get("Authorization").map(String::as_str),
            Some("ApiKey abc")
        );
    }
}
