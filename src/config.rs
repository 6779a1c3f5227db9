// src/config.rs

//! Configuration loading from the Lambda environment.
//!
//! Each handler reads its own variables. Every missing required variable is
//! reported at once in a single [`AppError::Configuration`].
//!
//! Loaders take a lookup function so they can be driven from a map in tests;
//! the `*_from_env` wrappers read the process environment.

use std::collections::BTreeMap;
use std::str::FromStr;

use tracing::info;

use crate::error::{AppError, Result};
use crate::models::{BackfillConfig, FeedbackConfig, OnRequestConfig, SearchConfig};
use crate::models::config::defaults;

/// Collects variables and remembers which required ones are missing.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<&'static str>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&mut self, name: &'static str) -> String {
        self.optional(name).unwrap_or_else(|| {
            self.missing.push(name);
            String::new()
        })
    }

    fn parsed<T: FromStr>(&self, name: &str, value: Option<String>, default: T) -> Result<T> {
        match value {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::config(format!("{name} has an invalid value: {raw}"))),
        }
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool> {
        match self.optional(name).map(|v| v.to_ascii_lowercase()).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes") => Ok(true),
            Some("0" | "false" | "no") => Ok(false),
            Some(other) => Err(AppError::config(format!(
                "{name} has an invalid value: {other}"
            ))),
        }
    }

    fn finish(self) -> Result<()> {
        if self.missing.is_empty() {
            return Ok(());
        }
        Err(AppError::config(format!(
            "Missing required environment variables: {}",
            self.missing.join(", ")
        )))
    }
}

fn search_config<F>(env: &mut EnvReader<F>, index_var: &'static str) -> SearchConfig
where
    F: Fn(&str) -> Option<String>,
{
    SearchConfig {
        host: env.required("ELASTICSEARCH_HOST"),
        index: env.required(index_var),
        region: env.optional("AWS_REGION").unwrap_or_else(defaults::region),
        access_rights_index: env.optional("ACCESS_RIGHTS_INDEX"),
        headers: env
            .optional("ELASTICSEARCH_AUTHORIZATION")
            .map(|value| BTreeMap::from([("Authorization".to_string(), value)]))
            .unwrap_or_default(),
        ..SearchConfig::default()
    }
}

/// Settings of the on-request transcription handler.
pub fn load_on_request(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(SearchConfig, OnRequestConfig)> {
    let mut env = EnvReader::new(lookup);

    let search = search_config(&mut env, "ELASTICSEARCH_INDEX");
    let status_table = env.required("TRANSCRIBE_ON_REQUEST_STATUS_TABLE");
    let days_raw = env.required("DAYS_TO_EXPIRE");
    let audio_source_bucket = env.required("AUDIO_SOURCE_BUCKET");
    let audio_source_prefix = env.required("AUDIO_SOURCE_PREFIX");
    let sqs_queue_url = env.required("SQS_QUEUE_URL");
    let permission_groups_table = env.required("PERMISSION_GROUPS_TABLE");
    let sanitize_errors = env.flag("SANITIZE_ERRORS", defaults::sanitize())?;

    let days_to_expire = env.parsed(
        "DAYS_TO_EXPIRE",
        Some(days_raw).filter(|v| !v.is_empty()),
        defaults::days_to_expire(),
    )?;
    env.finish()?;

    let config = OnRequestConfig {
        status_table,
        days_to_expire,
        audio_source_bucket,
        audio_source_prefix,
        sqs_queue_url,
        permission_groups_table,
        sanitize_errors,
    };
    search.validate()?;
    config.validate()?;

    info!(
        "On-request config loaded (index: {}, table: {}, expiry: {} days)",
        search.index, config.status_table, config.days_to_expire
    );
    Ok((search, config))
}

/// Settings of the feedback handler.
pub fn load_feedback(lookup: impl Fn(&str) -> Option<String>) -> Result<FeedbackConfig> {
    let mut env = EnvReader::new(lookup);

    let bucket = env.required("BUCKET_NAME");
    let feedback_prefix = env.optional("FEEDBACK_PREFIX").unwrap_or_default();
    let question_prefix = env.optional("QUESTION_PREFIX").unwrap_or_default();
    env.finish()?;

    Ok(FeedbackConfig {
        bucket,
        feedback_prefix,
        question_prefix,
    })
}

/// Settings of the `queue_id` backfill handler.
pub fn load_backfill(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(SearchConfig, BackfillConfig)> {
    let mut env = EnvReader::new(lookup);

    let search = search_config(&mut env, "ELASTICSEARCH_CALL_DETAILS_INDEX");
    let metadata_bucket = env.required("AUDIO_METADATA_BUCKET");
    let purpose = env.required("PURPOSE");
    let extra_metadata_prefix = env.required("EXTRA_METADATA_PREFIX");
    let number_of_days = env.parsed(
        "NUMBER_OF_DAYS",
        env.optional("NUMBER_OF_DAYS"),
        defaults::number_of_days(),
    )?;
    env.finish()?;

    let config = BackfillConfig {
        call_details_index: search.index.clone(),
        metadata_bucket,
        purpose,
        extra_metadata_prefix,
        number_of_days,
    };
    Ok((search, config))
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

pub fn on_request_from_env() -> Result<(SearchConfig, OnRequestConfig)> {
    load_on_request(process_env)
}

pub fn feedback_from_env() -> Result<FeedbackConfig> {
    load_feedback(process_env)
}

pub fn backfill_from_env() -> Result<(SearchConfig, BackfillConfig)> {
    load_backfill(process_env)
}
