//! Call record as indexed by the ingestion system, and the outbound
//! transcription event built from it.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::Result;

/// Metadata of a recorded call, as stored in the search index.
///
/// Unknown index fields are ignored when deserializing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallMetadata {
    /// Document identifier of the call in the search index
    #[serde(default)]
    pub sid: Option<String>,

    pub original_contact_id: String,
    #[serde(deserialize_with = "lax_integer")]
    pub duration: i64,
    #[serde(deserialize_with = "lax_integer")]
    pub total_hold_time: i64,
    pub start_datetime: String,
    pub end_datetime: String,
    pub agent_pbxid: String,
    pub extension: String,
    pub agent_full_name: String,
    pub agent_email: String,
    pub language: String,
    pub region: String,
    pub distributor_number: String,
    pub call_context: String,
    pub line_of_business: String,

    #[serde(default)]
    pub video_recorded: bool,

    pub customer_phone_number: String,
    pub call_direction: String,
    pub organization_unit: String,

    /// Empty until the backfill job assigns it (internal calls)
    #[serde(default = "empty_queue_id")]
    pub queue_id: Option<String>,

    pub company_number: String,

    /// `s3://` location of the call audio, derived from `filename_prefix`
    #[serde(default)]
    pub wav_url: Option<String>,

    pub filename_prefix: String,
    pub created_at_: String,
}

fn empty_queue_id() -> Option<String> {
    Some(String::new())
}

/// Integer fields are not always indexed as integers: accept whole-number
/// floats (`600.0`) and numeric strings (`"600"`) too.
fn lax_integer<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let integer = match &value {
        Value::Number(number) => whole_number(number),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<Number>()
                    .ok()
                    .and_then(|number| whole_number(&number))
            })
        }
        _ => None,
    };
    integer.ok_or_else(|| D::Error::custom(format!("invalid integer: {value}")))
}

fn whole_number(number: &Number) -> Option<i64> {
    number.as_i64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

impl CallMetadata {
    /// Index fields requested from `_source` when fetching call metadata.
    ///
    /// `sid` and `wav_url` are derived, not stored.
    pub const SOURCE_FIELDS: &'static [&'static str] = &[
        "original_contact_id",
        "duration",
        "total_hold_time",
        "start_datetime",
        "end_datetime",
        "agent_pbxid",
        "extension",
        "agent_full_name",
        "agent_email",
        "language",
        "region",
        "distributor_number",
        "call_context",
        "line_of_business",
        "video_recorded",
        "customer_phone_number",
        "call_direction",
        "organization_unit",
        "queue_id",
        "company_number",
        "filename_prefix",
        "created_at_",
    ];
}

/// Build the audio location of a call.
pub fn wav_url(bucket: &str, prefix: &str, filename_prefix: &str) -> String {
    format!("s3://{}/{}/{}.wav", bucket, prefix, filename_prefix)
}

/// One transcription request for one call, sent to the work queue.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OnRequestEvent {
    pub on_request_job_id: Option<String>,
    pub on_request_job_user: String,

    #[serde(flatten)]
    pub call_metadata: CallMetadata,
}

/// Queue message envelope: consumers read `Records[0]`.
#[derive(Serialize)]
struct QueueEnvelope<'a> {
    #[serde(rename = "Records")]
    records: [&'a OnRequestEvent; 1],
}

impl OnRequestEvent {
    pub fn new(job_id: &str, user_email: &str, call_metadata: CallMetadata) -> Self {
        Self {
            on_request_job_id: Some(job_id.to_string()),
            on_request_job_user: user_email.to_string(),
            call_metadata,
        }
    }

    /// Serialize into the queue message body.
    pub fn to_queue_message(&self) -> Result<String> {
        let envelope = QueueEnvelope { records: [self] };
        Ok(serde_json::to_string(&envelope)?)
    }
}
