//! Response normalisation: service JSON → ordered [`VerificationResult`]s.
//!
//! The extraction service has answered in three shapes over its lifetime:
//! a single record object, an array of records (one per document), and an
//! `{ "error": "…" }` envelope when it declines to extract. All three are
//! decoded once, here, into [`ServiceResponse`]; nothing downstream inspects
//! raw JSON.
//!
//! Records are not validated. A record missing `name` still yields a
//! [`VerificationResult`] with an empty name, and the display decides how to
//! flag it (see [`VerificationResult::is_unknown`]).

use crate::output::{VerificationOutcome, VerificationResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A JSON object as sent by the service.
pub type RawRecord = Map<String, Value>;

/// Every response shape the service produces.
///
/// Variant order matters for the untagged decode: an object with a string
/// `error` field is an envelope even if it also carries record keys.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServiceResponse {
    Error { error: String },
    Many(Vec<RawRecord>),
    One(RawRecord),
}

/// Options controlling how records are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Accept `lastname` for `surname` and `dob` for `date_of_birth`.
    pub legacy_aliases: bool,
}

/// Error produced when the body matches none of the [`ServiceResponse`] shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected response body: {0}")]
pub struct MalformedBody(pub String);

static RE_JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?\s*\n?(.*?)\s*```\s*$").unwrap());

/// Decode a response body.
///
/// Model-backed services sometimes wrap their JSON in a Markdown code fence;
/// if the body does not parse as-is, one outer fence is stripped and the
/// decode retried.
pub fn decode(body: &str) -> Result<ServiceResponse, MalformedBody> {
    match serde_json::from_str::<ServiceResponse>(body) {
        Ok(resp) => Ok(resp),
        Err(first) => {
            if let Some(caps) = RE_JSON_FENCE.captures(body.trim()) {
                return serde_json::from_str::<ServiceResponse>(&caps[1])
                    .map_err(|e| MalformedBody(e.to_string()));
            }
            Err(MalformedBody(first.to_string()))
        }
    }
}

/// Map a decoded response to the display model.
pub fn to_outcome(response: ServiceResponse, options: NormalizeOptions) -> VerificationOutcome {
    match response {
        ServiceResponse::Error { error } => VerificationOutcome::AnalysisMessage(error),
        ServiceResponse::One(record) => {
            VerificationOutcome::Results(vec![normalize_record(&record, options)])
        }
        ServiceResponse::Many(records) => VerificationOutcome::Results(
            records
                .iter()
                .map(|r| normalize_record(r, options))
                .collect(),
        ),
    }
}

/// Map one raw record, defaulting absent confidences to `0.0`.
pub fn normalize_record(record: &RawRecord, options: NormalizeOptions) -> VerificationResult {
    let pick = |canonical: &str, alias: &str| -> Option<&Value> {
        record
            .get(canonical)
            .or_else(|| options.legacy_aliases.then(|| record.get(alias)).flatten())
    };

    VerificationResult {
        name: text(record.get("name")),
        surname: text(pick("surname", "lastname")),
        date_of_birth: text(pick("date_of_birth", "dob")),
        name_confidence: confidence(record.get("name_confidence")),
        surname_confidence: confidence(pick("surname_confidence", "lastname_confidence")),
        date_of_birth_confidence: confidence(pick("date_of_birth_confidence", "dob_confidence")),
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn confidence(value: Option<&Value>) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}
