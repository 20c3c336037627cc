//! Display model produced by a verification run.
//!
//! [`VerificationOutcome`] is what a host renders after a submission: one of
//! a list of extracted records, an analysis message the service returned in
//! place of records, or a failure. The three are mutually exclusive, which
//! the enum makes impossible to get wrong.

use crate::error::FailureReason;
use serde::{Deserialize, Serialize};

/// One identity record extracted from the submitted documents.
///
/// Built only by [`crate::pipeline::normalize`]. Fields are read through
/// accessors; outside this crate a record cannot be constructed or changed.
///
/// ```compile_fail
/// let r = dochub_verify::VerificationResult {
///     name: "A".into(),
///     surname: "B".into(),
///     date_of_birth: "1990-01-01".into(),
///     name_confidence: 1.0,
///     surname_confidence: 1.0,
///     date_of_birth_confidence: 1.0,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(test, derive(Default))]
pub struct VerificationResult {
    pub(crate) name: String,
    pub(crate) surname: String,
    pub(crate) date_of_birth: String,
    /// Extraction certainty in `0.0..=1.0`; `0.0` when the service omitted it.
    pub(crate) name_confidence: f64,
    pub(crate) surname_confidence: f64,
    pub(crate) date_of_birth_confidence: f64,
}

/// The three identity fields a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Surname,
    DateOfBirth,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Surname, Field::DateOfBirth];

    /// Human label, as shown next to the value.
    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "First Name",
            Field::Surname => "Last Name",
            Field::DateOfBirth => "Date of Birth",
        }
    }
}

impl VerificationResult {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn surname(&self) -> &str {
        &self.surname
    }

    pub fn date_of_birth(&self) -> &str {
        &self.date_of_birth
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Surname => &self.surname,
            Field::DateOfBirth => &self.date_of_birth,
        }
    }

    pub fn confidence(&self, field: Field) -> f64 {
        match field {
            Field::Name => self.name_confidence,
            Field::Surname => self.surname_confidence,
            Field::DateOfBirth => self.date_of_birth_confidence,
        }
    }

    /// True when the service could not determine the field.
    ///
    /// The extraction service writes `"unknown"` for fields it cannot read;
    /// an empty value means the field was missing from the response.
    pub fn is_unknown(&self, field: Field) -> bool {
        let v = self.value(field).trim();
        v.is_empty() || v.eq_ignore_ascii_case("unknown")
    }

    /// Fields that a display should flag.
    pub fn unknown_fields(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| self.is_unknown(*f))
            .collect()
    }
}

/// Result of the most recent submission attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// Records in response order; may be empty.
    Results(Vec<VerificationResult>),
    /// The service answered with a body-level `error` message.
    AnalysisMessage(String),
    /// The request did not complete successfully.
    Failure(FailureReason),
}

impl VerificationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, VerificationOutcome::Failure(_))
    }

    pub fn results(&self) -> Option<&[VerificationResult]> {
        match self {
            VerificationOutcome::Results(r) => Some(r),
            _ => None,
        }
    }

    /// Single human-readable message for the non-results variants.
    pub fn message(&self) -> Option<String> {
        match self {
            VerificationOutcome::Results(_) => None,
            VerificationOutcome::AnalysisMessage(m) => Some(m.clone()),
            VerificationOutcome::Failure(reason) => Some(reason.to_string()),
        }
    }
}
