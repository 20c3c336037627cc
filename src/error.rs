//! Error types for the dochub-verify library.
//!
//! Three distinct error types reflect three distinct failure modes:
//!
//! * [`VerifyError`]: **Fatal**: the operation cannot proceed at all
//!   (empty batch, unreadable file, bad configuration). Returned as
//!   `Err(VerifyError)` from the batch, loader and submission entry points.
//!
//! * [`Rejection`]: **Non-fatal**: a single file failed local validation
//!   (too large, wrong type). Collected in [`crate::batch::AddReport`] while
//!   the remaining files are still staged.
//!
//! * [`FailureReason`]: **Terminal for one submission**: the request ran but
//!   did not produce results (timeout, transport failure, non-2xx, unreadable
//!   body). Stored inside [`crate::output::VerificationOutcome::Failure`] so
//!   hosts render it like any other outcome.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the dochub-verify library.
#[derive(Debug, Error)]
pub enum VerifyError {
    // ── Batch errors ──────────────────────────────────────────────────────
    /// Submit was called with no staged documents; no request was issued.
    #[error("No documents staged for verification.\nAdd at least one file before submitting.")]
    EmptyBatch,

    /// A submission is already running for this verifier.
    #[error("A verification request is already in progress")]
    SubmitInProgress,

    /// `remove` was given a position past the end of the batch.
    #[error("Document index {index} is out of range (batch has {len} documents)")]
    IndexOutOfRange { index: usize, len: usize },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input string is not a usable file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// A staged document carries a MIME type the multipart encoder rejects.
    #[error("Document '{name}' has an invalid MIME type '{mime}'")]
    InvalidMimeType { name: String, mime: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a file was refused by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// File is larger than the configured ceiling.
    #[error("file is {size} bytes, limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },

    /// File MIME type is not in the allowed set.
    #[error("unsupported file type '{mime}'")]
    UnsupportedType { mime: String },
}

/// A non-fatal, per-file validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{file_name}: {reason}")]
pub struct Rejection {
    pub file_name: String,
    pub reason: RejectReason,
}

/// Why a submission ended without results.
///
/// `Display` yields the short message shown to the user; the variant fields
/// carry detail for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The deadline elapsed and the request was cancelled.
    #[error("timeout")]
    Timeout { secs: u64 },

    /// Connection refused, DNS failure, reset mid-body, etc.
    #[error("network error")]
    Network { detail: String },

    /// The service answered with a non-2xx status.
    #[error("server error")]
    Server { status: u16 },

    /// The body did not match any expected response shape.
    #[error("verification failed")]
    MalformedResponse { detail: String },
}
