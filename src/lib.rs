//! # dochub-verify
//!
//! Stage identity documents (images or PDFs), send them to a document
//! extraction service, and get back the name, surname and date of birth it
//! read from each one, with a confidence score per field.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files / URLs
//!  │
//!  ├─ 1. Input      read local files or download URLs, sniff the MIME type
//!  ├─ 2. Validate   per-file size and type checks; rejects are reported, not fatal
//!  ├─ 3. Batch      ordered staging area with one preview handle per file
//!  ├─ 4. Submit     one multipart POST under a deadline
//!  ├─ 5. Normalize  any of three response shapes → VerificationOutcome
//!  └─ 6. Workflow   Idle → Submitting → Succeeded | Failed | Empty
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dochub_verify::{load_document, Verifier, VerifierConfig, VerificationOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Endpoint from DOCHUB_ENDPOINT, else http://localhost:8000/analyze-images
//!     let config = VerifierConfig::from_env()?;
//!     let mut verifier = Verifier::new(&config)?;
//!
//!     let report = verifier.add([load_document("passport.jpg", 120).await?]);
//!     for r in &report.rejections {
//!         eprintln!("skipped {r}");
//!     }
//!
//!     match verifier.submit().await? {
//!         VerificationOutcome::Results(records) => {
//!             for r in records {
//!                 println!("{} {} ({})", r.name(), r.surname(), r.date_of_birth());
//!             }
//!         }
//!         VerificationOutcome::AnalysisMessage(m) => eprintln!("{m}"),
//!         VerificationOutcome::Failure(reason) => eprintln!("{reason}"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `dochub` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! dochub-verify = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod prompts;
pub mod verifier;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{AddReport, UploadBatch, UploadedDocument};
pub use config::{FileLimits, VerifierConfig, VerifierConfigBuilder};
pub use document::Document;
pub use error::{FailureReason, RejectReason, Rejection, VerifyError};
pub use output::{Field, VerificationOutcome, VerificationResult};
pub use pipeline::input::{load_document, load_documents};
pub use pipeline::submit::SubmissionController;
pub use preview::PreviewHandle;
pub use progress::{NoopProgressCallback, ProgressCallback, SubmissionProgressCallback};
pub use verifier::{PendingSubmission, Verifier};
pub use workflow::{Phase, Ticket, WorkflowEvent, WorkflowState};
