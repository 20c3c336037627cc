//! Progress-callback trait for submission events.
//!
//! Inject an [`Arc<dyn SubmissionProgressCallback>`] via
//! [`crate::config::VerifierConfigBuilder::progress_callback`] to hear when a
//! request leaves and when its outcome is known. The CLI uses this to drive a
//! spinner; a UI host would toggle its "Verifying…" button state.
//!
//! # Example
//!
//! ```rust
//! use dochub_verify::{SubmissionProgressCallback, VerifierConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     started: AtomicUsize,
//! }
//!
//! impl SubmissionProgressCallback for CountingCallback {
//!     fn on_submit_start(&self, documents: usize, total_bytes: u64) {
//!         self.started.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("sending {documents} files ({total_bytes} bytes)");
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { started: AtomicUsize::new(0) });
//!
//! let config = VerifierConfig::builder()
//!     .progress_callback(cb as Arc<dyn SubmissionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::VerificationOutcome;
use std::sync::Arc;
use std::time::Duration;

/// Called by the submission controller around each request.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because a
/// [`crate::verifier::PendingSubmission`] may run on another task.
pub trait SubmissionProgressCallback: Send + Sync {
    /// Called just before the request is sent.
    ///
    /// # Arguments
    /// * `documents`  : number of files in the form
    /// * `total_bytes`: sum of file sizes
    fn on_submit_start(&self, documents: usize, total_bytes: u64) {
        let _ = (documents, total_bytes);
    }

    /// Called once the outcome is classified, including on timeout.
    fn on_submit_complete(&self, outcome: &VerificationOutcome, elapsed: Duration) {
        let _ = (outcome, elapsed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SubmissionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::VerifierConfig`].
pub type ProgressCallback = Arc<dyn SubmissionProgressCallback>;
