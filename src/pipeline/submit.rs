//! Submission: one multipart request to the extraction service.
//!
//! This is the only stage with network I/O. Every document goes out in a
//! single `POST` as a repeated `files` field, alongside a `prompt` field.
//! The whole exchange (connect, upload, response body) runs under one
//! deadline; when it fires the request future is dropped, which aborts the
//! connection, and the outcome is [`FailureReason::Timeout`].
//!
//! There is no retry. Whatever happens is classified into exactly one
//! [`VerificationOutcome`] and handed back.

use crate::config::VerifierConfig;
use crate::document::Document;
use crate::error::{FailureReason, VerifyError};
use crate::output::VerificationOutcome;
use crate::pipeline::normalize::{self, NormalizeOptions};
use crate::progress::ProgressCallback;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Url};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Multipart field carrying each file.
pub const FILES_FIELD: &str = "files";

/// Multipart field carrying the extraction prompt.
pub const PROMPT_FIELD: &str = "prompt";

/// A multipart form ready to send, built by [`SubmissionController::prepare`].
pub struct PreparedRequest {
    form: Form,
    documents: usize,
    total_bytes: u64,
}

impl PreparedRequest {
    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

impl std::fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRequest")
            .field("documents", &self.documents)
            .field("total_bytes", &self.total_bytes)
            .finish()
    }
}

/// Issues verification requests. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone)]
pub struct SubmissionController {
    client: Client,
    endpoint: Url,
    timeout: Duration,
    prompt: String,
    options: NormalizeOptions,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for SubmissionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionController")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout", &self.timeout)
            .field("options", &self.options)
            .finish()
    }
}

impl SubmissionController {
    pub fn new(config: &VerifierConfig) -> Result<Self, VerifyError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            VerifyError::InvalidConfig(format!("endpoint '{}': {}", config.endpoint, e))
        })?;
        let client = Client::builder()
            .build()
            .map_err(|e| VerifyError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            timeout: config.timeout,
            prompt: config.prompt.clone(),
            options: NormalizeOptions {
                legacy_aliases: config.legacy_aliases,
            },
            progress: config.progress_callback.clone(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `documents` and classify the result.
    ///
    /// # Errors
    /// See [`SubmissionController::prepare`]. Request-time failures are not
    /// errors: they come back as [`VerificationOutcome::Failure`].
    pub async fn submit(&self, documents: &[Document]) -> Result<VerificationOutcome, VerifyError> {
        let request = self.prepare(documents)?;
        Ok(self.send(request).await)
    }

    /// Build the request for `documents` without sending it.
    ///
    /// # Errors
    /// [`VerifyError::EmptyBatch`] when `documents` is empty;
    /// [`VerifyError::InvalidMimeType`] if a part cannot be labelled.
    pub fn prepare(&self, documents: &[Document]) -> Result<PreparedRequest, VerifyError> {
        if documents.is_empty() {
            return Err(VerifyError::EmptyBatch);
        }
        Ok(PreparedRequest {
            form: build_form(documents, &self.prompt)?,
            documents: documents.len(),
            total_bytes: documents.iter().map(Document::size).sum(),
        })
    }

    /// Issue a prepared request under the deadline.
    pub async fn send(&self, request: PreparedRequest) -> VerificationOutcome {
        let PreparedRequest {
            form,
            documents,
            total_bytes,
        } = request;

        info!(
            "Submitting {} documents ({} bytes) to {}",
            documents, total_bytes, self.endpoint
        );
        if let Some(ref cb) = self.progress {
            cb.on_submit_start(documents, total_bytes);
        }

        let start = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, self.exchange(form)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    "Verification request cancelled after {}ms (deadline {}s)",
                    start.elapsed().as_millis(),
                    self.timeout.as_secs()
                );
                VerificationOutcome::Failure(FailureReason::Timeout {
                    secs: self.timeout.as_secs(),
                })
            }
        };
        let elapsed = start.elapsed();

        match &outcome {
            VerificationOutcome::Results(r) => {
                info!("Verification returned {} records in {:?}", r.len(), elapsed)
            }
            VerificationOutcome::AnalysisMessage(m) => {
                info!("Verification returned analysis message: {}", m)
            }
            VerificationOutcome::Failure(reason) => warn!("Verification failed: {:?}", reason),
        }

        if let Some(ref cb) = self.progress {
            cb.on_submit_complete(&outcome, elapsed);
        }
        outcome
    }

    /// Send the form and read the body. Runs inside the deadline.
    async fn exchange(&self, form: Form) -> VerificationOutcome {
        let response = match self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return VerificationOutcome::Failure(classify_transport(e, self.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Extraction service answered HTTP {}", status);
            return VerificationOutcome::Failure(FailureReason::Server {
                status: status.as_u16(),
            });
        }

        let body = match response.text().await {
            Ok(b) => b,
            Err(e) => return VerificationOutcome::Failure(classify_transport(e, self.timeout)),
        };
        debug!("Response body: {} bytes", body.len());

        match normalize::decode(&body) {
            Ok(decoded) => normalize::to_outcome(decoded, self.options),
            Err(e) => {
                warn!("Could not decode verification response: {}", e);
                VerificationOutcome::Failure(FailureReason::MalformedResponse {
                    detail: e.to_string(),
                })
            }
        }
    }
}

/// Build the multipart form: one `files` part per document, then `prompt`.
pub fn build_form(documents: &[Document], prompt: &str) -> Result<Form, VerifyError> {
    let mut form = Form::new();
    for doc in documents {
        let part = Part::stream_with_length(Body::from(doc.data().clone()), doc.size())
            .file_name(doc.name().to_string())
            .mime_str(doc.mime_type())
            .map_err(|_| VerifyError::InvalidMimeType {
                name: doc.name().to_string(),
                mime: doc.mime_type().to_string(),
            })?;
        form = form.part(FILES_FIELD, part);
    }
    Ok(form.text(PROMPT_FIELD, prompt.to_string()))
}

fn classify_transport(e: reqwest::Error, timeout: Duration) -> FailureReason {
    if e.is_timeout() {
        FailureReason::Timeout {
            secs: timeout.as_secs(),
        }
    } else {
        FailureReason::Network {
            detail: e.to_string(),
        }
    }
}
