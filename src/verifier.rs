//! The verifier: batch, submission and workflow state behind one API.
//!
//! A host (a UI, or the `dochub` CLI) keeps one [`Verifier`] and calls
//! [`add`](Verifier::add), [`remove`](Verifier::remove) and
//! [`submit`](Verifier::submit) in response to user gestures. Submitting
//! never touches the batch; changing the batch clears the last outcome.
//!
//! Hosts that must not hold `&mut Verifier` across the request (an event
//! loop that keeps handling input while a request runs) use the split form:
//!
//! ```rust,no_run
//! # use dochub_verify::{Verifier, VerifierConfig};
//! # async fn run(mut verifier: Verifier) -> Result<(), dochub_verify::VerifyError> {
//! let pending = verifier.begin_submit()?;
//! let handle = tokio::spawn(pending.run());
//! // ... the user may add or remove files meanwhile ...
//! let (ticket, outcome) = handle.await.expect("task panicked");
//! let applied = verifier.complete_submit(ticket, outcome);
//! # let _ = applied;
//! # Ok(())
//! # }
//! ```
//!
//! Every ticket from `begin_submit` must be closed with either
//! [`complete_submit`](Verifier::complete_submit) or
//! [`abandon_submit`](Verifier::abandon_submit); until then the verifier
//! stays `Submitting`. [`submit`](Verifier::submit) does this itself, also
//! when its future is dropped before the request finishes.

use crate::batch::{AddReport, UploadBatch};
use crate::config::VerifierConfig;
use crate::document::Document;
use crate::error::VerifyError;
use crate::output::VerificationOutcome;
use crate::pipeline::input;
use crate::pipeline::submit::{PreparedRequest, SubmissionController};
use crate::workflow::{Phase, Ticket, WorkflowEvent, WorkflowState};
use tracing::debug;

/// Stateful façade over the upload batch and submission workflow.
#[derive(Debug)]
pub struct Verifier {
    batch: UploadBatch,
    controller: SubmissionController,
    state: WorkflowState,
    download_timeout_secs: u64,
}

/// A submission that has been started but not yet run.
///
/// Owns the encoded batch snapshot, so it is `'static` and can be moved to
/// another task. Dropping it does not notify the verifier: pass its ticket to
/// [`Verifier::abandon_submit`].
#[derive(Debug)]
pub struct PendingSubmission {
    ticket: Ticket,
    request: PreparedRequest,
    controller: SubmissionController,
}

impl PendingSubmission {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Number of documents in the request.
    pub fn documents(&self) -> usize {
        self.request.documents()
    }

    /// Issue the request. Request failures are part of the outcome.
    pub async fn run(self) -> (Ticket, VerificationOutcome) {
        let outcome = self.controller.send(self.request).await;
        (self.ticket, outcome)
    }
}

impl Verifier {
    pub fn new(config: &VerifierConfig) -> Result<Self, VerifyError> {
        Ok(Self {
            batch: UploadBatch::new(config.limits.clone()),
            controller: SubmissionController::new(config)?,
            state: WorkflowState::new(),
            download_timeout_secs: config.download_timeout_secs,
        })
    }

    /// Read local paths and download URLs with the configured download
    /// timeout. One result per input, in input order; nothing is staged.
    pub async fn load_documents<S: AsRef<str>>(
        &self,
        inputs: &[S],
    ) -> Vec<Result<Document, VerifyError>> {
        input::load_documents(inputs, self.download_timeout_secs).await
    }

    /// Stage files. Clears the last outcome if at least one was accepted.
    pub fn add<I>(&mut self, files: I) -> AddReport
    where
        I: IntoIterator<Item = Document>,
    {
        let report = self.batch.add(files);
        if report.accepted > 0 {
            self.apply(WorkflowEvent::BatchChanged);
        }
        report
    }

    /// Unstage the document at `index` and release its preview.
    pub fn remove(&mut self, index: usize) -> Result<Document, VerifyError> {
        let doc = self.batch.remove(index)?;
        self.apply(WorkflowEvent::BatchChanged);
        Ok(doc)
    }

    /// Unstage everything.
    pub fn clear(&mut self) {
        let had_documents = !self.batch.is_empty();
        self.batch.clear();
        if had_documents {
            self.apply(WorkflowEvent::BatchChanged);
        }
    }

    /// Submit the batch and wait for the outcome.
    ///
    /// # Errors
    /// [`VerifyError::EmptyBatch`] if nothing is staged (no request is made).
    ///
    /// If the returned future is dropped before the request finishes, the
    /// submission is abandoned and the verifier goes back to `Idle`.
    pub async fn submit(&mut self) -> Result<VerificationOutcome, VerifyError> {
        let pending = self.begin_submit()?;
        let mut guard = AbandonOnDrop {
            verifier: self,
            ticket: Some(pending.ticket()),
        };
        let (ticket, outcome) = pending.run().await;
        guard.ticket = None;
        guard.verifier.complete_submit(ticket, outcome.clone());
        Ok(outcome)
    }

    /// Move to `Submitting` and return the request to run.
    ///
    /// # Errors
    /// [`VerifyError::EmptyBatch`] if nothing is staged;
    /// [`VerifyError::SubmitInProgress`] if a submission is in flight.
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, VerifyError> {
        if self.batch.is_empty() {
            return Err(VerifyError::EmptyBatch);
        }
        if self.state.is_submitting() {
            return Err(VerifyError::SubmitInProgress);
        }
        let request = self.controller.prepare(&self.batch.snapshot())?;
        self.apply(WorkflowEvent::SubmitStarted);
        let ticket = self
            .state
            .in_flight()
            .ok_or_else(|| VerifyError::Internal("submission started without a ticket".into()))?;

        Ok(PendingSubmission {
            ticket,
            request,
            controller: self.controller.clone(),
        })
    }

    /// Record the outcome of a submission.
    ///
    /// Returns `false` when the ticket is stale (the batch changed after the
    /// request started) and the outcome was dropped.
    pub fn complete_submit(&mut self, ticket: Ticket, outcome: VerificationOutcome) -> bool {
        let current = self.state.in_flight() == Some(ticket);
        if !current {
            debug!("Discarding outcome for stale submission {:?}", ticket);
        }
        self.apply(WorkflowEvent::SubmitFinished { ticket, outcome });
        current
    }

    /// Close a submission that will never complete, e.g. a dropped
    /// [`PendingSubmission`]. Returns `false` when the ticket is not the one
    /// in flight.
    pub fn abandon_submit(&mut self, ticket: Ticket) -> bool {
        let current = self.state.in_flight() == Some(ticket);
        if current {
            debug!("Abandoning submission {:?}", ticket);
        }
        self.apply(WorkflowEvent::SubmitAbandoned { ticket });
        current
    }

    pub fn batch(&self) -> &UploadBatch {
        &self.batch
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        self.state.outcome()
    }

    fn apply(&mut self, event: WorkflowEvent) {
        let next = self.state.reduce(event);
        if next.phase() != self.state.phase() {
            debug!("Workflow {:?} → {:?}", self.state.phase(), next.phase());
        }
        self.state = next;
    }
}

/// Abandons the armed ticket if [`Verifier::submit`] is dropped mid-await.
struct AbandonOnDrop<'a> {
    verifier: &'a mut Verifier,
    ticket: Option<Ticket>,
}

impl Drop for AbandonOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.verifier.abandon_submit(ticket);
        }
    }
}
