//! Workflow state machine for the verify screen.
//!
//! ```text
//!            BatchChanged                     SubmitFinished
//!   ┌──────────────────────────┐        ┌────────────────────▶ Succeeded
//!   ▼                          │        │
//! Idle ──SubmitStarted──▶ Submitting ───┼────────────────────▶ Failed
//!   ▲                                   │
//!   │                                   └────────────────────▶ Empty
//!   └──────────── BatchChanged (from any state) ─────────────────┘
//! ```
//!
//! [`WorkflowState::reduce`] is a pure function: it never mutates `self` and
//! returns the next snapshot. Each submission gets a [`Ticket`]; a finish
//! event carrying any ticket other than the one currently in flight is
//! ignored, so a response that arrives after the batch changed cannot
//! overwrite the cleared outcome. A submission dropped before it finished
//! is closed with `SubmitAbandoned`, which returns to `Idle`.

use crate::output::VerificationOutcome;
use serde::Serialize;

/// Identifies one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Ticket(u64);

/// Where the workflow is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    /// At least one record came back.
    Succeeded,
    /// Failure, or the service returned an analysis message instead of records.
    Failed,
    /// The service answered with zero records.
    Empty,
}

/// Input to the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A document was added, removed, or the batch cleared.
    BatchChanged,
    /// A request is about to be sent for a non-empty batch.
    SubmitStarted,
    /// A request finished (or was cancelled by its deadline).
    SubmitFinished {
        ticket: Ticket,
        outcome: VerificationOutcome,
    },
    /// The request for `ticket` was dropped before it produced an outcome.
    SubmitAbandoned { ticket: Ticket },
}

/// Immutable snapshot of the workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowState {
    phase: Phase,
    outcome: Option<VerificationOutcome>,
    in_flight: Option<Ticket>,
    issued: u64,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Outcome of the latest completed submission, cleared by batch changes.
    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        self.outcome.as_ref()
    }

    /// Ticket of the submission in flight, if any.
    pub fn in_flight(&self) -> Option<Ticket> {
        self.in_flight
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    /// Compute the next state.
    ///
    /// `SubmitStarted` while already submitting returns an unchanged copy;
    /// callers detect that through [`WorkflowState::in_flight`].
    pub fn reduce(&self, event: WorkflowEvent) -> WorkflowState {
        match event {
            WorkflowEvent::BatchChanged => WorkflowState {
                phase: Phase::Idle,
                outcome: None,
                in_flight: None,
                issued: self.issued,
            },
            WorkflowEvent::SubmitStarted => {
                if self.is_submitting() {
                    return self.clone();
                }
                let issued = self.issued + 1;
                WorkflowState {
                    phase: Phase::Submitting,
                    outcome: None,
                    in_flight: Some(Ticket(issued)),
                    issued,
                }
            }
            WorkflowEvent::SubmitFinished { ticket, outcome } => {
                if self.in_flight != Some(ticket) {
                    return self.clone();
                }
                WorkflowState {
                    phase: phase_for(&outcome),
                    outcome: Some(outcome),
                    in_flight: None,
                    issued: self.issued,
                }
            }
            WorkflowEvent::SubmitAbandoned { ticket } => {
                if self.in_flight != Some(ticket) {
                    return self.clone();
                }
                WorkflowState {
                    phase: Phase::Idle,
                    outcome: None,
                    in_flight: None,
                    issued: self.issued,
                }
            }
        }
    }
}

fn phase_for(outcome: &VerificationOutcome) -> Phase {
    match outcome {
        VerificationOutcome::Results(r) if r.is_empty() => Phase::Empty,
        VerificationOutcome::Results(_) => Phase::Succeeded,
        VerificationOutcome::AnalysisMessage(_) | VerificationOutcome::Failure(_) => Phase::Failed,
    }
}
