//! Outcome taxonomy for skill provisioning.

use thiserror::Error;

use crate::types::FunctionRecord;

/// Remote step of the provisioning workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    NluRegistration,
    ArchiveBuild,
    FunctionRegistration,
}

impl SagaStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NluRegistration => "nlu_registration",
            Self::ArchiveBuild => "archive_build",
            Self::FunctionRegistration => "function_registration",
        }
    }
}

impl std::fmt::Display for SagaStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a remote step failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepFailure {
    /// No HTTP response was received.
    #[error("request failed: {0}")]
    Transport(String),
    /// The service answered with an unexpected status.
    #[error("unexpected status {status}: {body}")]
    Rejected { status: u16, body: String },
    /// The service answered with the expected status but an unusable body.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl StepFailure {
    /// Downstream status and body, when the service rejected the call.
    pub fn downstream(&self) -> Option<(u16, &str)> {
        match self {
            Self::Rejected { status, body } => Some((*status, body.as_str())),
            Self::Transport(_) | Self::InvalidResponse(_) => None,
        }
    }
}

/// Result of undoing the NLU registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    Completed,
    Failed { reason: String },
}

impl Compensation {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Terminal state of one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    Success(FunctionRecord),
    /// Nothing was created; no compensation needed.
    NluFailure(StepFailure),
    BuildFailure {
        error: StepFailure,
        compensation: Compensation,
    },
    ControllerFailure {
        error: StepFailure,
        compensation: Compensation,
    },
}

impl SagaOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The step that ended the run, if it failed.
    pub fn failed_step(&self) -> Option<SagaStep> {
        match self {
            Self::Success(_) => None,
            Self::NluFailure(_) => Some(SagaStep::NluRegistration),
            Self::BuildFailure { .. } => Some(SagaStep::ArchiveBuild),
            Self::ControllerFailure { .. } => Some(SagaStep::FunctionRegistration),
        }
    }

    /// The triggering error. Never a compensation error.
    pub fn error(&self) -> Option<&StepFailure> {
        match self {
            Self::Success(_) => None,
            Self::NluFailure(error)
            | Self::BuildFailure { error, .. }
            | Self::ControllerFailure { error, .. } => Some(error),
        }
    }

    /// Compensation result; `None` when no compensation was attempted.
    pub fn compensation(&self) -> Option<&Compensation> {
        match self {
            Self::Success(_) | Self::NluFailure(_) => None,
            Self::BuildFailure { compensation, .. }
            | Self::ControllerFailure { compensation, .. } => Some(compensation),
        }
    }
}
