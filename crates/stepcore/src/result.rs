use crate::{StepFailure, StepOutput};

/// Outcome of a full workflow run
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowResult {
    /// Every step succeeded; carries the terminal step's output
    Success(StepOutput),
    /// The first step that failed, and why
    Failure(StepFailure),
}

impl WorkflowResult {
    pub fn is_success(&self) -> bool {
        matches!(self, WorkflowResult::Success(_))
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowResult::Success(_) => 0,
            WorkflowResult::Failure(_) => 1,
        }
    }

    pub fn output(&self) -> Option<&StepOutput> {
        match self {
            WorkflowResult::Success(output) => Some(output),
            WorkflowResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&StepFailure> {
        match self {
            WorkflowResult::Success(_) => None,
            WorkflowResult::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<StepOutput, StepFailure> {
        self.into()
    }
}

impl From<WorkflowResult> for Result<StepOutput, StepFailure> {
    fn from(result: WorkflowResult) -> Self {
        match result {
            WorkflowResult::Success(output) => Ok(output),
            WorkflowResult::Failure(failure) => Err(failure),
        }
    }
}
