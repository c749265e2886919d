use thiserror::Error;

/// Errors reading or writing workflow definitions
#[derive(Error, Debug)]
pub enum StepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error raised by an action while a step is running.
///
/// The runner never interprets these; they travel unchanged into
/// [`StepFailure`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Missing required input: {0}")]
    MissingInput(String),
    
    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },
    
    #[error("Configuration error: {0}")]
    Configuration(String),
    
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    
    #[error("Timeout after {millis}ms")]
    Timeout { millis: u64 },
    
    #[error("External system error: {0}")]
    External(String),
}

impl ActionError {
    pub fn invalid_type(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        ActionError::InvalidInputType {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// The first failing step of a workflow run and its untouched cause.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("step '{step}' failed: {error}")]
pub struct StepFailure {
    pub step: String,
    #[source]
    pub error: ActionError,
}

impl StepFailure {
    pub fn new(step: impl Into<String>, error: ActionError) -> Self {
        Self {
            step: step.into(),
            error,
        }
    }
}

/// Problems with a workflow definition, detected before any step runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Invalid workflow: {0}")]
    Invalid(String),
    
    #[error("Workflow has no steps")]
    Empty,
    
    #[error("Duplicate step name: {0}")]
    DuplicateStep(String),
    
    #[error("Unknown action type: {0}")]
    UnknownActionType(String),
    
    #[error("Invalid config for step '{step}': {reason}")]
    InvalidConfig { step: String, reason: String },
}
