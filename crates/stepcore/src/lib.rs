//! Core abstractions for the step runner
//! 
//! This crate provides the types shared by the runtime, the built-in
//! actions and the CLI: steps and the actions they wrap, workflow
//! definitions, results, cleanup scopes and execution events.

mod cleanup;
mod error;
pub mod events;
mod result;
mod step;
mod value;
mod workflow;

pub use cleanup::{CleanupGuard, CleanupHandler, CleanupScope};
pub use error::{ActionError, StepError, StepFailure, WorkflowError};
pub use step::{Action, FnAction, Step, StepContext, StepMetadata, StepOutput};
pub use workflow::{GatewayConfig, StepSpec, WorkflowDef, WorkflowId, WorkflowSettings};
pub use result::WorkflowResult;
pub use value::Value;
pub use events::*;

/// Result type for step runner operations
pub type Result<T> = std::result::Result<T, StepError>;
