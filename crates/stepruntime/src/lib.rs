//! Workflow execution runtime
//! 
//! This crate provides the sequential step runner, the action registry,
//! process-level cleanup hooks and a runtime that turns workflow
//! definitions into runnable steps.

mod hooks;
mod registry;
mod runner;
mod runtime;

pub use hooks::{HookRegistration, ProcessHooks, INTERRUPTED_EXIT_CODE};
pub use registry::{ActionFactory, ActionMetadata, ConfigField, ActionRegistry};
pub use runner::WorkflowRunner;
pub use runtime::{StepRuntime, RuntimeConfig};
