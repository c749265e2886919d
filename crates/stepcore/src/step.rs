use crate::{events::EventEmitter, ActionError, ExecutionId, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Core trait for the work a step performs
///
/// An action is a black box to the runner: it either produces a
/// [`StepOutput`] or an [`ActionError`], which is reported as-is.
#[async_trait]
pub trait Action: Send + Sync {
    /// Unique type identifier (e.g., "gateway.invoke", "shell.exec")
    fn action_type(&self) -> &str;

    /// Execute the action with the given context
    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, ActionError>;

    /// Optional: Validate configuration when a workflow is loaded
    fn validate_config(&self, _config: &HashMap<String, Value>) -> Result<(), ActionError> {
        Ok(())
    }
}

/// Adapter turning an async closure into an [`Action`].
pub struct FnAction<F> {
    action_type: String,
    f: F,
}

impl<F> FnAction<F> {
    pub fn new(action_type: impl Into<String>, f: F) -> Self {
        Self {
            action_type: action_type.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> Action for FnAction<F>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<StepOutput, ActionError>> + Send + 'static,
{
    fn action_type(&self) -> &str {
        &self.action_type
    }

    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, ActionError> {
        (self.f)(ctx).await
    }
}

/// Execution context passed to each step
#[derive(Clone)]
pub struct StepContext {
    pub execution_id: ExecutionId,

    /// Zero-based position of the step in the workflow
    pub index: usize,

    pub step_name: String,

    /// Outputs of the previous step, or the workflow inputs for the first one
    pub inputs: HashMap<String, Value>,

    /// Static configuration for this step
    pub config: HashMap<String, Value>,

    pub events: EventEmitter,
}

impl StepContext {
    /// Get required input or return error
    pub fn require_input(&self, name: &str) -> Result<&Value, ActionError> {
        self.inputs.get(name)
            .ok_or_else(|| ActionError::MissingInput(name.to_string()))
    }

    /// Get config value or return error
    pub fn require_config(&self, name: &str) -> Result<&Value, ActionError> {
        self.config.get(name)
            .ok_or_else(|| ActionError::Configuration(format!("Missing config: {}", name)))
    }

    /// Get a required string from config
    pub fn require_config_str(&self, name: &str) -> Result<&str, ActionError> {
        self.require_config(name)?
            .as_str()
            .ok_or_else(|| ActionError::invalid_type(name, "string", "other"))
    }

    /// Look a key up in config first, then in inputs
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.config.get(name).or_else(|| self.inputs.get(name))
    }

    /// Get config with default
    pub fn get_config_or(&self, name: &str, default: Value) -> Value {
        self.config.get(name).cloned().unwrap_or(default)
    }
}

/// Output from a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutput {
    pub outputs: HashMap<String, Value>,
    pub metadata: StepMetadata,
}

impl StepOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.outputs.get(key)
    }
}

/// Metadata about a step execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepMetadata {
    pub execution_time_ms: u64,
    pub custom: HashMap<String, Value>,
}

/// One named unit of work in a workflow
///
/// Steps are cheap to clone; the action is shared.
#[derive(Clone)]
pub struct Step {
    name: String,
    action: Arc<dyn Action>,
    config: HashMap<String, Value>,
    is_terminal: bool,
    timeout: Option<Duration>,
}

impl Step {
    pub fn new(name: impl Into<String>, action: impl Action + 'static) -> Self {
        Self::from_arc(name, Arc::new(action))
    }

    pub fn from_boxed(name: impl Into<String>, action: Box<dyn Action>) -> Self {
        Self::from_arc(name, Arc::from(action))
    }

    pub fn from_arc(name: impl Into<String>, action: Arc<dyn Action>) -> Self {
        Self {
            name: name.into(),
            action,
            config: HashMap::new(),
            is_terminal: false,
            timeout: None,
        }
    }

    /// Build a step from an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(StepContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepOutput, ActionError>> + Send + 'static,
    {
        Self::new(name, FnAction::new("fn", f))
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn with_configs(mut self, config: HashMap<String, Value>) -> Self {
        self.config.extend(config);
        self
    }

    /// Mark this step's output as the workflow's success value.
    pub fn terminal(mut self) -> Self {
        self.is_terminal = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn action(&self) -> &dyn Action {
        self.action.as_ref()
    }

    pub fn config(&self) -> &HashMap<String, Value> {
        &self.config
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("action_type", &self.action.action_type())
            .field("is_terminal", &self.is_terminal)
            .field("timeout", &self.timeout)
            .finish()
    }
}
