use crate::{hooks::ProcessHooks, registry::ActionRegistry, WorkflowRunner};
use stepcore::{
    CleanupHandler, EventBus, ExecutionEvent, Step, Value, WorkflowDef, WorkflowError,
    WorkflowResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Turns workflow definitions into steps and runs them
pub struct StepRuntime {
    registry: Arc<ActionRegistry>,
    event_bus: Arc<EventBus>,
    hooks: Option<ProcessHooks>,
    config: RuntimeConfig,
}

impl StepRuntime {
    /// Create a new runtime with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a new runtime with custom configuration
    pub fn with_config(config: RuntimeConfig) -> Self {
        let registry = Arc::new(ActionRegistry::new());
        Self::with_registry(registry, config)
    }

    /// Create a new runtime with a pre-configured registry
    pub fn with_registry(registry: Arc<ActionRegistry>, config: RuntimeConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            registry,
            event_bus,
            hooks: None,
            config,
        }
    }

    /// Fire cleanup from these process hooks while a workflow runs
    pub fn with_hooks(mut self, hooks: ProcessHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn registry(&self) -> &Arc<ActionRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Check a definition without instantiating anything
    pub fn validate(&self, workflow: &WorkflowDef) -> Result<(), WorkflowError> {
        if workflow.steps.is_empty() {
            return Err(WorkflowError::Empty);
        }

        let mut seen = HashSet::new();
        for spec in &workflow.steps {
            if spec.name.trim().is_empty() {
                return Err(WorkflowError::Invalid(format!(
                    "step with action '{}' has an empty name",
                    spec.action_type
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(WorkflowError::DuplicateStep(spec.name.clone()));
            }
            if !self.registry.contains(&spec.action_type) {
                return Err(WorkflowError::UnknownActionType(spec.action_type.clone()));
            }
        }

        Ok(())
    }

    /// Validate a definition and build its steps, in order
    pub fn build_steps(&self, workflow: &WorkflowDef) -> Result<Vec<Step>, WorkflowError> {
        self.validate(workflow)?;

        workflow.steps.iter()
            .map(|spec| {
                let action = self.registry.create_action(&spec.action_type, &spec.config)?;
                action.validate_config(&spec.config)
                    .map_err(|e| WorkflowError::InvalidConfig {
                        step: spec.name.clone(),
                        reason: e.to_string(),
                    })?;

                let mut step = Step::from_boxed(spec.name.clone(), action)
                    .with_configs(spec.config.clone());
                if spec.terminal {
                    step = step.terminal();
                }
                if let Some(ms) = spec.timeout_ms.or(self.config.default_timeout_ms) {
                    step = step.with_timeout(Duration::from_millis(ms));
                }
                Ok(step)
            })
            .collect()
    }

    /// Build a runner publishing on this runtime's event bus
    pub fn runner(&self, name: &str, cleanup: CleanupHandler) -> WorkflowRunner {
        let runner = WorkflowRunner::new(cleanup)
            .named(name)
            .with_events(Arc::clone(&self.event_bus));
        match &self.hooks {
            Some(hooks) => runner.with_hooks(hooks.clone()),
            None => runner,
        }
    }

    /// Execute a workflow definition
    ///
    /// A definition that fails to build never starts, but the cleanup
    /// handler still runs once before the error is returned.
    pub async fn execute(
        &self,
        workflow: &WorkflowDef,
        cleanup: CleanupHandler,
        inputs: HashMap<String, Value>,
    ) -> Result<WorkflowResult, WorkflowError> {
        let steps = match self.build_steps(workflow) {
            Ok(steps) => steps,
            Err(e) => {
                tracing::error!("Workflow '{}' is invalid: {}", workflow.name, e);
                cleanup.scope().fire();
                return Err(e);
            }
        };

        Ok(self.runner(&workflow.name, cleanup)
            .with_inputs(inputs)
            .run(steps)
            .await)
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

impl Default for StepRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
    /// Applied to steps that do not set their own timeout
    pub default_timeout_ms: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
            default_timeout_ms: None,
        }
    }
}
