use crate::hooks::ProcessHooks;
use chrono::Utc;
use stepcore::{
    ActionError, CleanupHandler, EventBus, ExecutionEvent, ExecutionId, Step, StepContext,
    StepFailure, StepOutput, Value, WorkflowResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::timeout;

/// Runs an ordered list of steps, one at a time
///
/// The first failing step ends the run. Whatever the outcome, the cleanup
/// handler given at construction runs exactly once per call to
/// [`WorkflowRunner::run`].
pub struct WorkflowRunner {
    name: String,
    cleanup: CleanupHandler,
    event_bus: Arc<EventBus>,
    hooks: Option<ProcessHooks>,
    inputs: HashMap<String, Value>,
}

impl WorkflowRunner {
    pub fn new(cleanup: CleanupHandler) -> Self {
        Self {
            name: "workflow".to_string(),
            cleanup,
            event_bus: Arc::new(EventBus::default()),
            hooks: None,
            inputs: HashMap::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Publish run events on a shared bus instead of a private one
    pub fn with_events(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Also fire cleanup from process-level hooks while a run is active
    pub fn with_hooks(mut self, hooks: ProcessHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    /// Inputs handed to the first step
    pub fn with_inputs(mut self, inputs: HashMap<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Execute the steps and return the outcome
    pub async fn run(&self, steps: Vec<Step>) -> WorkflowResult {
        let execution_id = ExecutionId::new_v4();
        let start_time = Instant::now();

        // Released on every exit path, including a panicking step.
        let scope = self.cleanup.scope();
        let _guard = scope.guard();
        let _registration = self.hooks.as_ref().map(|hooks| hooks.watch(scope.clone()));

        self.event_bus.emit(ExecutionEvent::WorkflowStarted {
            execution_id,
            workflow: self.name.clone(),
            total_steps: steps.len(),
            timestamp: Utc::now(),
        });

        tracing::info!("Starting workflow '{}' ({} steps)", self.name, steps.len());

        let result = self.run_steps(execution_id, &steps).await;

        if scope.fire() {
            self.event_bus.emit(ExecutionEvent::CleanupCompleted {
                execution_id,
                timestamp: Utc::now(),
            });
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;
        match &result {
            WorkflowResult::Success(_) => {
                tracing::info!("Workflow '{}' completed in {}ms", self.name, duration_ms);
            }
            WorkflowResult::Failure(failure) => {
                tracing::error!("Workflow '{}' aborted: {}", self.name, failure);
            }
        }

        self.event_bus.emit(ExecutionEvent::WorkflowCompleted {
            execution_id,
            success: result.is_success(),
            failed_step: result.failure().map(|f| f.step.clone()),
            duration_ms,
            timestamp: Utc::now(),
        });

        result
    }

    /// Execute the steps, then terminate the process with the outcome's
    /// exit code (0 on success, 1 on failure).
    ///
    /// Drives its own tokio runtime, so it is meant for a plain `fn main`
    /// and must not be called from inside an async context.
    pub fn run_and_exit(&self, steps: Vec<Step>) -> ! {
        let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                tracing::error!("Failed to start runtime for '{}': {}", self.name, e);
                self.cleanup.scope().fire();
                std::process::exit(1);
            }
        };

        let code = runtime.block_on(self.run(steps)).exit_code();
        // The scope has already fired; exit skips destructors.
        drop(runtime);
        std::process::exit(code);
    }

    async fn run_steps(&self, execution_id: ExecutionId, steps: &[Step]) -> WorkflowResult {
        let total = steps.len();
        let mut inputs = self.inputs.clone();
        let mut last_output = StepOutput::new();
        let mut terminal_output = None;

        for (index, step) in steps.iter().enumerate() {
            let action_type = step.action().action_type().to_string();
            let ctx = StepContext {
                execution_id,
                index,
                step_name: step.name().to_string(),
                inputs: std::mem::take(&mut inputs),
                config: step.config().clone(),
                events: self.event_bus.create_emitter(execution_id, index, step.name()),
            };

            self.event_bus.emit(ExecutionEvent::StepStarted {
                execution_id,
                index,
                name: step.name().to_string(),
                action_type: action_type.clone(),
                timestamp: Utc::now(),
            });
            tracing::info!("Step {}/{} '{}' ({}) starting", index + 1, total, step.name(), action_type);

            let start = Instant::now();
            let outcome = match step.timeout() {
                Some(limit) => match timeout(limit, step.action().execute(ctx)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ActionError::Timeout {
                        millis: limit.as_millis() as u64,
                    }),
                },
                None => step.action().execute(ctx).await,
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            match outcome {
                Ok(mut output) => {
                    output.metadata.execution_time_ms = duration_ms;
                    tracing::info!("Step '{}' completed in {}ms", step.name(), duration_ms);

                    self.event_bus.emit(ExecutionEvent::StepCompleted {
                        execution_id,
                        index,
                        name: step.name().to_string(),
                        outputs: output.outputs.clone(),
                        duration_ms,
                        timestamp: Utc::now(),
                    });

                    inputs = output.outputs.clone();
                    if step.is_terminal() {
                        terminal_output = Some(output.clone());
                    }
                    last_output = output;
                }
                Err(error) => {
                    tracing::error!("Step '{}' failed: {}", step.name(), error);

                    self.event_bus.emit(ExecutionEvent::StepFailed {
                        execution_id,
                        index,
                        name: step.name().to_string(),
                        error: error.to_string(),
                        timestamp: Utc::now(),
                    });

                    if index + 1 < total {
                        tracing::debug!("Skipping {} remaining step(s)", total - index - 1);
                    }
                    return WorkflowResult::Failure(StepFailure::new(step.name(), error));
                }
            }
        }

        WorkflowResult::Success(terminal_output.unwrap_or(last_output))
    }
}

impl Default for WorkflowRunner {
    fn default() -> Self {
        Self::new(CleanupHandler::noop())
    }
}
