use async_trait::async_trait;
use stepcore::{Action, ActionError, StepContext, StepOutput, Value};
use stepruntime::{ActionFactory, ActionMetadata, ConfigField};
use std::collections::HashMap;
use tokio::time::{sleep, Duration};

const DEFAULT_DELAY_MS: u64 = 1000;

/// Wait for a fixed time, e.g. for a join to propagate between provisioning steps
pub struct DelayAction;

#[async_trait]
impl Action for DelayAction {
    fn action_type(&self) -> &str {
        "time.delay"
    }
    
    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, ActionError> {
        let delay_ms = ctx.config.get("delay_ms")
            .and_then(|v| v.as_f64())
            .map(|ms| ms.max(0.0) as u64)
            .unwrap_or(DEFAULT_DELAY_MS);
        
        ctx.events.info(format!("Delaying for {}ms", delay_ms));
        
        sleep(Duration::from_millis(delay_ms)).await;
        
        // Pass through
        Ok(StepOutput {
            outputs: ctx.inputs,
            ..StepOutput::default()
        })
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), ActionError> {
        match config.get("delay_ms") {
            Some(v) if v.as_f64().is_none() => Err(ActionError::invalid_type("delay_ms", "number", "other")),
            _ => Ok(()),
        }
    }
}

pub struct DelayActionFactory;

impl ActionFactory for DelayActionFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(DelayAction))
    }
    
    fn action_type(&self) -> &str {
        "time.delay"
    }
    
    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Delay for the given number of milliseconds".to_string(),
            category: "time".to_string(),
            config: vec![ConfigField::optional("delay_ms", "Milliseconds to wait (default 1000)")],
            outputs: vec![],
        }
    }
}
