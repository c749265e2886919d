use async_trait::async_trait;
use stepcore::{Action, ActionError, StepContext, StepOutput, Value};
use stepruntime::{ActionFactory, ActionMetadata, ConfigField};
use std::collections::HashMap;

/// Logs a message and the step's inputs
pub struct DebugAction;

#[async_trait]
impl Action for DebugAction {
    fn action_type(&self) -> &str {
        "debug.log"
    }
    
    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, ActionError> {
        let message = ctx.lookup("message")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "(no message)".to_string());
        
        tracing::info!("[{}] {}", ctx.step_name, message);
        ctx.events.info(message.clone());
        
        for (key, value) in &ctx.inputs {
            ctx.events.info(format!("  {}: {}", key, value));
        }
        
        Ok(StepOutput::new()
            .with_output("message", message))
    }
}

pub struct DebugActionFactory;

impl ActionFactory for DebugActionFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(DebugAction))
    }
    
    fn action_type(&self) -> &str {
        "debug.log"
    }
    
    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Log a message and the incoming values".to_string(),
            category: "debug".to_string(),
            config: vec![ConfigField::optional("message", "Text to log (falls back to the 'message' input)")],
            outputs: vec![ConfigField::optional("message", "The logged text")],
        }
    }
}
