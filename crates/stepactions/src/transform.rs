use async_trait::async_trait;
use stepcore::{Action, ActionError, StepContext, StepOutput, Value};
use stepruntime::{ActionFactory, ActionMetadata, ConfigField};
use std::collections::HashMap;

/// Parse a JSON string (config or previous output) into a value
pub struct JsonParseAction;

#[async_trait]
impl Action for JsonParseAction {
    fn action_type(&self) -> &str {
        "transform.json_parse"
    }
    
    async fn execute(&self, ctx: StepContext) -> Result<StepOutput, ActionError> {
        let key = ctx.config.get("from")
            .and_then(|v| v.as_str())
            .unwrap_or("json")
            .to_string();
        
        let input = ctx.lookup(&key)
            .ok_or_else(|| ActionError::MissingInput(key.clone()))?
            .as_str()
            .ok_or_else(|| ActionError::invalid_type(key.as_str(), "string", "other"))?;
        
        let parsed: serde_json::Value = serde_json::from_str(input)
            .map_err(|e| ActionError::ExecutionFailed(format!("JSON parse error: {}", e)))?;
        
        Ok(StepOutput::new()
            .with_output("parsed", Value::Json(parsed)))
    }
}

pub struct JsonParseActionFactory;

impl ActionFactory for JsonParseActionFactory {
    fn create(&self, _config: &HashMap<String, Value>) -> Result<Box<dyn Action>, ActionError> {
        Ok(Box::new(JsonParseAction))
    }
    
    fn action_type(&self) -> &str {
        "transform.json_parse"
    }
    
    fn metadata(&self) -> ActionMetadata {
        ActionMetadata {
            description: "Parse a JSON string".to_string(),
            category: "transform".to_string(),
            config: vec![ConfigField::optional("from", "Key holding the JSON text (default 'json')")],
            outputs: vec![ConfigField::optional("parsed", "Parsed JSON value")],
        }
    }
}
