use stepcore::{Action, ActionError, Value, WorkflowError};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory trait for creating action instances
pub trait ActionFactory: Send + Sync {
    /// Create a new instance of the action with given configuration
    fn create(&self, config: &HashMap<String, Value>) -> Result<Box<dyn Action>, ActionError>;
    
    /// Get action type identifier
    fn action_type(&self) -> &str;
    
    /// Optional: Get action metadata (description, accepted config keys)
    fn metadata(&self) -> ActionMetadata {
        ActionMetadata::default()
    }
}

/// Metadata about an action type
#[derive(Debug, Clone)]
pub struct ActionMetadata {
    pub description: String,
    pub category: String,
    pub config: Vec<ConfigField>,
    pub outputs: Vec<ConfigField>,
}

impl Default for ActionMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
            config: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigField {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ConfigField {
    pub fn required(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    pub fn optional(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required: false,
        }
    }
}

/// Registry of available action types
pub struct ActionRegistry {
    factories: HashMap<String, Arc<dyn ActionFactory>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }
    
    /// Register an action factory, replacing any previous one for the type
    pub fn register(&mut self, factory: Arc<dyn ActionFactory>) {
        let action_type = factory.action_type().to_string();
        tracing::debug!("Registering action type: {}", action_type);
        self.factories.insert(action_type, factory);
    }
    
    /// Create an action instance from an action type and config
    pub fn create_action(
        &self,
        action_type: &str,
        config: &HashMap<String, Value>,
    ) -> Result<Box<dyn Action>, WorkflowError> {
        let factory = self.factories.get(action_type)
            .ok_or_else(|| WorkflowError::UnknownActionType(action_type.to_string()))?;
        
        factory.create(config)
            .map_err(|e| WorkflowError::Invalid(format!("Failed to create action: {}", e)))
    }
    
    pub fn contains(&self, action_type: &str) -> bool {
        self.factories.contains_key(action_type)
    }
    
    /// Get all registered action types, sorted
    pub fn list_action_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.keys().cloned().collect();
        types.sort();
        types
    }
    
    /// Get metadata for an action type
    pub fn get_metadata(&self, action_type: &str) -> Option<ActionMetadata> {
        self.factories.get(action_type).map(|f| f.metadata())
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
