use crate::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

pub type WorkflowId = Uuid;

/// Declarative workflow definition, loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDef {
    #[serde(default = "Uuid::new_v4")]
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub steps: Vec<StepSpec>,
    #[serde(default)]
    pub settings: WorkflowSettings,
}

impl WorkflowDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            steps: Vec::new(),
            settings: WorkflowSettings::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a step; insertion order is execution order.
    pub fn add_step(&mut self, step: StepSpec) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    pub fn find_step(&self, name: &str) -> Option<&StepSpec> {
        self.steps.iter().find(|s| s.name == name)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a definition from a JSON file
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Step specification in a workflow definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    /// Human-readable name, reported on failure
    pub name: String,
    pub action_type: String,
    #[serde(default)]
    pub config: HashMap<String, Value>,
    /// This step's output is the workflow's result
    #[serde(default)]
    pub terminal: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action_type: action_type.into(),
            config: HashMap::new(),
            terminal: false,
            timeout_ms: None,
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// Workflow-wide settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Gateway used by ledger steps that do not name their own
    #[serde(default)]
    pub gateway: Option<GatewayConfig>,
}

/// Where ledger invoke/query calls are sent, and against which chaincode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub url: String,
    pub channel: String,
    pub chaincode_id: String,
    pub chaincode_version: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:4000".to_string(),
            channel: "fullchannel".to_string(),
            chaincode_id: "beatchain_alpha".to_string(),
            chaincode_version: "v0".to_string(),
        }
    }
}
