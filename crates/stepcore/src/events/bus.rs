use crate::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    WorkflowStarted {
        execution_id: ExecutionId,
        workflow: String,
        total_steps: usize,
        timestamp: DateTime<Utc>,
    },
    WorkflowCompleted {
        execution_id: ExecutionId,
        success: bool,
        failed_step: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    StepStarted {
        execution_id: ExecutionId,
        index: usize,
        name: String,
        action_type: String,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        execution_id: ExecutionId,
        index: usize,
        name: String,
        outputs: HashMap<String, Value>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    StepFailed {
        execution_id: ExecutionId,
        index: usize,
        name: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    StepEvent {
        execution_id: ExecutionId,
        index: usize,
        name: String,
        event: ActionEvent,
        timestamp: DateTime<Utc>,
    },
    CleanupCompleted {
        execution_id: ExecutionId,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            ExecutionEvent::WorkflowStarted { execution_id, .. }
            | ExecutionEvent::WorkflowCompleted { execution_id, .. }
            | ExecutionEvent::StepStarted { execution_id, .. }
            | ExecutionEvent::StepCompleted { execution_id, .. }
            | ExecutionEvent::StepFailed { execution_id, .. }
            | ExecutionEvent::StepEvent { execution_id, .. }
            | ExecutionEvent::CleanupCompleted { execution_id, .. } => *execution_id,
        }
    }
}

/// Events an action reports while it runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum ActionEvent {
    Info { message: String },
    Warning { message: String },
    Progress { percent: f64, message: Option<String> },
    Data { key: String, value: Value },
}

/// Event emitter handed to each step
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    index: usize,
    name: String,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(
        execution_id: ExecutionId,
        index: usize,
        name: impl Into<String>,
        sender: broadcast::Sender<ExecutionEvent>,
    ) -> Self {
        Self {
            execution_id,
            index,
            name: name.into(),
            sender,
        }
    }
    
    /// Emit a step-specific event
    pub fn emit(&self, event: ActionEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(ExecutionEvent::StepEvent {
            execution_id: self.execution_id,
            index: self.index,
            name: self.name.clone(),
            event,
            timestamp: Utc::now(),
        });
    }
    
    pub fn info(&self, message: impl Into<String>) {
        self.emit(ActionEvent::Info {
            message: message.into(),
        });
    }
    
    pub fn warn(&self, message: impl Into<String>) {
        self.emit(ActionEvent::Warning {
            message: message.into(),
        });
    }
    
    pub fn progress(&self, percent: f64, message: Option<String>) {
        self.emit(ActionEvent::Progress { percent, message });
    }
    
    pub fn data(&self, key: impl Into<String>, value: Value) {
        self.emit(ActionEvent::Data {
            key: key.into(),
            value,
        });
    }
}

/// Process-local event bus
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
    
    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }
    
    pub fn emit(&self, event: ExecutionEvent) {
        let _ = self.sender.send(event);
    }
    
    pub fn create_emitter(&self, execution_id: ExecutionId, index: usize, name: &str) -> EventEmitter {
        EventEmitter::new(execution_id, index, name, self.sender.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
