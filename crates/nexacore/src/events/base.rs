use crate::ModuleId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Events emitted during a workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    WorkflowStarted {
        execution_id: ExecutionId,
        workflow_id: String,
        backend: String,
        timestamp: DateTime<Utc>,
    },
    WorkflowCompleted {
        execution_id: ExecutionId,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    ModuleStarted {
        execution_id: ExecutionId,
        module_id: ModuleId,
        command: Vec<String>,
        timestamp: DateTime<Utc>,
    },
    ModuleCompleted {
        execution_id: ExecutionId,
        module_id: ModuleId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    ModuleFailed {
        execution_id: ExecutionId,
        module_id: ModuleId,
        error: String,
        timestamp: DateTime<Utc>,
    },
    ScriptGenerated {
        execution_id: ExecutionId,
        path: PathBuf,
        timestamp: DateTime<Utc>,
    },
    SubmissionRecorded {
        execution_id: ExecutionId,
        workflow_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            ExecutionEvent::WorkflowStarted { execution_id, .. }
            | ExecutionEvent::WorkflowCompleted { execution_id, .. }
            | ExecutionEvent::ModuleStarted { execution_id, .. }
            | ExecutionEvent::ModuleCompleted { execution_id, .. }
            | ExecutionEvent::ModuleFailed { execution_id, .. }
            | ExecutionEvent::ScriptGenerated { execution_id, .. }
            | ExecutionEvent::SubmissionRecorded { execution_id, .. } => *execution_id,
        }
    }
}

/// Emits events for a single execution
#[derive(Clone)]
pub struct EventEmitter {
    execution_id: ExecutionId,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(execution_id: ExecutionId, sender: broadcast::Sender<ExecutionEvent>) -> Self {
        Self {
            execution_id,
            sender,
        }
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    fn send(&self, event: ExecutionEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn workflow_started(&self, workflow_id: &str, backend: &str) {
        self.send(ExecutionEvent::WorkflowStarted {
            execution_id: self.execution_id,
            workflow_id: workflow_id.to_string(),
            backend: backend.to_string(),
            timestamp: Utc::now(),
        });
    }

    pub fn workflow_completed(&self, success: bool, duration_ms: u64) {
        self.send(ExecutionEvent::WorkflowCompleted {
            execution_id: self.execution_id,
            success,
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    pub fn module_started(&self, module_id: &str, command: Vec<String>) {
        self.send(ExecutionEvent::ModuleStarted {
            execution_id: self.execution_id,
            module_id: module_id.to_string(),
            command,
            timestamp: Utc::now(),
        });
    }

    pub fn module_completed(&self, module_id: &str, duration_ms: u64) {
        self.send(ExecutionEvent::ModuleCompleted {
            execution_id: self.execution_id,
            module_id: module_id.to_string(),
            duration_ms,
            timestamp: Utc::now(),
        });
    }

    pub fn module_failed(&self, module_id: &str, error: impl Into<String>) {
        self.send(ExecutionEvent::ModuleFailed {
            execution_id: self.execution_id,
            module_id: module_id.to_string(),
            error: error.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn script_generated(&self, path: impl Into<PathBuf>) {
        self.send(ExecutionEvent::ScriptGenerated {
            execution_id: self.execution_id,
            path: path.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn submission_recorded(&self, workflow_id: &str) {
        self.send(ExecutionEvent::SubmissionRecorded {
            execution_id: self.execution_id,
            workflow_id: workflow_id.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Global event bus
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

    pub fn create_emitter(&self, execution_id: ExecutionId) -> EventEmitter {
        EventEmitter::new(execution_id, self.sender.clone())
    }
}
