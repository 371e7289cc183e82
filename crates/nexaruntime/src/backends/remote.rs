use super::prepare_workdir;
use crate::backend::{Backend, BackendKind};
use async_trait::async_trait;
use nexacore::{EventEmitter, FlowError, Parameters, Workflow};
use std::path::PathBuf;

/// Placeholder for job submission to a remote scheduler.
///
/// Records what would be submitted and returns; nothing is executed,
/// polled or retrieved.
pub struct RemoteBackend {
    workdir: PathBuf,
    events: EventEmitter,
}

impl RemoteBackend {
    pub fn new(workdir: impl Into<PathBuf>, events: EventEmitter) -> Self {
        Self {
            workdir: workdir.into(),
            events,
        }
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn execute(&self, workflow: &Workflow, parameters: &Parameters) -> Result<(), FlowError> {
        prepare_workdir(&self.workdir).await?;

        tracing::info!("[remote] Would execute workflow '{}' remotely", workflow.id);
        tracing::info!(
            "[remote] Parameters: {}",
            serde_json::Value::Object(parameters.clone())
        );
        self.events.submission_recorded(&workflow.id);
        tracing::info!("[remote] Execution completed (mock)");
        Ok(())
    }
}
