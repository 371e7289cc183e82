use crate::backends::{LocalBackend, PipelineBackend, RemoteBackend};
use crate::RuntimeConfig;
use async_trait::async_trait;
use nexacore::{EventEmitter, FlowError, Parameters, Workflow};
use std::fmt;
use std::str::FromStr;

/// Names of the available execution strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Local,
    Pipeline,
    Remote,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [BackendKind::Local, BackendKind::Pipeline, BackendKind::Remote];

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Pipeline => "pipeline",
            BackendKind::Remote => "remote",
        }
    }
}

impl FromStr for BackendKind {
    type Err = FlowError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "local" => Ok(BackendKind::Local),
            "pipeline" | "nextflow" => Ok(BackendKind::Pipeline),
            "remote" => Ok(BackendKind::Remote),
            other => Err(FlowError::UnsupportedBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared contract of every execution strategy
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Run `workflow`. `parameters` only override module defaults that
    /// already exist; an empty set means no global parameters.
    async fn execute(&self, workflow: &Workflow, parameters: &Parameters) -> Result<(), FlowError>;
}

/// Closed set of backends, selected by [`BackendKind`]
pub enum ExecutionBackend {
    Local(LocalBackend),
    Pipeline(PipelineBackend),
    Remote(RemoteBackend),
}

impl ExecutionBackend {
    pub fn new(kind: BackendKind, config: &RuntimeConfig, events: EventEmitter) -> Self {
        match kind {
            BackendKind::Local => ExecutionBackend::Local(LocalBackend::new(
                config.workdir.clone(),
                config.max_parallel_modules,
                events,
            )),
            BackendKind::Pipeline => ExecutionBackend::Pipeline(PipelineBackend::new(
                config.workdir.clone(),
                config.engine.clone(),
                events,
            )),
            BackendKind::Remote => {
                ExecutionBackend::Remote(RemoteBackend::new(config.workdir.clone(), events))
            }
        }
    }
}

#[async_trait]
impl Backend for ExecutionBackend {
    fn kind(&self) -> BackendKind {
        match self {
            ExecutionBackend::Local(backend) => backend.kind(),
            ExecutionBackend::Pipeline(backend) => backend.kind(),
            ExecutionBackend::Remote(backend) => backend.kind(),
        }
    }

    async fn execute(&self, workflow: &Workflow, parameters: &Parameters) -> Result<(), FlowError> {
        match self {
            ExecutionBackend::Local(backend) => backend.execute(workflow, parameters).await,
            ExecutionBackend::Pipeline(backend) => backend.execute(workflow, parameters).await,
            ExecutionBackend::Remote(backend) => backend.execute(workflow, parameters).await,
        }
    }
}
