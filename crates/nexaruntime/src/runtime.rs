use crate::backend::{Backend, BackendKind, ExecutionBackend};
use nexacore::{
    load_global_parameters, EventBus, ExecutionEvent, ExecutionId, FlowError, Parameters, Workflow,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Loads a workflow with its global parameters and runs it on a chosen backend
pub struct Runner {
    workflow: Workflow,
    parameters: Parameters,
    config: RuntimeConfig,
    event_bus: Arc<EventBus>,
}

impl Runner {
    /// Load a workflow file and, optionally, a global parameter file.
    ///
    /// A parameter file that does not exist means no global parameters.
    pub fn load(
        workflow_path: impl AsRef<Path>,
        parameters_path: Option<&Path>,
    ) -> Result<Self, FlowError> {
        let workflow = Workflow::from_file(workflow_path)?;
        let parameters = load_global_parameters(parameters_path)?;
        Ok(Self::new(workflow, parameters))
    }

    pub fn new(workflow: Workflow, parameters: Parameters) -> Self {
        Self::with_config(workflow, parameters, RuntimeConfig::default())
    }

    pub fn with_config(workflow: Workflow, parameters: Parameters, config: RuntimeConfig) -> Self {
        let event_bus = Arc::new(EventBus::new(config.event_buffer_size));
        Self {
            workflow,
            parameters,
            config,
            event_bus,
        }
    }

    /// Replace the runtime configuration
    pub fn configure(self, config: RuntimeConfig) -> Self {
        Self::with_config(self.workflow, self.parameters, config)
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Subscribe to execution events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Run the workflow on the backend called `backend`.
    ///
    /// Unknown names fail before anything touches the filesystem.
    /// `workdir` overrides the configured working directory.
    pub async fn run(&self, backend: &str, workdir: Option<&Path>) -> Result<RunReport, FlowError> {
        let kind: BackendKind = backend.parse()?;
        self.run_with(kind, workdir).await
    }

    pub async fn run_with(
        &self,
        kind: BackendKind,
        workdir: Option<&Path>,
    ) -> Result<RunReport, FlowError> {
        let mut config = self.config.clone();
        if let Some(workdir) = workdir {
            config.workdir = workdir.to_path_buf();
        }

        let execution_id = ExecutionId::new_v4();
        let events = self.event_bus.create_emitter(execution_id);
        let backend = ExecutionBackend::new(kind, &config, events.clone());

        tracing::info!(
            "Starting workflow '{}' on {} backend (execution {})",
            self.workflow.id,
            kind,
            execution_id
        );
        events.workflow_started(&self.workflow.id, kind.name());

        let start = Instant::now();
        let result = backend.execute(&self.workflow, &self.parameters).await;
        let duration_ms = start.elapsed().as_millis() as u64;
        events.workflow_completed(result.is_ok(), duration_ms);

        match result {
            Ok(()) => Ok(RunReport {
                execution_id,
                backend: kind,
                workdir: config.workdir,
                duration_ms,
            }),
            Err(e) => {
                tracing::error!("Workflow '{}' failed: {}", self.workflow.id, e);
                Err(e)
            }
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub execution_id: ExecutionId,
    pub backend: BackendKind,
    pub workdir: PathBuf,
    pub duration_ms: u64,
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Working directory backends write into
    pub workdir: PathBuf,
    /// Upper bound on modules running at once in the local backend.
    /// Defaults to 1, which runs modules one at a time in execution order.
    pub max_parallel_modules: usize,
    pub event_buffer_size: usize,
    /// Program invoked by the pipeline backend
    pub engine: String,
}

impl RuntimeConfig {
    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel_modules = max_parallel.max(1);
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workdir: PathBuf::from("nexa_run"),
            max_parallel_modules: 1,
            event_buffer_size: 1000,
            engine: "nextflow".to_string(),
        }
    }
}
