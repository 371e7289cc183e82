use super::prepare_workdir;
use crate::backend::{Backend, BackendKind};
use crate::executor::DagExecutor;
use crate::invocation::{command_line, ModuleInvocation};
use async_trait::async_trait;
use nexacore::{
    EventEmitter, FlowError, ModuleDescriptor, Parameters, Workflow, WorkflowError,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Runs every module as a local subprocess, passing data through
/// `outputs/<module>/<port>.json` files under the working directory.
pub struct LocalBackend {
    workdir: PathBuf,
    executor: DagExecutor,
    events: EventEmitter,
}

/// Everything needed to start one module, computed when it is dispatched
struct PreparedModule {
    invocation: ModuleInvocation,
    output_dir: PathBuf,
    params: Option<(PathBuf, Parameters)>,
}

impl LocalBackend {
    pub fn new(workdir: impl Into<PathBuf>, max_parallel: usize, events: EventEmitter) -> Self {
        Self {
            workdir: workdir.into(),
            executor: DagExecutor::new(max_parallel),
            events,
        }
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.workdir.join("outputs")
    }

    pub fn module_output_dir(&self, module_id: &str) -> PathBuf {
        self.outputs_dir().join(module_id)
    }

    /// File a module writes for one of its output ports
    pub fn output_path(&self, module_id: &str, port: &str) -> PathBuf {
        self.module_output_dir(module_id)
            .join(ModuleDescriptor::output_file_name(port))
    }

    pub fn params_path(&self, module_id: &str) -> PathBuf {
        self.workdir.join(format!("{}_params.json", module_id))
    }

    /// Producer output files feeding `module_id`, keyed by destination port.
    pub fn gather_inputs(&self, workflow: &Workflow, module_id: &str) -> BTreeMap<String, PathBuf> {
        workflow
            .incoming(module_id)
            .map(|conn| {
                (
                    conn.to.input.clone(),
                    self.output_path(&conn.from.module, &conn.from.output),
                )
            })
            .collect()
    }

    fn prepare(
        &self,
        workflow: &Workflow,
        module_id: &str,
        parameters: &Parameters,
    ) -> Result<PreparedModule, FlowError> {
        let module = workflow
            .module(module_id)
            .ok_or_else(|| WorkflowError::UnknownModule {
                module: module_id.to_string(),
            })?;

        let script = module.require_script_path()?;
        let inputs = self.gather_inputs(workflow, module_id);

        let effective = module.effective_parameters(parameters);
        let params = if effective.is_empty() {
            None
        } else {
            Some((self.params_path(module_id), effective))
        };

        let output_dir = self.module_output_dir(module_id);
        let command = command_line(
            &module.executable,
            &script,
            &inputs,
            params.as_ref().map(|(path, _)| path.as_path()),
            &output_dir,
        );

        Ok(PreparedModule {
            invocation: ModuleInvocation::new(module_id, command),
            output_dir,
            params,
        })
    }
}

async fn run_prepared(
    prepared: PreparedModule,
    events: EventEmitter,
    cancel: CancellationToken,
) -> Result<(), FlowError> {
    let PreparedModule {
        invocation,
        output_dir,
        params,
    } = prepared;
    let module_id = invocation.module_id.clone();

    if let Some((path, values)) = params {
        tokio::fs::write(&path, serde_json::to_vec_pretty(&values)?).await?;
    }
    tokio::fs::create_dir_all(&output_dir).await?;

    tracing::info!("Running: {}", invocation.display());
    events.module_started(&module_id, invocation.command.clone());

    match invocation.run(cancel).await {
        Ok(output) => {
            if !output.stderr.is_empty() {
                tracing::debug!("Module {} stderr:\n{}", module_id, output.stderr);
            }
            tracing::info!("Module {} completed in {}ms", module_id, output.duration_ms);
            events.module_completed(&module_id, output.duration_ms);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Module {} failed", module_id);
            events.module_failed(&module_id, e.to_string());
            Err(e.into())
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn execute(&self, workflow: &Workflow, parameters: &Parameters) -> Result<(), FlowError> {
        prepare_workdir(&self.workdir).await?;
        tokio::fs::create_dir_all(self.outputs_dir()).await?;

        let graph = workflow.dependency_graph()?;
        let order = graph.topological_order()?;
        tracing::info!(
            "Execution order: {:?} (up to {} at once)",
            order,
            self.executor.max_parallel()
        );

        let completed = self
            .executor
            .execute(&graph, |module_id, cancel| {
                // Script lookup happens here, when the module is dispatched
                let prepared = self.prepare(workflow, module_id, parameters);
                let events = self.events.clone();
                let module_id = module_id.to_string();
                async move {
                    match prepared {
                        Ok(prepared) => run_prepared(prepared, events, cancel).await,
                        Err(e) => {
                            tracing::error!("Module {} could not be prepared: {}", module_id, e);
                            events.module_failed(&module_id, e.to_string());
                            Err(e)
                        }
                    }
                }
            })
            .await?;

        tracing::info!(
            "Workflow '{}' finished: {} modules completed",
            workflow.id,
            completed.len()
        );
        Ok(())
    }
}
