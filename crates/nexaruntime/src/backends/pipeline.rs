use super::prepare_workdir;
use crate::backend::{Backend, BackendKind};
use async_trait::async_trait;
use nexacore::{
    absolute_path, EventEmitter, FlowError, ModuleDescriptor, Parameters, Workflow, WorkflowError,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// File name of the generated pipeline script inside the working directory
pub const PIPELINE_SCRIPT: &str = "main.nf";

/// File name of the global parameter file handed to the engine
pub const PARAMS_FILE: &str = "params.json";

/// Compiles a workflow into a Nextflow DSL2 script and hands it to the engine.
pub struct PipelineBackend {
    workdir: PathBuf,
    engine: String,
    events: EventEmitter,
}

impl PipelineBackend {
    pub fn new(workdir: impl Into<PathBuf>, engine: impl Into<String>, events: EventEmitter) -> Self {
        Self {
            workdir: workdir.into(),
            engine: engine.into(),
            events,
        }
    }

    pub fn script_path(&self) -> PathBuf {
        self.workdir.join(PIPELINE_SCRIPT)
    }

    pub fn params_path(&self) -> PathBuf {
        self.workdir.join(PARAMS_FILE)
    }

    /// Generate the script this backend would run, without writing anything.
    pub fn render(&self, workflow: &Workflow, parameters: &Parameters) -> Result<String, FlowError> {
        render_pipeline(&self.workdir, workflow, parameters)
    }

    async fn run_engine(&self, script: &Path, params_file: Option<&Path>) -> Result<(), FlowError> {
        // The engine may carry leading arguments, e.g. "nextflow -q"
        let mut parts = self.engine.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| FlowError::Execution("Pipeline engine command is empty".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(parts).arg("run").arg(script);
        if let Some(params_file) = params_file {
            cmd.arg("-params-file").arg(params_file);
        }
        cmd.current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::info!("Running pipeline engine: {} run {}", self.engine, script.display());
        let output = cmd.output().await.map_err(|e| {
            FlowError::Execution(format!("Failed to launch pipeline engine '{}': {}", self.engine, e))
        })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            tracing::info!("[{}] {}", self.engine, line);
        }

        if !output.status.success() {
            return Err(FlowError::EngineFailed {
                engine: self.engine.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for PipelineBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Pipeline
    }

    async fn execute(&self, workflow: &Workflow, parameters: &Parameters) -> Result<(), FlowError> {
        prepare_workdir(&self.workdir).await?;

        let script = self.render(workflow, parameters)?;
        let script_path = absolute_path(&self.script_path());
        tokio::fs::write(&script_path, script).await?;
        tracing::info!("Pipeline script written to {}", script_path.display());
        self.events.script_generated(&script_path);

        let params_file = if parameters.is_empty() {
            None
        } else {
            let path = absolute_path(&self.params_path());
            tokio::fs::write(&path, serde_json::to_vec_pretty(parameters)?).await?;
            Some(path)
        };

        self.run_engine(&script_path, params_file.as_deref()).await?;
        tracing::info!("Pipeline workflow '{}' completed successfully", workflow.id);
        Ok(())
    }
}

/// Script a pipeline backend working in `workdir` would generate.
///
/// Non-empty `parameters` make every process reference the absolute path
/// of `<workdir>/params.json`.
pub fn render_pipeline(
    workdir: &Path,
    workflow: &Workflow,
    parameters: &Parameters,
) -> Result<String, FlowError> {
    let params_file = if parameters.is_empty() {
        None
    } else {
        Some(absolute_path(&workdir.join(PARAMS_FILE)))
    };
    generate_script(workflow, params_file.as_deref())
}

fn result_var(module_id: &str) -> String {
    format!("{}_out", module_id)
}

/// Generate a Nextflow DSL2 script for `workflow`.
///
/// Output is a pure function of the workflow: input ports and call
/// arguments are sorted by destination port, processes follow declaration
/// order and the wiring block follows execution order.
pub fn generate_script(workflow: &Workflow, params_file: Option<&Path>) -> Result<String, FlowError> {
    let graph = workflow.dependency_graph()?;

    let mut processes = Vec::with_capacity(graph.len());
    for module_id in graph.module_ids() {
        let module = workflow
            .module(module_id)
            .ok_or_else(|| WorkflowError::UnknownModule {
                module: module_id.to_string(),
            })?;
        processes.push(render_process(workflow, module, params_file)?);
    }

    let mut wiring = Vec::with_capacity(graph.len());
    for module_id in graph.topological_order()? {
        let args: BTreeMap<&str, String> = workflow
            .incoming(&module_id)
            .map(|conn| {
                (
                    conn.to.input.as_str(),
                    format!("{}.{}", result_var(&conn.from.module), conn.from.output),
                )
            })
            .collect();
        let args: Vec<&str> = args.values().map(String::as_str).collect();

        wiring.push(format!(
            "    {} = {}({})",
            result_var(&module_id),
            module_id,
            args.join(", ")
        ));
    }

    Ok(format!(
        "nextflow.enable.dsl=2\n\nworkflow {{\n{}\n}}\n\n{}",
        wiring.join("\n"),
        processes.join("\n")
    ))
}

fn render_process(
    workflow: &Workflow,
    module: &ModuleDescriptor,
    params_file: Option<&Path>,
) -> Result<String, FlowError> {
    let script = module.require_script_path()?;
    let inputs: BTreeSet<&str> = workflow
        .incoming(&module.id)
        .map(|conn| conn.to.input.as_str())
        .collect();

    let mut command = format!("{} {}", module.executable, script.display());
    for port in &inputs {
        command.push_str(&format!(" --input {} ${{{}}}", port, port));
    }
    if let Some(params_file) = params_file {
        command.push_str(&format!(" --params {}", params_file.display()));
    }
    command.push_str(" --output_dir .");

    let mut block = format!("process {} {{\n", module.id);
    if !inputs.is_empty() {
        block.push_str("    input:\n");
        for port in &inputs {
            block.push_str(&format!("        path({})\n", port));
        }
    }
    if !module.output_ports.is_empty() {
        block.push_str("    output:\n");
        for port in &module.output_ports {
            block.push_str(&format!(
                "        path \"{}\", emit: {}\n",
                ModuleDescriptor::output_file_name(port),
                port
            ));
        }
    }
    block.push_str("    script:\n");
    block.push_str("    \"\"\"\n");
    block.push_str(&format!("    {}\n", command));
    block.push_str("    \"\"\"\n");
    block.push_str("}\n");

    Ok(block)
}
