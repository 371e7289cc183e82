use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    #[error("Pipeline engine '{engine}' exited with {status}:\n{stderr}")]
    EngineFailed {
        engine: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Failed to read module definition {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid module definition {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Script not found for module '{module}': {path}")]
    ScriptNotFound { module: String, path: PathBuf },

    #[error("Module '{0}' has no script defined")]
    MissingScript(String),

    #[error("Process error in module '{module}': {source}")]
    Process {
        module: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Module {module} failed ({status}):\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    ExecutionFailed {
        module: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("Module '{0}' was cancelled")]
    Cancelled(String),
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Failed to read workflow {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid workflow {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot load module reference '{reference}': {source}")]
    ModuleRef {
        reference: String,
        #[source]
        source: ModuleError,
    },

    #[error("Connection references unknown module: {module}")]
    UnknownModule { module: String },

    #[error("Workflow contains a cycle involving: {}", modules.join(", "))]
    CyclicDependency { modules: Vec<String> },
}
