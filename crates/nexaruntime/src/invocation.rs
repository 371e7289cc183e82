use nexacore::{ModuleError, ModuleId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Build the argument vector for one module run:
/// `<executable> <script> [--input <port> <path>]... [--params <file>] --output_dir <dir>`
pub fn command_line(
    executable: &str,
    script: &Path,
    inputs: &BTreeMap<String, PathBuf>,
    params_file: Option<&Path>,
    output_dir: &Path,
) -> Vec<String> {
    let mut command = vec![executable.to_string(), path_arg(script)];

    for (port, path) in inputs {
        command.push("--input".to_string());
        command.push(port.clone());
        command.push(path_arg(path));
    }

    if let Some(params_file) = params_file {
        command.push("--params".to_string());
        command.push(path_arg(params_file));
    }

    command.push("--output_dir".to_string());
    command.push(path_arg(output_dir));
    command
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Captured result of a successful module run
#[derive(Debug, Clone)]
pub struct ModuleOutput {
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

/// A fully prepared subprocess call for one module
#[derive(Debug, Clone)]
pub struct ModuleInvocation {
    pub module_id: ModuleId,
    pub command: Vec<String>,
}

impl ModuleInvocation {
    pub fn new(module_id: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            module_id: module_id.into(),
            command,
        }
    }

    /// Command line joined for display
    pub fn display(&self) -> String {
        self.command.join(" ")
    }

    /// Run the module to completion, or until `cancel` fires.
    ///
    /// Output is captured; a nonzero exit is reported with both streams.
    pub async fn run(&self, cancel: CancellationToken) -> Result<ModuleOutput, ModuleError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(ModuleError::MissingScript(self.module_id.clone()));
        };

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let start = Instant::now();
        let child = cmd.spawn().map_err(|source| ModuleError::Process {
            module: self.module_id.clone(),
            source,
        })?;

        let output = tokio::select! {
            output = child.wait_with_output() => output.map_err(|source| ModuleError::Process {
                module: self.module_id.clone(),
                source,
            })?,
            _ = cancel.cancelled() => {
                tracing::warn!("Module {} cancelled", self.module_id);
                return Err(ModuleError::Cancelled(self.module_id.clone()));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(ModuleError::ExecutionFailed {
                module: self.module_id.clone(),
                status: output.status,
                stdout,
                stderr,
            });
        }

        Ok(ModuleOutput {
            stdout,
            stderr,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
