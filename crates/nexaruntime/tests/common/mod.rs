// crates/nexaruntime/tests/common/mod.rs

#![allow(dead_code)]

use nexacore::{EventBus, EventEmitter, ExecutionId, Workflow};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Shell prologue every test module starts with: sets `$out` to the
/// `--output_dir` argument and records all arguments in `$out/args.txt`.
pub const PROLOGUE: &str = r#"prev=""
out=""
for arg in "$@"; do
  if [ "$prev" = "--output_dir" ]; then out="$arg"; fi
  prev="$arg"
done
printf '%s\n' "$@" > "$out/args.txt"
"#;

/// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

pub fn emitter() -> (EventBus, EventEmitter) {
    let bus = EventBus::new(100);
    let emitter = bus.create_emitter(ExecutionId::new_v4());
    (bus, emitter)
}

/// Scratch directory holding module definitions, scripts and a workflow file
pub struct Fixture {
    pub dir: TempDir,
    modules: Vec<String>,
    connections: Vec<serde_json::Value>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            modules: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn workdir(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Add a module run by `sh`; `body` is appended to [`PROLOGUE`].
    pub fn shell_module(
        &mut self,
        id: &str,
        body: &str,
        outputs: &[&str],
        parameters: serde_json::Value,
    ) -> &mut Self {
        let module_dir = self.dir.path().join("modules");
        fs::create_dir_all(module_dir.join("scripts")).unwrap();
        fs::write(
            module_dir.join("scripts").join(format!("{}.sh", id)),
            format!("{}{}", PROLOGUE, body),
        )
        .unwrap();
        self.definition(
            id,
            json!({
                "id": id,
                "executable": "sh",
                "script": format!("scripts/{}.sh", id),
                "output_ports": outputs,
                "parameters": parameters,
            }),
        )
    }

    /// Add a module from a raw definition
    pub fn definition(&mut self, id: &str, definition: serde_json::Value) -> &mut Self {
        let module_dir = self.dir.path().join("modules");
        fs::create_dir_all(&module_dir).unwrap();
        fs::write(
            module_dir.join(format!("{}.json", id)),
            serde_json::to_string_pretty(&definition).unwrap(),
        )
        .unwrap();
        self.modules.push(id.to_string());
        self
    }

    pub fn connect(&mut self, from: &str, output: &str, to: &str, input: &str) -> &mut Self {
        self.connections.push(json!({
            "from": { "module": from, "output": output },
            "to": { "module": to, "input": input },
        }));
        self
    }

    pub fn write_workflow(&self) -> PathBuf {
        let refs: Vec<_> = self
            .modules
            .iter()
            .map(|id| json!({ "ref": format!("modules/{}.json", id) }))
            .collect();
        let path = self.dir.path().join("workflow.json");
        fs::write(
            &path,
            serde_json::to_string_pretty(&json!({
                "workflow_id": "fixture",
                "modules": refs,
                "connections": self.connections,
            }))
            .unwrap(),
        )
        .unwrap();
        path
    }

    pub fn load(&self) -> Workflow {
        Workflow::from_file(self.write_workflow()).unwrap()
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }
}

pub fn read_lines(path: impl AsRef<Path>) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn params(value: serde_json::Value) -> nexacore::Parameters {
    value.as_object().cloned().unwrap_or_default()
}
