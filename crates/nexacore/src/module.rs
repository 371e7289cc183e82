use crate::error::ModuleError;
use crate::params::{merge_overrides, Parameters};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Interpreter used when a module definition does not name one.
pub const DEFAULT_EXECUTABLE: &str = "python";

/// Static definition of an external computational module.
///
/// Loaded from a JSON file; `script` is relative to the directory holding
/// that file and is only checked on disk by [`ModuleDescriptor::resolve_script_path`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: String,

    #[serde(default = "default_executable")]
    pub executable: String,

    #[serde(default)]
    pub script: Option<String>,

    /// Container image; reserved, no backend runs containers yet.
    #[serde(default)]
    pub container: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub input_ports: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub output_ports: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Parameters,

    #[serde(skip)]
    base_dir: PathBuf,
}

fn default_executable() -> String {
    DEFAULT_EXECUTABLE.to_string()
}

/// An explicit `null` reads the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ModuleDescriptor {
    /// Parse a module definition file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModuleError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ModuleError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut module: ModuleDescriptor =
            serde_json::from_str(&raw).map_err(|source| ModuleError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        module.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(module)
    }

    /// Absolute path of the module's script.
    ///
    /// Returns `Ok(None)` when no script is declared (container-only modules).
    pub fn resolve_script_path(&self) -> Result<Option<PathBuf>, ModuleError> {
        let Some(script) = &self.script else {
            return Ok(None);
        };

        let candidate = self.base_dir.join(script);
        match std::fs::canonicalize(&candidate) {
            Ok(resolved) if resolved.is_file() => Ok(Some(resolved)),
            _ => Err(ModuleError::ScriptNotFound {
                module: self.id.clone(),
                path: absolute_path(&candidate),
            }),
        }
    }

    /// Like [`resolve_script_path`](Self::resolve_script_path), but a missing
    /// declaration is an error too.
    pub fn require_script_path(&self) -> Result<PathBuf, ModuleError> {
        self.resolve_script_path()?
            .ok_or_else(|| ModuleError::MissingScript(self.id.clone()))
    }

    /// Defaults with global values applied to keys the module already declares.
    pub fn effective_parameters(&self, global: &Parameters) -> Parameters {
        merge_overrides(&self.parameters, global)
    }

    /// File name a module writes for an output port.
    pub fn output_file_name(port: &str) -> String {
        format!("{}.json", port)
    }
}

/// `path` made absolute against the current directory, without touching the filesystem.
pub fn absolute_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
