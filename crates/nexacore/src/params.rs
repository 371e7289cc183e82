use crate::FlowError;
use serde::Deserialize;
use std::path::Path;

/// Named parameter values handed to a module. Keys are kept sorted so
/// serialized parameter files are stable across runs.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// Apply `overrides` on top of `defaults`.
///
/// Only keys already present in `defaults` are replaced; keys that exist
/// only in `overrides` are dropped.
pub fn merge_overrides(defaults: &Parameters, overrides: &Parameters) -> Parameters {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        if let Some(slot) = merged.get_mut(key) {
            *slot = value.clone();
        }
    }
    merged
}

#[derive(Deserialize)]
struct GlobalParameterFile {
    #[serde(default)]
    parameters: Option<serde_json::Value>,
}

/// Load the `parameters` object of a global parameter (simulation) file.
///
/// A missing path or a file that does not exist yields an empty set.
pub fn load_global_parameters(path: Option<&Path>) -> Result<Parameters, FlowError> {
    let Some(path) = path else {
        return Ok(Parameters::new());
    };
    if !path.exists() {
        tracing::debug!("Parameter file {} not found, using no global parameters", path.display());
        return Ok(Parameters::new());
    }

    let raw = std::fs::read_to_string(path)?;
    let file: GlobalParameterFile = serde_json::from_str(&raw)?;

    match file.parameters {
        None | Some(serde_json::Value::Null) => Ok(Parameters::new()),
        Some(serde_json::Value::Object(map)) => Ok(map),
        Some(other) => Err(FlowError::Execution(format!(
            "'parameters' in {} must be a JSON object, got {}",
            path.display(),
            other
        ))),
    }
}
