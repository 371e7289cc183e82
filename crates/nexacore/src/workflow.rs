use crate::error::WorkflowError;
use crate::graph::ModuleGraph;
use crate::module::ModuleDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub type ModuleId = String;

/// Workflow definition as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    #[serde(default = "default_workflow_id")]
    pub workflow_id: String,
    #[serde(default)]
    pub scale: String,
    #[serde(default)]
    pub indicator: String,
    #[serde(default)]
    pub accuracy: String,
    #[serde(default)]
    pub modules: Vec<ModuleRef>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

fn default_workflow_id() -> String {
    "unnamed".to_string()
}

/// Pointer to a module definition file, relative to the workflow file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRef {
    #[serde(rename = "ref")]
    pub reference: String,
}

/// Data dependency: an output port of one module feeds an input port of another.
///
/// Ports are not checked against the modules' declared ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub from: OutputPort,
    pub to: InputPort,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPort {
    pub module: ModuleId,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPort {
    pub module: ModuleId,
    pub input: String,
}

impl Connection {
    pub fn new(
        from_module: impl Into<String>,
        output: impl Into<String>,
        to_module: impl Into<String>,
        input: impl Into<String>,
    ) -> Self {
        Self {
            from: OutputPort {
                module: from_module.into(),
                output: output.into(),
            },
            to: InputPort {
                module: to_module.into(),
                input: input.into(),
            },
        }
    }
}

/// A concrete workflow: loaded modules plus the connections between them.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub id: String,
    pub scale: String,
    pub indicator: String,
    pub accuracy: String,
    pub modules: Vec<ModuleDescriptor>,
    pub connections: Vec<Connection>,
    module_map: HashMap<ModuleId, usize>,
}

impl Workflow {
    /// Load a workflow file and every module it references.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| WorkflowError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let definition: WorkflowDefinition =
            serde_json::from_str(&raw).map_err(|source| WorkflowError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::from_definition(definition, base_dir)
    }

    /// Build a workflow from an already parsed definition, resolving module
    /// references against `base_dir`.
    pub fn from_definition(
        definition: WorkflowDefinition,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, WorkflowError> {
        let base_dir = base_dir.into();

        let mut modules = Vec::with_capacity(definition.modules.len());
        for module_ref in &definition.modules {
            let module = ModuleDescriptor::load(base_dir.join(&module_ref.reference)).map_err(
                |source| WorkflowError::ModuleRef {
                    reference: module_ref.reference.clone(),
                    source,
                },
            )?;
            modules.push(module);
        }

        Ok(Self::from_modules(
            definition.workflow_id,
            modules,
            definition.connections,
        )
        .with_metadata(definition.scale, definition.indicator, definition.accuracy))
    }

    /// Assemble a workflow from descriptors that are already in memory.
    pub fn from_modules(
        id: impl Into<String>,
        modules: Vec<ModuleDescriptor>,
        connections: Vec<Connection>,
    ) -> Self {
        let mut module_map = HashMap::with_capacity(modules.len());
        for (index, module) in modules.iter().enumerate() {
            if module_map.insert(module.id.clone(), index).is_some() {
                tracing::warn!("Duplicate module id '{}', the later definition wins", module.id);
            }
        }

        Self {
            id: id.into(),
            scale: String::new(),
            indicator: String::new(),
            accuracy: String::new(),
            modules,
            connections,
            module_map,
        }
    }

    fn with_metadata(mut self, scale: String, indicator: String, accuracy: String) -> Self {
        self.scale = scale;
        self.indicator = indicator;
        self.accuracy = accuracy;
        self
    }

    pub fn module(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.module_map.get(id).map(|&index| &self.modules[index])
    }

    /// Connections terminating at `module_id`, in declaration order.
    pub fn incoming<'a>(&'a self, module_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections
            .iter()
            .filter(move |conn| conn.to.module == module_id)
    }

    pub fn dependency_graph(&self) -> Result<ModuleGraph, WorkflowError> {
        ModuleGraph::from_workflow(self)
    }

    /// Module ids ordered so every producer precedes its consumers.
    pub fn execution_order(&self) -> Result<Vec<ModuleId>, WorkflowError> {
        self.dependency_graph()?.topological_order()
    }
}
