//! Core data model for the nexa workflow executor
//!
//! Module descriptors, workflow graphs and their dependency ordering,
//! parameter sets, errors and execution events. Nothing in here runs
//! a module; see `nexaruntime` for that.

mod error;
pub mod events;
mod graph;
mod module;
mod params;
mod workflow;

pub use error::{FlowError, ModuleError, WorkflowError};
pub use graph::ModuleGraph;
pub use module::{absolute_path, ModuleDescriptor, DEFAULT_EXECUTABLE};
pub use params::{load_global_parameters, merge_overrides, Parameters};
pub use workflow::{
    Connection, InputPort, ModuleId, ModuleRef, OutputPort, Workflow, WorkflowDefinition,
};
pub use events::*;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
