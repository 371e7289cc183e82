//! Workflow execution runtime
//!
//! This crate provides the backends that run a loaded workflow, the
//! ready-queue executor behind the local backend, and the `Runner`
//! that ties loading, backend selection and execution together.

mod backend;
pub mod backends;
mod executor;
mod invocation;
mod runtime;

pub use backend::{Backend, BackendKind, ExecutionBackend};
pub use backends::{LocalBackend, PipelineBackend, RemoteBackend};
pub use executor::DagExecutor;
pub use invocation::{command_line, ModuleInvocation, ModuleOutput};
pub use runtime::{RunReport, Runner, RuntimeConfig};
