//! The three execution strategies

mod local;
mod pipeline;
mod remote;

pub use local::LocalBackend;
pub use pipeline::{
    generate_script, render_pipeline, PipelineBackend, PARAMS_FILE, PIPELINE_SCRIPT,
};
pub use remote::RemoteBackend;

use nexacore::FlowError;
use std::path::Path;

/// Create a backend's working directory if it does not exist yet.
pub(crate) async fn prepare_workdir(workdir: &Path) -> Result<(), FlowError> {
    tokio::fs::create_dir_all(workdir).await?;
    Ok(())
}
