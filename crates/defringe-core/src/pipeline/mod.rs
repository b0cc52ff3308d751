mod orchestrator;
mod types;

pub use orchestrator::{run_model_pipeline, run_removal_pipeline};
pub use types::{ModelOutput, NoOpReporter, PipelineStage, ProgressReporter, RemovalOutput};
