use std::path::PathBuf;

use crate::model::ModelProvenance;
use crate::remove::BatchSummary;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Scanning,
    Sampling,
    Modeling,
    Correcting,
    Writing,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanning => write!(f, "Scanning images"),
            Self::Sampling => write!(f, "Stacking samples"),
            Self::Modeling => write!(f, "Building model"),
            Self::Correcting => write!(f, "Removing fringes"),
            Self::Writing => write!(f, "Writing output"),
        }
    }
}

/// Result of a model-building run.
#[derive(Clone, Debug)]
pub struct ModelOutput {
    pub path: PathBuf,
    pub provenance: ModelProvenance,
    pub shape: (usize, usize),
    /// Images used to build the model.
    pub images: usize,
    /// Images left out (bad header, missing pier side, unreadable pixels).
    pub skipped: usize,
}

/// Result of a removal run.
#[derive(Clone, Debug)]
pub struct RemovalOutput {
    pub summary: BatchSummary,
    /// Control pairs with a usable delta on the model.
    pub usable_pairs: usize,
    pub box_width: usize,
}

/// Progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., image count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// Work items completed so far within the current stage.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter.
pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
