use std::path::PathBuf;

use tracing::{info, warn};

use crate::consts::MODEL_VERSION;
use crate::error::{FringeError, Result};
use crate::io::folder::{list_fits, FitsFolder};
use crate::io::region::read_region_file;
use crate::model::{make_model, FringeModel, ModelProvenance};
use crate::remove::{is_corrected, remove_batch, FringeRemover};
use crate::setup::{ModelConfig, RemovalConfig, RemovalTarget};
use crate::stack::sampling::{
    build_samples_with_progress, resolve_sample_count, sampling_rng, FrameSource,
};

use super::types::{ModelOutput, PipelineStage, ProgressReporter, RemovalOutput};

/// Build a fringe model from a folder of exposures and save it.
///
/// Aborts on a missing folder, an empty batch, or mixed image shapes.
pub fn run_model_pipeline(
    config: &ModelConfig,
    reporter: &dyn ProgressReporter,
) -> Result<ModelOutput> {
    if !config.image_folder.is_dir() {
        return Err(FringeError::MissingInput(format!(
            "image folder {}",
            config.image_folder.display()
        )));
    }

    reporter.begin_stage(PipelineStage::Scanning, None);
    let folder = FitsFolder::scan(&config.image_folder)?;
    info!(
        images = folder.len(),
        skipped = folder.skipped().len(),
        folder = %config.image_folder.display(),
        "Scanned image folder"
    );
    reporter.finish_stage();

    if folder.is_empty() {
        return Err(FringeError::EmptySequence);
    }

    let samples_total = resolve_sample_count(config.sample_count, folder.len());
    reporter.begin_stage(PipelineStage::Sampling, Some(samples_total));
    let mut rng = sampling_rng(config.seed);
    let samples = build_samples_with_progress(&folder, config.sample_count, &mut rng, |done| {
        reporter.advance(done)
    })?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Modeling, None);
    let source = config.image_folder.display().to_string();
    let model = make_model(
        &samples.fringe_maps,
        ModelProvenance {
            version: MODEL_VERSION.to_string(),
            source,
            sample_count: samples.sample_count,
            seed: config.seed,
        },
    )?;
    reporter.finish_stage();

    reporter.begin_stage(PipelineStage::Writing, None);
    model.save(&config.model_name)?;
    reporter.finish_stage();

    Ok(ModelOutput {
        path: config.model_name.clone(),
        provenance: model.provenance().clone(),
        shape: model.shape(),
        images: folder.len() - samples.skipped,
        skipped: folder.skipped().len() + samples.skipped,
    })
}

/// Correct one image or a folder of images with an existing model.
///
/// Missing model, control pairs or target abort before any image is
/// touched. Failures on individual images are counted and skipped.
pub fn run_removal_pipeline(
    config: &RemovalConfig,
    reporter: &dyn ProgressReporter,
) -> Result<RemovalOutput> {
    if !config.model_name.is_file() {
        return Err(FringeError::MissingInput(format!(
            "model {}",
            config.model_name.display()
        )));
    }
    if !config.control_pairs.is_file() {
        return Err(FringeError::MissingInput(format!(
            "control pairs {}",
            config.control_pairs.display()
        )));
    }

    reporter.begin_stage(PipelineStage::Scanning, None);
    let model = FringeModel::load(&config.model_name)?;
    let pairs = read_region_file(&config.control_pairs)?;
    let radius = config.box_radius();

    let outside = pairs.out_of_bounds(model.shape(), radius);
    if !outside.is_empty() {
        warn!(
            pairs = ?outside,
            box_width = 2 * radius + 1,
            "Control pairs whose boxes leave the image are ignored"
        );
    }

    let targets: Vec<PathBuf> = match &config.target {
        RemovalTarget::Image(path) => {
            if !path.is_file() {
                return Err(FringeError::MissingInput(format!("image {}", path.display())));
            }
            vec![path.clone()]
        }
        RemovalTarget::Folder(dir) => {
            if !dir.is_dir() {
                return Err(FringeError::MissingInput(format!("folder {}", dir.display())));
            }
            list_fits(dir)?
                .into_iter()
                .filter(|p| !is_corrected(p))
                .collect()
        }
    };
    reporter.finish_stage();

    let remover = FringeRemover::new(
        &model,
        config.model_name.display().to_string(),
        &pairs,
        radius,
    )?;
    info!(
        images = targets.len(),
        pairs = pairs.len(),
        usable_pairs = remover.usable_pairs(),
        box_width = remover.box_width(),
        "Removing fringes"
    );

    reporter.begin_stage(PipelineStage::Correcting, Some(targets.len()));
    let summary = remove_batch(&remover, &targets, |done| reporter.advance(done));
    reporter.finish_stage();

    Ok(RemovalOutput {
        usable_pairs: remover.usable_pairs(),
        box_width: remover.box_width(),
        summary,
    })
}
