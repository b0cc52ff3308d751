use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::consts::{CORRECTED_SUFFIX, RATIO_KEY, REMOVE_VERSION};
use crate::error::{FringeError, Result};
use crate::frame::Frame;
use crate::io::atomic::write_image;
use crate::io::fits::CardValue;
use crate::model::FringeModel;
use crate::orientation::{denormalize, normalize, PierSide};
use crate::ratio::{ControlPairs, RatioEstimator};

/// `<stem>_fringecor.fits` next to `source`.
pub fn corrected_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{}{}.fits", stem, CORRECTED_SUFFIX))
}

/// Whether `path` is already the output of a correction.
pub fn is_corrected(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(CORRECTED_SUFFIX))
}

/// Output of [`FringeRemover::correct`].
#[derive(Clone, Debug)]
pub struct Correction {
    /// Corrected frame, in the orientation of the input.
    pub frame: Frame,
    pub ratio: f64,
    pub pier_side: PierSide,
}

/// Subtracts a scaled fringe model from science frames.
///
/// Holds the model and control pairs read-only for the whole batch.
pub struct FringeRemover<'a> {
    model: &'a FringeModel,
    model_name: String,
    pairs: &'a ControlPairs,
    estimator: RatioEstimator,
}

impl<'a> FringeRemover<'a> {
    /// Fails when no control pair has a usable delta on the model, since
    /// then no image could be corrected.
    pub fn new(
        model: &'a FringeModel,
        model_name: impl Into<String>,
        pairs: &'a ControlPairs,
        box_radius: usize,
    ) -> Result<Self> {
        let estimator = RatioEstimator::new(model.data(), pairs.pairs(), box_radius);
        if estimator.usable_pairs() == 0 {
            return Err(FringeError::MissingInput(format!(
                "no control pair in {} has a usable delta on the model",
                pairs.source()
            )));
        }
        Ok(Self {
            model,
            model_name: model_name.into(),
            pairs,
            estimator,
        })
    }

    pub fn box_radius(&self) -> usize {
        self.estimator.radius()
    }

    pub fn box_width(&self) -> usize {
        2 * self.estimator.radius() + 1
    }

    pub fn usable_pairs(&self) -> usize {
        self.estimator.usable_pairs()
    }

    /// Correct one frame in memory.
    pub fn correct(&self, frame: Frame) -> Result<Correction> {
        let pier_side = frame.pier_side()?;
        if frame.data.dim() != self.model.shape() {
            return Err(FringeError::ShapeMismatch {
                name: frame.name(),
                expected: self.model.shape(),
                found: frame.data.dim(),
            });
        }

        let Frame {
            data,
            mut header,
            source,
        } = frame;

        let mut data = normalize(data, pier_side);
        let ratio = self.estimator.estimate(&data)?;
        data.scaled_add(-(ratio as f32), self.model.data());
        let data = denormalize(data, pier_side);

        header.push_history(format!(
            "fringing removed with defringe (version {})",
            REMOVE_VERSION
        ));
        header.push_history(format!("using the model {}", self.model_name));
        header.push_history(format!("using the control pairs {}", self.pairs.source()));
        header.push_history(format!(
            "mean done with a box width of {} pixels",
            self.box_width()
        ));
        if pier_side.requires_flip() {
            header.push_history("model applied after rotating the image to an 'EAST' pierside");
        }
        header.set(RATIO_KEY, CardValue::Float(ratio));

        Ok(Correction {
            frame: Frame {
                data,
                header,
                source,
            },
            ratio,
            pier_side,
        })
    }

    /// Read `path`, correct it and write the result next to it.
    pub fn remove_fringe(&self, path: &Path) -> Result<(PathBuf, f64)> {
        let frame = Frame::load(path)?;
        let correction = self.correct(frame)?;
        let output = corrected_path(path);
        write_image(&output, &correction.frame.data, &correction.frame.header)?;
        info!(
            source = %path.display(),
            output = %output.display(),
            ratio = correction.ratio,
            pier_side = %correction.pier_side,
            "Fringe removed"
        );
        Ok((output, correction.ratio))
    }
}

/// Outcome of a correction run.
#[derive(Clone, Debug, Default)]
pub struct BatchSummary {
    /// (output path, applied ratio) per corrected image.
    pub corrected: Vec<(PathBuf, f64)>,
    /// (source path, reason) per skipped image.
    pub skipped: Vec<(PathBuf, String)>,
}

/// Correct every image in turn. Per-image failures are logged and skipped.
///
/// `on_progress` is called with the number of images handled so far.
pub fn remove_batch<F>(
    remover: &FringeRemover<'_>,
    paths: &[PathBuf],
    mut on_progress: F,
) -> BatchSummary
where
    F: FnMut(usize),
{
    let mut summary = BatchSummary::default();

    for (i, path) in paths.iter().enumerate() {
        match remover.remove_fringe(path) {
            Ok(done) => summary.corrected.push(done),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping image");
                summary.skipped.push((path.clone(), e.to_string()));
            }
        }
        on_progress(i + 1);
    }

    summary
}
