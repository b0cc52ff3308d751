use std::path::Path;

use ndarray::Array2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::consts::{
    MODEL_SAMPLES_KEY, MODEL_SEED_KEY, MODEL_SOURCE_KEY, MODEL_VERSION, MODEL_VERSION_KEY,
};
use crate::error::Result;
use crate::frame::Frame;
use crate::io::atomic::write_image;
use crate::io::fits::{CardValue, FitsHeader};
use crate::stack::median::median_stack;
use crate::stack::sampling::{build_samples, FrameSource};

/// Where a fringe model came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelProvenance {
    pub version: String,
    pub source: String,
    pub sample_count: usize,
    pub seed: Option<u64>,
}

/// Canonical-orientation fringe template. Immutable once built.
#[derive(Clone, Debug)]
pub struct FringeModel {
    data: Array2<f32>,
    provenance: ModelProvenance,
}

/// Median of the per-sample fringe maps.
///
/// Transient sources (stars, cosmic rays, trails) sit at a given pixel in
/// only a minority of samples and drop out; the fringe pattern, fixed on
/// the detector, survives.
pub fn make_model(fringe_maps: &[Array2<f32>], provenance: ModelProvenance) -> Result<FringeModel> {
    let data = median_stack(fringe_maps)?;
    Ok(FringeModel { data, provenance })
}

/// Sample `source` and reduce the samples to a model.
pub fn build_model<S, R>(
    source: &S,
    source_name: &str,
    sample_count: Option<usize>,
    seed: Option<u64>,
    rng: &mut R,
) -> Result<FringeModel>
where
    S: FrameSource + ?Sized,
    R: Rng + ?Sized,
{
    let samples = build_samples(source, sample_count, rng)?;
    make_model(
        &samples.fringe_maps,
        ModelProvenance {
            version: MODEL_VERSION.to_string(),
            source: source_name.to_string(),
            sample_count: samples.sample_count,
            seed,
        },
    )
}

impl FringeModel {
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn provenance(&self) -> &ModelProvenance {
        &self.provenance
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn header(&self) -> FitsHeader {
        let p = &self.provenance;
        let mut header = FitsHeader::new();
        header.set(MODEL_VERSION_KEY, CardValue::Str(p.version.clone()));
        header.set(MODEL_SOURCE_KEY, CardValue::Str(p.source.clone()));
        header.set(MODEL_SAMPLES_KEY, CardValue::Int(p.sample_count as i64));
        if let Some(seed) = p.seed {
            header.set(MODEL_SEED_KEY, CardValue::Str(seed.to_string()));
        }
        header.push_history(format!("model done with defringe (version {})", p.version));
        header.push_history(format!("using the image folder {}", p.source));
        header.push_history(format!("with {} image samples", p.sample_count));
        header
    }

    /// Persist as a FITS file, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_image(path, &self.data, &self.header())?;
        info!(path = %path.display(), "Fringe model saved");
        Ok(())
    }

    /// Load a model written by [`FringeModel::save`] or by another tool.
    ///
    /// Missing provenance keywords fall back to the file name and zero samples.
    pub fn load(path: &Path) -> Result<Self> {
        let frame = Frame::load(path)?;
        let header = &frame.header;
        let provenance = ModelProvenance {
            version: header
                .get_str(MODEL_VERSION_KEY)
                .unwrap_or("unknown")
                .to_string(),
            source: header
                .get_str(MODEL_SOURCE_KEY)
                .map(str::to_string)
                .unwrap_or_else(|| path.display().to_string()),
            sample_count: header
                .get_int(MODEL_SAMPLES_KEY)
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(0),
            seed: header
                .get(MODEL_SEED_KEY)
                .and_then(|s| s.to_string().parse().ok()),
        };
        Ok(Self {
            data: frame.data,
            provenance,
        })
    }
}
