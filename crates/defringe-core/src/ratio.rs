use ndarray::{s, Array2};
use tracing::debug;

use crate::error::{FringeError, Result};
use crate::stack::median::median_f64;

/// A pixel position in canonical orientation, 0-indexed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelCoord {
    pub row: usize,
    pub col: usize,
}

impl PixelCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Two locations straddling a fringe feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlPair {
    pub bright: PixelCoord,
    pub dark: PixelCoord,
}

/// The control pairs of one region list, with the name of their source.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlPairs {
    pairs: Vec<ControlPair>,
    source: String,
}

impl ControlPairs {
    pub fn new(pairs: Vec<ControlPair>, source: impl Into<String>) -> Self {
        Self {
            pairs,
            source: source.into(),
        }
    }

    pub fn pairs(&self) -> &[ControlPair] {
        &self.pairs
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Indices of pairs with at least one box leaving an image of `shape`.
    pub fn out_of_bounds(&self, shape: (usize, usize), radius: usize) -> Vec<usize> {
        self.pairs
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                !box_in_bounds(shape, p.bright, radius) || !box_in_bounds(shape, p.dark, radius)
            })
            .map(|(i, _)| i)
            .collect()
    }
}

fn box_in_bounds(shape: (usize, usize), center: PixelCoord, radius: usize) -> bool {
    let (rows, cols) = shape;
    center.row >= radius
        && center.col >= radius
        && center.row.checked_add(radius).is_some_and(|end| end < rows)
        && center.col.checked_add(radius).is_some_and(|end| end < cols)
}

/// Mean of the `(2*radius+1)²` box centred on `center`, or `None` if the
/// box does not fit inside `data`.
pub fn box_mean(data: &Array2<f32>, center: PixelCoord, radius: usize) -> Option<f64> {
    if !box_in_bounds(data.dim(), center, radius) {
        return None;
    }
    let window = data.slice(s![
        center.row - radius..=center.row + radius,
        center.col - radius..=center.col + radius
    ]);
    let sum: f64 = window.iter().map(|&v| v as f64).sum();
    Some(sum / window.len() as f64)
}

/// Bright-end mean minus dark-end mean.
pub fn pair_delta(data: &Array2<f32>, pair: &ControlPair, radius: usize) -> Option<f64> {
    let bright = box_mean(data, pair.bright, radius)?;
    let dark = box_mean(data, pair.dark, radius)?;
    Some(bright - dark)
}

/// Scales the fringe model to a given image.
///
/// The model-side deltas are measured once and reused for every image.
/// Pairs whose model delta is zero or whose boxes leave the model are
/// dropped up front.
#[derive(Clone, Debug)]
pub struct RatioEstimator {
    model_deltas: Vec<(ControlPair, f64)>,
    radius: usize,
}

impl RatioEstimator {
    pub fn new(model: &Array2<f32>, pairs: &[ControlPair], radius: usize) -> Self {
        let model_deltas: Vec<(ControlPair, f64)> = pairs
            .iter()
            .filter_map(|pair| {
                let delta = pair_delta(model, pair, radius)?;
                (delta.is_finite() && delta != 0.0).then_some((*pair, delta))
            })
            .collect();
        debug!(
            usable = model_deltas.len(),
            total = pairs.len(),
            "Measured model control-pair deltas"
        );
        Self {
            model_deltas,
            radius,
        }
    }

    /// Number of pairs with a usable model delta.
    pub fn usable_pairs(&self) -> usize {
        self.model_deltas.len()
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    /// Median over pairs of `delta_image / delta_model`.
    pub fn estimate(&self, image: &Array2<f32>) -> Result<f64> {
        let mut ratios: Vec<f64> = self
            .model_deltas
            .iter()
            .filter_map(|(pair, model_delta)| {
                let image_delta = pair_delta(image, pair, self.radius)?;
                let ratio = image_delta / model_delta;
                ratio.is_finite().then_some(ratio)
            })
            .collect();

        median_f64(&mut ratios).ok_or(FringeError::NoValidControlPairs)
    }
}

/// One-shot ratio estimate. Prefer [`RatioEstimator`] when correcting many images.
pub fn estimate_ratio(
    model: &Array2<f32>,
    image: &Array2<f32>,
    pairs: &[ControlPair],
    radius: usize,
) -> Result<f64> {
    RatioEstimator::new(model, pairs, radius).estimate(image)
}
