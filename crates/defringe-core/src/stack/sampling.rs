use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::error::{FringeError, Result};
use crate::frame::Frame;
use crate::stack::median::{array_median, median_stack};

/// Random-access collection of canonical-orientation images.
///
/// `shape` must be cheap: it is queried for every image before any pixel
/// data is loaded.
pub trait FrameSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn name(&self, index: usize) -> String;

    /// (rows, cols) of image `index`.
    fn shape(&self, index: usize) -> (usize, usize);

    /// Pixels of image `index`, already in canonical orientation.
    fn load(&self, index: usize) -> Result<Array2<f32>>;
}

/// Frames held in memory are taken to be normalized already.
impl FrameSource for [Frame] {
    fn len(&self) -> usize {
        <[Frame]>::len(self)
    }

    fn name(&self, index: usize) -> String {
        self[index].name()
    }

    fn shape(&self, index: usize) -> (usize, usize) {
        self[index].data.dim()
    }

    fn load(&self, index: usize) -> Result<Array2<f32>> {
        Ok(self[index].data.clone())
    }
}

/// Per-sample median maps produced by [`build_samples`].
#[derive(Clone, Debug)]
pub struct SampleSet {
    pub fringe_maps: Vec<Array2<f32>>,
    /// Samples that produced a map, i.e. `fringe_maps.len()`.
    pub sample_count: usize,
    /// Subsets the images were dealt into, including any left empty.
    pub partitions: usize,
    /// Images dropped because their pixels could not be loaded.
    pub skipped: usize,
}

/// `None` or zero means one sample per image. Requests above the image
/// count are clamped so no sample is empty.
pub fn resolve_sample_count(requested: Option<usize>, image_count: usize) -> usize {
    match requested {
        None | Some(0) => image_count,
        Some(k) if k > image_count => {
            warn!(
                requested = k,
                images = image_count,
                "More samples requested than images, using one sample per image"
            );
            image_count
        }
        Some(k) => k,
    }
}

/// Interleave positions `0..n` into `k` subsets: position `i` goes to subset `i % k`.
pub fn partition_round_robin(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k == 0 {
        return Vec::new();
    }
    (0..k).map(|j| (j..n).step_by(k).collect()).collect()
}

/// Shuffle with a pinned seed when given, otherwise from OS entropy.
pub fn sampling_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

pub fn build_samples<S, R>(source: &S, sample_count: Option<usize>, rng: &mut R) -> Result<SampleSet>
where
    S: FrameSource + ?Sized,
    R: Rng + ?Sized,
{
    build_samples_with_progress(source, sample_count, rng, |_| {})
}

/// Split the images into samples and median-stack each one.
///
/// 1. Checks every image has the shape of the first (fatal otherwise)
/// 2. Shuffles the image order
/// 3. Deals the shuffled images round-robin into `sample_count` subsets
/// 4. Subtracts each image's own median as it is loaded
/// 5. Takes the per-pixel median of each subset
///
/// `on_progress` is called with the number of samples completed.
pub fn build_samples_with_progress<S, R, F>(
    source: &S,
    sample_count: Option<usize>,
    rng: &mut R,
    mut on_progress: F,
) -> Result<SampleSet>
where
    S: FrameSource + ?Sized,
    R: Rng + ?Sized,
    F: FnMut(usize),
{
    let n = source.len();
    if n == 0 {
        return Err(FringeError::EmptySequence);
    }

    let expected = source.shape(0);
    for i in 1..n {
        let found = source.shape(i);
        if found != expected {
            return Err(FringeError::ShapeMismatch {
                name: source.name(i),
                expected,
                found,
            });
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);

    let k = resolve_sample_count(sample_count, n);
    info!(
        images = n,
        samples = k,
        per_sample = n / k,
        "Building fringe samples"
    );

    let mut fringe_maps = Vec::with_capacity(k);
    let mut skipped = 0;

    for (id, positions) in partition_round_robin(n, k).into_iter().enumerate() {
        if id % 10 == 0 {
            debug!(sample = id, total = k, "Generating fringe sample");
        }

        let mut layers = Vec::with_capacity(positions.len());
        for idx in positions.into_iter().map(|p| order[p]) {
            match load_centered(source, idx, expected) {
                Ok(layer) => layers.push(layer),
                Err(e) if e.is_recoverable() => {
                    warn!(image = %source.name(idx), error = %e, "Skipping image");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if layers.is_empty() {
            warn!(sample = id, "Every image of the sample was skipped");
        } else {
            fringe_maps.push(median_stack(&layers)?);
        }
        on_progress(id + 1);
    }

    if fringe_maps.is_empty() {
        return Err(FringeError::EmptySequence);
    }

    if fringe_maps.len() < k {
        warn!(
            used = fringe_maps.len(),
            requested = k,
            "Some samples produced no fringe map"
        );
    }

    Ok(SampleSet {
        sample_count: fringe_maps.len(),
        partitions: k,
        fringe_maps,
        skipped,
    })
}

/// Load an image and subtract its own median (removes the sky background).
fn load_centered<S: FrameSource + ?Sized>(
    source: &S,
    index: usize,
    expected: (usize, usize),
) -> Result<Array2<f32>> {
    let mut data = source.load(index)?;
    if data.dim() != expected {
        return Err(FringeError::ShapeMismatch {
            name: source.name(index),
            expected,
            found: data.dim(),
        });
    }
    if let Some(median) = array_median(&data) {
        data -= median;
    }
    Ok(data)
}
