use ndarray::Array2;

use defringe_core::error::{FringeError, Result};
use defringe_core::frame::Frame;
use defringe_core::model::build_model;
use defringe_core::stack::median::array_median;
use defringe_core::stack::sampling::{
    build_samples, build_samples_with_progress, partition_round_robin, resolve_sample_count,
    sampling_rng, FrameSource,
};

mod common;

fn offset_frames(n: usize, rows: usize, cols: usize) -> Vec<Frame> {
    let pattern = common::fringe_pattern(rows, cols);
    (0..n)
        .map(|i| Frame::new(&pattern * (1.0 + i as f32 * 0.1) + 100.0 * i as f32))
        .collect()
}

// ---------------------------------------------------------------------------
// Partitioning
// ---------------------------------------------------------------------------

#[test]
fn test_partition_nine_into_three() {
    let subsets = partition_round_robin(9, 3);
    assert_eq!(
        subsets,
        vec![vec![0, 3, 6], vec![1, 4, 7], vec![2, 5, 8]]
    );
}

#[test]
fn test_partition_covers_every_image_once() {
    for n in 1..=12 {
        for k in 1..=n {
            let subsets = partition_round_robin(n, k);
            assert_eq!(subsets.len(), k);
            let mut seen: Vec<usize> = subsets.iter().flatten().copied().collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..n).collect::<Vec<_>>(), "n={n} k={k}");
            assert!(subsets.iter().all(|s| !s.is_empty()), "n={n} k={k}");
        }
    }
}

#[test]
fn test_partition_uneven_sizes() {
    let sizes: Vec<usize> = partition_round_robin(10, 3).iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![4, 3, 3]);
}

#[test]
fn test_resolve_sample_count() {
    assert_eq!(resolve_sample_count(None, 7), 7);
    assert_eq!(resolve_sample_count(Some(0), 7), 7);
    assert_eq!(resolve_sample_count(Some(3), 7), 3);
    assert_eq!(resolve_sample_count(Some(7), 7), 7);
    assert_eq!(resolve_sample_count(Some(20), 7), 7);
}

// ---------------------------------------------------------------------------
// build_samples
// ---------------------------------------------------------------------------

#[test]
fn test_nine_images_three_samples() {
    let frames: Vec<Frame> = (0..9)
        .map(|i| Frame::new(Array2::from_elem((4, 4), i as f32)))
        .collect();
    let mut rng = sampling_rng(Some(1));
    let samples = build_samples(frames.as_slice(), Some(3), &mut rng).unwrap();

    assert_eq!(samples.sample_count, 3);
    assert_eq!(samples.fringe_maps.len(), 3);
    assert_eq!(samples.skipped, 0);
    for map in &samples.fringe_maps {
        assert_eq!(map.dim(), (4, 4));
    }
}

#[test]
fn test_zero_and_none_mean_one_per_image() {
    let frames = offset_frames(4, 6, 6);
    for requested in [None, Some(0)] {
        let mut rng = sampling_rng(Some(5));
        let samples = build_samples(frames.as_slice(), requested, &mut rng).unwrap();
        assert_eq!(samples.sample_count, 4);
        assert_eq!(samples.fringe_maps.len(), 4);
    }
}

#[test]
fn test_oversized_request_is_clamped() {
    let frames = offset_frames(3, 6, 6);
    let mut rng = sampling_rng(Some(5));
    let samples = build_samples(frames.as_slice(), Some(10), &mut rng).unwrap();
    assert_eq!(samples.sample_count, 3);
    assert_eq!(samples.fringe_maps.len(), 3);
}

#[test]
fn test_background_is_subtracted() {
    // Same pattern on very different sky levels: every centred image is equal.
    let pattern = common::fringe_pattern(16, 16);
    let frames: Vec<Frame> = (0..6)
        .map(|i| Frame::new(&pattern + 1000.0 * i as f32))
        .collect();
    let expected = &pattern - array_median(&pattern).unwrap();

    let mut rng = sampling_rng(Some(9));
    let samples = build_samples(frames.as_slice(), Some(2), &mut rng).unwrap();
    for map in &samples.fringe_maps {
        for (a, b) in map.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-3, "{a} vs {b}");
        }
    }
}

#[test]
fn test_shape_mismatch_is_fatal() {
    let mut frames = offset_frames(3, 6, 6);
    frames.push(Frame::new(Array2::zeros((6, 7))));
    let mut rng = sampling_rng(Some(2));
    let result = build_samples(frames.as_slice(), None, &mut rng);
    match result {
        Err(FringeError::ShapeMismatch {
            expected, found, ..
        }) => {
            assert_eq!(expected, (6, 6));
            assert_eq!(found, (6, 7));
        }
        other => panic!("expected ShapeMismatch, got {other:?}"),
    }
}

#[test]
fn test_empty_source_is_error() {
    let frames: Vec<Frame> = Vec::new();
    let mut rng = sampling_rng(Some(2));
    let result = build_samples(frames.as_slice(), None, &mut rng);
    assert!(matches!(result, Err(FringeError::EmptySequence)));
}

#[test]
fn test_same_seed_same_samples() {
    let frames = offset_frames(10, 8, 8);

    let mut rng_a = sampling_rng(Some(42));
    let a = build_samples(frames.as_slice(), Some(3), &mut rng_a).unwrap();
    let mut rng_b = sampling_rng(Some(42));
    let b = build_samples(frames.as_slice(), Some(3), &mut rng_b).unwrap();

    assert_eq!(a.fringe_maps, b.fringe_maps);
}

#[test]
fn test_progress_reports_each_sample() {
    let frames = offset_frames(6, 4, 4);
    let mut rng = sampling_rng(Some(3));
    let mut reported = Vec::new();
    build_samples_with_progress(frames.as_slice(), Some(3), &mut rng, |done| {
        reported.push(done)
    })
    .unwrap();
    assert_eq!(reported, vec![1, 2, 3]);
}

/// In-memory images where one index cannot be read.
struct OneUnreadable {
    frames: Vec<Frame>,
    broken: usize,
}

impl FrameSource for OneUnreadable {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn name(&self, index: usize) -> String {
        format!("image {index}")
    }

    fn shape(&self, index: usize) -> (usize, usize) {
        self.frames[index].data.dim()
    }

    fn load(&self, index: usize) -> Result<Array2<f32>> {
        if index == self.broken {
            Err(FringeError::InvalidFits("corrupt pixels".into()))
        } else {
            Ok(self.frames[index].data.clone())
        }
    }
}

#[test]
fn test_sample_count_excludes_empty_samples() {
    let source = OneUnreadable {
        frames: offset_frames(4, 6, 6),
        broken: 2,
    };
    let mut rng = sampling_rng(Some(8));
    let samples = build_samples(&source, None, &mut rng).unwrap();

    assert_eq!(samples.partitions, 4);
    assert_eq!(samples.fringe_maps.len(), 3);
    assert_eq!(samples.sample_count, 3);
    assert_eq!(samples.skipped, 1);

    let mut rng = sampling_rng(Some(8));
    let model = build_model(&source, "night", None, Some(8), &mut rng).unwrap();
    assert_eq!(model.provenance().sample_count, 3);
}
