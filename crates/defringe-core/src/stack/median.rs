use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{FringeError, Result};

/// Stack layers by computing the median at each pixel position.
///
/// Uses `select_nth_unstable` for O(n) median without full sort.
/// Parallelizes at the row level for images >= 256x256.
pub fn median_stack(layers: &[Array2<f32>]) -> Result<Array2<f32>> {
    if layers.is_empty() {
        return Err(FringeError::EmptySequence);
    }

    let (h, w) = layers[0].dim();
    let n = layers.len();

    if let Some((i, layer)) = layers.iter().enumerate().find(|(_, l)| l.dim() != (h, w)) {
        return Err(FringeError::ShapeMismatch {
            name: format!("layer {}", i),
            expected: (h, w),
            found: layer.dim(),
        });
    }

    if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        // Row-parallel: each row allocates its own pixel_values
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| {
                let mut pixel_values = vec![0.0f32; n];
                let mut row_result = vec![0.0f32; w];
                for (col, result) in row_result.iter_mut().enumerate() {
                    for (i, layer) in layers.iter().enumerate() {
                        pixel_values[i] = layer[[row, col]];
                    }
                    *result = compute_median(&mut pixel_values);
                }
                row_result
            })
            .collect();

        let mut result = Array2::<f32>::zeros((h, w));
        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
        Ok(result)
    } else {
        // Sequential for small images
        let mut result = Array2::<f32>::zeros((h, w));
        let mut pixel_values = vec![0.0f32; n];

        for row in 0..h {
            for col in 0..w {
                for (i, layer) in layers.iter().enumerate() {
                    pixel_values[i] = layer[[row, col]];
                }
                result[[row, col]] = compute_median(&mut pixel_values);
            }
        }
        Ok(result)
    }
}

/// Median of every pixel in `data`.
pub fn array_median(data: &Array2<f32>) -> Option<f32> {
    if data.is_empty() {
        return None;
    }
    let mut values: Vec<f32> = data.iter().copied().collect();
    Some(compute_median(&mut values))
}

/// Median of a scalar sample; `None` when empty. Reorders `values`.
pub fn median_f64(values: &mut [f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    let mid = n / 2;
    values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
    if n % 2 == 1 {
        Some(values[mid])
    } else {
        let lower = values[..mid]
            .iter()
            .copied()
            .max_by(|a, b| a.total_cmp(b))?;
        Some((lower + values[mid]) / 2.0)
    }
}

fn compute_median(pixel_values: &mut [f32]) -> f32 {
    let n = pixel_values.len();
    if n == 1 {
        pixel_values[0]
    } else if n % 2 == 1 {
        let mid = n / 2;
        *pixel_values
            .select_nth_unstable_by(mid, |a, b| a.total_cmp(b))
            .1
    } else {
        let mid = n / 2;
        pixel_values.select_nth_unstable_by(mid, |a, b| a.total_cmp(b));
        pixel_values[..mid].select_nth_unstable_by(mid - 1, |a, b| a.total_cmp(b));
        (pixel_values[mid - 1] + pixel_values[mid]) / 2.0
    }
}
