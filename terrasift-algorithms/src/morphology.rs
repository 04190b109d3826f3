//! Grayscale morphology on row-major rasters, using a diamond (Manhattan distance) structuring element.
//!
//! A diamond of radius `r` is applied as `r` successive passes with the 4-neighbor cross. Every pass
//! reads the previous raster and writes a new one.

use rayon::prelude::*;

/// Replaces every cell with the minimum over the diamond of the given radius around it, clipped to the
/// raster
pub fn erode(raster: &[f64], cols: usize, radius: usize) -> Vec<f64> {
    repeat_cross_pass(raster, cols, radius, f64::min)
}

/// Replaces every cell with the maximum over the diamond of the given radius around it, clipped to the
/// raster
pub fn dilate(raster: &[f64], cols: usize, radius: usize) -> Vec<f64> {
    repeat_cross_pass(raster, cols, radius, f64::max)
}

/// Morphological opening: erosion followed by dilation with the same radius
pub fn open(raster: &[f64], cols: usize, radius: usize) -> Vec<f64> {
    dilate(&erode(raster, cols, radius), cols, radius)
}

fn repeat_cross_pass(
    raster: &[f64],
    cols: usize,
    radius: usize,
    combine: fn(f64, f64) -> f64,
) -> Vec<f64> {
    let mut current = raster.to_vec();
    for _ in 0..radius {
        current = cross_pass(&current, cols, combine);
    }
    current
}

fn cross_pass(raster: &[f64], cols: usize, combine: fn(f64, f64) -> f64) -> Vec<f64> {
    if cols == 0 {
        return vec![];
    }
    let rows = raster.len() / cols;
    let mut result = vec![0.0; raster.len()];
    result
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(row, target)| {
            let at = |row: usize, col: usize| raster[row * cols + col];
            for (col, value) in target.iter_mut().enumerate() {
                let mut combined = at(row, col);
                if col > 0 {
                    combined = combine(combined, at(row, col - 1));
                }
                if col + 1 < cols {
                    combined = combine(combined, at(row, col + 1));
                }
                if row > 0 {
                    combined = combine(combined, at(row - 1, col));
                }
                if row + 1 < rows {
                    combined = combine(combined, at(row + 1, col));
                }
                *value = combined;
            }
        });
    result
}
