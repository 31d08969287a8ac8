//! Precomputed window tables: Hann overlap-add window and a triangular
//! transition window, per spec §4.2.

use std::f64::consts::PI;
use temposcale_core::Sample;

/// Hann window: `0.5 * (1 - cos(2*pi*k / (size - 1)))` for `k` in `[0, size)`.
pub fn hann_window(size: usize) -> Vec<Sample> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|k| {
            let v = 0.5 * (1.0 - (2.0 * PI * k as f64 / (size - 1) as f64).cos());
            v as Sample
        })
        .collect()
}

/// Triangular transition window: linear ramp 0->1 over the first half,
/// mirrored 1->0 over the second half. Biases the synthesized block toward
/// the geometric target at its center and toward the similarity-optimal
/// block at its edges.
pub fn transition_window(size: usize) -> Vec<Sample> {
    if size == 0 {
        return Vec::new();
    }
    let half = size / 2;
    (0..size)
        .map(|k| {
            let v = if k < half {
                k as f64 / half.max(1) as f64
            } else {
                1.0 - (k - half) as f64 / half.max(1) as f64
            };
            v as Sample
        })
        .collect()
}
