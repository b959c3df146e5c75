//! Synthetic stress histories for verification runs

use std::f64::consts::PI;

use crate::series::StressSeries;
use crate::tensor::{rotation_matrix, transform, StressTensor};

/// Sine wave on `s11`, rotated into the global frame
///
/// Sample `t` of the local tensor is
///
/// ```text
/// s11(t) = amplitude * sin(2π * frequency * t + phase)
/// ```
///
/// with all other components zero; the global tensor is `R·S·Rᵀ` with `R`
/// the two-angle rotation of `(theta, phi)`. `theta = 0, phi = π/2` gives the
/// identity rotation.
///
/// # Arguments
///
/// * `frequency` - cycles per sample
/// * `phase` - phase offset in radians
/// * `n` - number of samples
pub fn oscillating_normal_stress(
    channel: impl Into<String>,
    amplitude: f64,
    frequency: f64,
    phase: f64,
    theta: f64,
    phi: f64,
    n: usize,
) -> StressSeries {
    let rotation = rotation_matrix(theta, phi);
    let samples = (0..n)
        .map(|t| {
            let s11 = amplitude * (2.0 * PI * frequency * t as f64 + phase).sin();
            transform(&rotation, &StressTensor::diagonal(s11, 0.0, 0.0))
        })
        .collect();
    StressSeries::new(channel, samples)
}

/// `n` copies of the same tensor
pub fn constant(channel: impl Into<String>, tensor: StressTensor, n: usize) -> StressSeries {
    StressSeries::new(channel, vec![tensor; n])
}
