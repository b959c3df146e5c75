//! Mean-stress correction and Palmgren–Miner damage summation
//!
//! For a rainflow matrix over bins with physical centers `c`:
//!
//! ```text
//! amplitude[i][j] = |c_i - c_j| / 2
//! mean[i][j]      = (c_i + c_j) / 2
//! corrected       = amplitude + M * mean          if mean >= -amplitude
//!                 = amplitude - M * amplitude     otherwise
//! d[i][j]         = (1 / N_E) * (corrected / S_E)^k
//! D               = Σ d[i][j] * count[i][j]
//! ```

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{FatigueError, Result};
use crate::rainflow::RainflowMatrix;

/// Power-law S–N curve `N(S) = N_E · (S / S_E)^(-k)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnCurve {
    /// Reference stress amplitude S_E
    pub s_e: f64,
    /// Cycles to failure at S_E
    pub n_e: f64,
    /// Slope exponent
    pub k: f64,
}

impl SnCurve {
    pub fn new(s_e: f64, n_e: f64, k: f64) -> Self {
        Self { s_e, n_e, k }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("sn_curve.s_e", self.s_e),
            ("sn_curve.n_e", self.n_e),
            ("sn_curve.k", self.k),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(FatigueError::config(
                    field,
                    format!("must be a positive finite number, got {value}"),
                ));
            }
        }
        Ok(())
    }

    /// Cycles to failure at a stress amplitude
    pub fn cycles_to_failure(&self, amplitude: f64) -> f64 {
        self.n_e * (amplitude / self.s_e).powf(-self.k)
    }

    /// Damage contributed by one cycle at a stress amplitude
    pub fn damage_per_cycle(&self, amplitude: f64) -> f64 {
        1.0 / self.n_e * (amplitude / self.s_e).powf(self.k)
    }
}

/// One-parameter mean-stress correction of a cycle amplitude
///
/// Very compressive mean stresses (`mean < -amplitude`) are corrected with
/// `-amplitude` instead of `mean`, which keeps the result non-negative for
/// `0 <= M <= 1`. `M = 0` returns the amplitude unchanged.
pub fn corrected_amplitude(amplitude: f64, mean: f64, factor: f64) -> f64 {
    let correction = if mean >= -amplitude {
        factor * mean
    } else {
        -factor * amplitude
    };
    amplitude + correction
}

/// Damage evaluation on a fixed set of bin centers
#[derive(Debug, Clone)]
pub struct DamageCalculator {
    amplitudes: DMatrix<f64>,
    means: DMatrix<f64>,
    corrected: DMatrix<f64>,
    mean_stress_factor: f64,
}

impl DamageCalculator {
    /// Build amplitude and mean-stress matrices for `bin_centers`
    ///
    /// The corrected amplitudes start equal to the raw amplitudes (no correction).
    pub fn new(bin_centers: &[f64]) -> Self {
        let n = bin_centers.len();
        let amplitudes =
            DMatrix::from_fn(n, n, |i, j| (bin_centers[i] - bin_centers[j]).abs() / 2.0);
        let means = DMatrix::from_fn(n, n, |i, j| (bin_centers[i] + bin_centers[j]) / 2.0);
        let corrected = amplitudes.clone();
        Self {
            amplitudes,
            means,
            corrected,
            mean_stress_factor: 0.0,
        }
    }

    /// Apply the one-parameter mean-stress correction with factor `M`
    pub fn apply_mean_stress_correction(&mut self, factor: f64) -> &mut Self {
        self.mean_stress_factor = factor;
        self.corrected = self
            .amplitudes
            .zip_map(&self.means, |amplitude, mean| {
                corrected_amplitude(amplitude, mean, factor)
            });
        self
    }

    pub fn cycle_amplitudes(&self) -> &DMatrix<f64> {
        &self.amplitudes
    }

    pub fn mean_stresses(&self) -> &DMatrix<f64> {
        &self.means
    }

    pub fn corrected_amplitudes(&self) -> &DMatrix<f64> {
        &self.corrected
    }

    pub fn mean_stress_factor(&self) -> f64 {
        self.mean_stress_factor
    }

    /// Damage per cycle for every cell
    pub fn damage_per_cycle(&self, sn_curve: &SnCurve) -> DMatrix<f64> {
        self.corrected.map(|a| sn_curve.damage_per_cycle(a))
    }

    /// Palmgren–Miner sum of the rainflow matrix
    ///
    /// Cells without cycles are skipped, so an all-zero matrix gives exactly 0.
    pub fn compute_damage(&self, rainflow: &RainflowMatrix, sn_curve: &SnCurve) -> f64 {
        assert_eq!(
            rainflow.num_bins(),
            self.corrected.nrows(),
            "rainflow matrix and bin centers differ in size"
        );
        rainflow
            .nonzero()
            .map(|(i, j, count)| sn_curve.damage_per_cycle(self.corrected[(i, j)]) * count)
            .sum()
    }
}
