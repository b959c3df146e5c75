//! Configuration of the multiaxial damage calculation.

use serde::{Deserialize, Serialize};

use crate::damage::SnCurve;
use crate::error::{FatigueError, Result};
use crate::extrema::DEFAULT_NUM_BINS;

/// What to do when one orientation cell fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing cell and return its error
    #[default]
    Abort,
    /// Record the failure for the cell and keep evaluating the grid
    Continue,
}

/// Multiaxial damage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FatigueConfig {
    /// S–N curve of the material
    pub sn_curve: SnCurve,
    /// Number of stress bins used for rainflow counting
    #[serde(default = "default_num_bins")]
    pub num_stress_bins: usize,
    /// One-parameter mean-stress sensitivity M (0 disables the correction)
    ///
    /// Restricted to [0, 1]: above 1 or below 0 the compressive branch of the
    /// correction can turn amplitudes negative.
    #[serde(default = "default_mean_stress_factor")]
    pub mean_stress_correction_factor: f64,
    /// Number of theta steps spanning [0, π)
    #[serde(default = "default_steps")]
    pub num_theta_steps: usize,
    /// Number of phi steps spanning [0, π)
    #[serde(default = "default_steps")]
    pub num_phi_steps: usize,
    /// Triaxiality scaling factor k; `None` disables the pre-scaling
    #[serde(default = "default_triaxiality")]
    pub triaxiality_scaling: Option<f64>,
    /// Evaluate orientation cells on the rayon thread pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_num_bins() -> usize {
    DEFAULT_NUM_BINS
}

fn default_mean_stress_factor() -> f64 {
    0.24
}

fn default_steps() -> usize {
    36
}

fn default_triaxiality() -> Option<f64> {
    Some(2.0)
}

fn default_parallel() -> bool {
    true
}

impl FatigueConfig {
    /// Configuration with default binning, grid and correction for `sn_curve`
    pub fn new(sn_curve: SnCurve) -> Self {
        Self {
            sn_curve,
            num_stress_bins: default_num_bins(),
            mean_stress_correction_factor: default_mean_stress_factor(),
            num_theta_steps: default_steps(),
            num_phi_steps: default_steps(),
            triaxiality_scaling: default_triaxiality(),
            parallel: default_parallel(),
            failure_policy: FailurePolicy::default(),
        }
    }

    pub fn with_grid(mut self, num_theta_steps: usize, num_phi_steps: usize) -> Self {
        self.num_theta_steps = num_theta_steps;
        self.num_phi_steps = num_phi_steps;
        self
    }

    pub fn with_bins(mut self, num_stress_bins: usize) -> Self {
        self.num_stress_bins = num_stress_bins;
        self
    }

    pub fn with_mean_stress_correction(mut self, factor: f64) -> Self {
        self.mean_stress_correction_factor = factor;
        self
    }

    pub fn with_triaxiality_scaling(mut self, k: Option<f64>) -> Self {
        self.triaxiality_scaling = k;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Validate every field
    ///
    /// # Errors
    ///
    /// `InvalidConfig` naming the first offending field, or
    /// `EmptyOrientationGrid` when either grid dimension is zero. The
    /// mean-stress factor must lie in [0, 1].
    pub fn validate(&self) -> Result<()> {
        if self.num_stress_bins < 2 {
            return Err(FatigueError::config(
                "num_stress_bins",
                format!("must be greater than 1, got {}", self.num_stress_bins),
            ));
        }
        let m = self.mean_stress_correction_factor;
        if !m.is_finite() || !(0.0..=1.0).contains(&m) {
            return Err(FatigueError::config(
                "mean_stress_correction_factor",
                format!("must lie in [0, 1] so corrected amplitudes stay non-negative, got {m}"),
            ));
        }
        self.sn_curve.validate()?;
        if self.num_theta_steps == 0 || self.num_phi_steps == 0 {
            return Err(FatigueError::EmptyOrientationGrid);
        }
        if let Some(k) = self.triaxiality_scaling
            && !k.is_finite()
        {
            return Err(FatigueError::config(
                "triaxiality_scaling",
                format!("must be finite, got {k}"),
            ));
        }
        Ok(())
    }
}
