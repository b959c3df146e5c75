//! Critical-plane search over a grid of plane orientations
//!
//! For every orientation (θ, φ) of the grid the stress series is resolved to
//! the normal stress on that plane and run through
//! extrema → rainflow → damage. The orientation with the largest damage is
//! the critical plane.
//!
//! Cells are independent of each other: with `parallel` enabled they are
//! evaluated on the rayon pool, each task owning its own bins, stack and
//! rainflow matrix. The surface is assembled after all tasks finished, so
//! the result does not depend on scheduling.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};

use nalgebra::{DMatrix, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::config::{FailurePolicy, FatigueConfig};
use crate::damage::DamageCalculator;
use crate::error::{FatigueError, Result};
use crate::extrema::{ExtremaExtractor, ExtremaSequence, StressBins};
use crate::rainflow::{RainflowCounter, RainflowMatrix};
use crate::series::StressSeries;
use crate::tensor::{plane_normal, StressTensor};

/// Samples whose largest component is below this are never rescaled
pub const ZERO_STRESS_THRESHOLD: f64 = 1e-8;

/// Evenly spaced plane orientations, θ and φ in [0, π)
#[derive(Debug, Clone, PartialEq)]
pub struct OrientationGrid {
    theta: Vec<f64>,
    phi: Vec<f64>,
}

impl OrientationGrid {
    pub fn new(num_theta_steps: usize, num_phi_steps: usize) -> Result<Self> {
        if num_theta_steps == 0 || num_phi_steps == 0 {
            return Err(FatigueError::EmptyOrientationGrid);
        }
        let steps = |n: usize| (0..n).map(|i| i as f64 / n as f64 * PI).collect();
        Ok(Self {
            theta: steps(num_theta_steps),
            phi: steps(num_phi_steps),
        })
    }

    /// θ values in radians
    pub fn theta(&self) -> &[f64] {
        &self.theta
    }

    /// φ values in radians
    pub fn phi(&self) -> &[f64] {
        &self.phi
    }

    pub fn theta_deg(&self) -> Vec<f64> {
        self.theta.iter().map(|t| t.to_degrees()).collect()
    }

    pub fn phi_deg(&self) -> Vec<f64> {
        self.phi.iter().map(|p| p.to_degrees()).collect()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.theta.len(), self.phi.len())
    }

    pub fn len(&self) -> usize {
        self.theta.len() * self.phi.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell indices in row-major order (θ outer, φ inner)
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.theta.len()).flat_map(move |i| (0..self.phi.len()).map(move |j| (i, j)))
    }

    /// Plane normal of cell `(i, j)`
    pub fn normal(&self, i: usize, j: usize) -> Vector3<f64> {
        plane_normal(self.theta[i], self.phi[j])
    }
}

/// Triaxiality scaling factor `f = 1 + (1 - k)·V` of one sample
///
/// `V` is the ratio of the smaller-magnitude to the larger-magnitude extreme
/// principal stress: -1 for pure shear, 0 for uniaxial tension/compression,
/// 1 for hydrostatic stress. Samples near zero stress keep `f = 1`.
pub fn triaxiality_factor(stress: &StressTensor, k: f64) -> f64 {
    if stress.max_abs_component() <= ZERO_STRESS_THRESHOLD {
        return 1.0;
    }
    let principal = stress.principal();
    let (low, high) = (principal.min(), principal.max());
    let ratio = if low.abs() > high.abs() && low.abs() > ZERO_STRESS_THRESHOLD {
        high / low
    } else if high.abs() > ZERO_STRESS_THRESHOLD {
        low / high
    } else {
        return 1.0;
    };
    1.0 + (1.0 - k) * ratio
}

/// Rescale every sample of a series by its triaxiality factor
pub fn scale_stresses(series: &StressSeries, k: f64) -> StressSeries {
    series.map_samples(|s| s.scaled(triaxiality_factor(s, k)))
}

/// Intermediate products of the damage pipeline for one scalar signal
#[derive(Debug, Clone)]
pub struct SignalAnalysis {
    pub bins: StressBins,
    pub extrema: ExtremaSequence,
    pub rainflow: RainflowMatrix,
    pub damage: f64,
}

/// Run extrema → rainflow (with repeated residual) → damage on one signal
///
/// A constant signal has no cycles and yields zero damage.
pub fn analyze_signal(signal: &[f64], config: &FatigueConfig) -> Result<SignalAnalysis> {
    let extractor = ExtremaExtractor::new(signal, config.num_stress_bins)?;
    let bins = extractor.bins().clone();
    let extrema = extractor.locate();

    let mut counter = RainflowCounter::new(bins.num_bins);
    counter.count_with_repeated_residual(&extrema.bins);
    let rainflow = counter.into_matrix();

    let damage = if rainflow.is_zero() {
        debug!(extrema = extrema.len(), "no closed cycles, zero damage");
        0.0
    } else {
        let mut calculator = DamageCalculator::new(&bins.centers());
        calculator.apply_mean_stress_correction(config.mean_stress_correction_factor);
        calculator.compute_damage(&rainflow, &config.sn_curve)
    };

    Ok(SignalAnalysis {
        bins,
        extrema,
        rainflow,
        damage,
    })
}

/// Damage of one scalar signal
pub fn signal_damage(signal: &[f64], config: &FatigueConfig) -> Result<f64> {
    analyze_signal(signal, config).map(|analysis| analysis.damage)
}

/// Failure recorded for one orientation cell under [`FailurePolicy::Continue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellFailure {
    pub theta_index: usize,
    pub phi_index: usize,
    pub message: String,
}

/// Damage of every grid cell
///
/// Serializes with the nalgebra matrix layout. JSON has no NaN, so a surface
/// with failed cells writes them as `null` and cannot be read back from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageSurface {
    /// θ axis in degrees
    pub theta_deg: Vec<f64>,
    /// φ axis in degrees
    pub phi_deg: Vec<f64>,
    /// Damage, rows = θ, columns = φ; NaN marks a failed cell
    pub values: DMatrix<f64>,
    pub failures: Vec<CellFailure>,
}

impl DamageSurface {
    pub fn get(&self, theta_index: usize, phi_index: usize) -> Option<f64> {
        let v = self.values[(theta_index, phi_index)];
        (!v.is_nan()).then_some(v)
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    /// Cell with the largest damage, first occurrence in row-major order wins
    pub fn critical_plane(&self) -> Option<CriticalPlane> {
        let (rows, cols) = self.values.shape();
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..rows {
            for j in 0..cols {
                let v = self.values[(i, j)];
                if v.is_nan() {
                    continue;
                }
                if best.is_none_or(|(_, _, b)| v > b) {
                    best = Some((i, j, v));
                }
            }
        }
        best.map(|(i, j, max_damage)| CriticalPlane {
            max_damage,
            theta_deg: self.theta_deg[i],
            theta_index: i,
            phi_deg: self.phi_deg[j],
            phi_index: j,
        })
    }
}

/// Orientation with the largest damage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalPlane {
    pub max_damage: f64,
    pub theta_deg: f64,
    pub theta_index: usize,
    pub phi_deg: f64,
    pub phi_index: usize,
}

/// Result for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDamage {
    pub channel: String,
    pub num_samples: usize,
    pub surface: DamageSurface,
    pub critical: CriticalPlane,
}

/// Critical-plane damage calculator
#[derive(Debug, Clone)]
pub struct MultiaxialDamageCalculator {
    config: FatigueConfig,
    grid: OrientationGrid,
}

impl MultiaxialDamageCalculator {
    /// Validate `config` and build the orientation grid
    pub fn new(config: FatigueConfig) -> Result<Self> {
        config.validate()?;
        let grid = OrientationGrid::new(config.num_theta_steps, config.num_phi_steps)?;
        Ok(Self { config, grid })
    }

    pub fn config(&self) -> &FatigueConfig {
        &self.config
    }

    pub fn grid(&self) -> &OrientationGrid {
        &self.grid
    }

    /// Series after the optional triaxiality pre-scaling
    pub fn prepare(&self, series: &StressSeries) -> StressSeries {
        match self.config.triaxiality_scaling {
            Some(k) => scale_stresses(series, k),
            None => series.clone(),
        }
    }

    /// Damage surface and critical plane of one channel
    pub fn compute(&self, series: &StressSeries) -> Result<ChannelDamage> {
        self.compute_with_cancel(series, &AtomicBool::new(false))
    }

    /// Like [`Self::compute`], checking `cancel` between orientation cells
    pub fn compute_with_cancel(
        &self,
        series: &StressSeries,
        cancel: &AtomicBool,
    ) -> Result<ChannelDamage> {
        let span = info_span!("channel", channel = %series.channel, samples = series.len());
        let _guard = span.enter();

        if series.is_empty() {
            return Err(FatigueError::EmptySeries {
                channel: series.channel.clone(),
            });
        }
        if series.len() < 3 {
            return Err(FatigueError::SeriesTooShort {
                channel: series.channel.clone(),
                len: series.len(),
            });
        }

        let scaled = self.prepare(series);
        let cells: Vec<(usize, usize)> = self.grid.cells().collect();
        let evaluate = |&(i, j): &(usize, usize)| -> Result<f64> {
            if cancel.load(Ordering::Relaxed) {
                return Err(FatigueError::Cancelled);
            }
            let signal = scaled.resolve(&self.grid.normal(i, j));
            let damage = signal_damage(&signal, &self.config)?;
            debug!(theta_index = i, phi_index = j, damage, "orientation evaluated");
            Ok(damage)
        };

        let results: Vec<Result<f64>> = if self.config.parallel {
            cells.par_iter().map(evaluate).collect()
        } else {
            let mut results = Vec::with_capacity(cells.len());
            for cell in &cells {
                let result = evaluate(cell);
                let stop = result.is_err() && self.config.failure_policy == FailurePolicy::Abort;
                results.push(result);
                if stop {
                    break;
                }
            }
            results
        };

        if cancel.load(Ordering::Relaxed) {
            warn!("damage computation cancelled");
            return Err(FatigueError::Cancelled);
        }

        let (rows, cols) = self.grid.shape();
        let mut values = DMatrix::from_element(rows, cols, f64::NAN);
        let mut failures = Vec::new();
        let mut first_error = None;
        for (&(i, j), result) in cells.iter().zip(results) {
            match result {
                Ok(damage) => values[(i, j)] = damage,
                Err(err) => {
                    if self.config.failure_policy == FailurePolicy::Abort {
                        return Err(err);
                    }
                    warn!(theta_index = i, phi_index = j, error = %err, "orientation failed");
                    failures.push(CellFailure {
                        theta_index: i,
                        phi_index: j,
                        message: err.to_string(),
                    });
                    first_error.get_or_insert(err);
                }
            }
        }

        let surface = DamageSurface {
            theta_deg: self.grid.theta_deg(),
            phi_deg: self.grid.phi_deg(),
            values,
            failures,
        };
        let Some(critical) = surface.critical_plane() else {
            return Err(first_error.unwrap_or(FatigueError::EmptyOrientationGrid));
        };

        info!(
            max_damage = critical.max_damage,
            theta_deg = critical.theta_deg,
            phi_deg = critical.phi_deg,
            failed_cells = surface.failures.len(),
            "critical plane found"
        );

        Ok(ChannelDamage {
            channel: series.channel.clone(),
            num_samples: series.len(),
            surface,
            critical,
        })
    }

    /// Compute every channel in order, stopping at the first error
    pub fn compute_all(&self, channels: &[StressSeries]) -> Result<Vec<ChannelDamage>> {
        channels.iter().map(|series| self.compute(series)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::SnCurve;

    fn config() -> FatigueConfig {
        FatigueConfig::new(SnCurve::new(100.0, 1e6, 4.0)).with_grid(6, 6)
    }

    #[test]
    fn test_grid_axes() {
        let grid = OrientationGrid::new(4, 2).unwrap();
        assert_eq!(grid.theta_deg().len(), 4);
        assert!((grid.theta_deg()[1] - 45.0).abs() < 1e-12);
        assert!((grid.phi_deg()[1] - 90.0).abs() < 1e-12);
        assert_eq!(grid.len(), 8);
        let cells: Vec<_> = grid.cells().collect();
        assert_eq!(cells[0], (0, 0));
        assert_eq!(cells[1], (0, 1));
        assert_eq!(cells[2], (1, 0));
        assert_eq!(OrientationGrid::new(0, 3), Err(FatigueError::EmptyOrientationGrid));
    }

    #[test]
    fn test_triaxiality_factor_cases() {
        // hydrostatic: V = 1
        let f = triaxiality_factor(&StressTensor::diagonal(-10.0, -10.0, -10.0), 2.0);
        assert!(f.abs() < 1e-12);
        // pure shear: V = -1
        let f = triaxiality_factor(&StressTensor::new(0.0, 0.0, 0.0, 40.0, 0.0, 0.0), 2.0);
        assert!((f - 2.0).abs() < 1e-9);
        // uniaxial: V = 0
        let f = triaxiality_factor(&StressTensor::diagonal(0.0, 0.0, -70.0), 2.0);
        assert!((f - 1.0).abs() < 1e-9);
        // near zero: untouched
        assert_eq!(triaxiality_factor(&StressTensor::diagonal(1e-9, 0.0, 0.0), 2.0), 1.0);
    }

    #[test]
    fn test_critical_plane_first_max_wins() {
        let surface = DamageSurface {
            theta_deg: vec![0.0, 90.0],
            phi_deg: vec![0.0, 90.0],
            values: DMatrix::from_row_slice(2, 2, &[1.0, 3.0, 3.0, f64::NAN]),
            failures: vec![],
        };
        let critical = surface.critical_plane().unwrap();
        assert_eq!((critical.theta_index, critical.phi_index), (0, 1));
        assert_eq!(critical.max_damage, 3.0);
        assert_eq!(critical.phi_deg, 90.0);
        assert_eq!(surface.get(1, 1), None);
    }

    #[test]
    fn test_surface_serde() {
        let surface = DamageSurface {
            theta_deg: vec![0.0, 60.0, 120.0],
            phi_deg: vec![0.0, 90.0],
            values: DMatrix::from_row_slice(3, 2, &[0.5, 0.25, 0.0, 1.5, 0.125, 2.0]),
            failures: vec![],
        };

        let text = serde_json::to_string(&surface).unwrap();
        let back: DamageSurface = serde_json::from_str(&text).unwrap();
        assert_eq!(back, surface);
        assert_eq!(back.shape(), (3, 2));

        let failed = DamageSurface {
            values: DMatrix::from_element(3, 2, f64::NAN),
            ..surface
        };
        let text = serde_json::to_string(&failed).unwrap();
        assert!(text.contains("null"));
    }

    #[test]
    fn test_rejects_empty_and_short_series() {
        let calc = MultiaxialDamageCalculator::new(config()).unwrap();
        assert!(matches!(
            calc.compute(&StressSeries::new("A", vec![])),
            Err(FatigueError::EmptySeries { .. })
        ));
        assert!(matches!(
            calc.compute(&StressSeries::new("A", vec![StressTensor::zero(); 2])),
            Err(FatigueError::SeriesTooShort { len: 2, .. })
        ));
    }

    #[test]
    fn test_constructor_validates_config() {
        let err = MultiaxialDamageCalculator::new(config().with_grid(0, 0)).unwrap_err();
        assert_eq!(err, FatigueError::EmptyOrientationGrid);
    }

    #[test]
    fn test_cancelled_before_start() {
        let calc = MultiaxialDamageCalculator::new(config()).unwrap();
        let series = StressSeries::new(
            "A",
            (0..10)
                .map(|i| StressTensor::diagonal(i as f64, 0.0, 0.0))
                .collect(),
        );
        let cancel = AtomicBool::new(true);
        assert_eq!(
            calc.compute_with_cancel(&series, &cancel).unwrap_err(),
            FatigueError::Cancelled
        );
    }

    #[test]
    fn test_signal_damage_constant_is_zero() {
        assert_eq!(signal_damage(&[5.0; 10], &config()).unwrap(), 0.0);
    }
}
