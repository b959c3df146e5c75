//! Stress histories of one measurement channel.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::{FatigueError, Result};
use crate::tensor::StressTensor;
use crate::units::StressUnit;

/// Ordered stress tensors of one channel, one per time sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressSeries {
    /// Channel name (e.g. measurement location)
    pub channel: String,
    samples: Vec<StressTensor>,
}

impl StressSeries {
    pub fn new(channel: impl Into<String>, samples: Vec<StressTensor>) -> Self {
        Self {
            channel: channel.into(),
            samples,
        }
    }

    /// Build from full 3×3 matrices, checking symmetry of every sample
    pub fn from_matrices(channel: impl Into<String>, matrices: &[Matrix3<f64>]) -> Result<Self> {
        let samples = matrices
            .iter()
            .enumerate()
            .map(|(index, m)| {
                StressTensor::from_matrix(m).map_err(|err| match err {
                    FatigueError::NonSymmetricTensor { deviation, .. } => {
                        FatigueError::NonSymmetricTensor { index, deviation }
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(channel, samples))
    }

    /// Build from Voigt rows `[s11, s22, s33, s12, s13, s23]`
    pub fn from_voigt_rows(channel: impl Into<String>, rows: &[[f64; 6]]) -> Self {
        Self::new(
            channel,
            rows.iter().copied().map(StressTensor::from_voigt).collect(),
        )
    }

    pub fn samples(&self) -> &[StressTensor] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Check the series can feed the damage pipeline
    ///
    /// Requires at least three samples and finite components everywhere.
    pub fn validate(&self) -> Result<()> {
        if self.samples.is_empty() {
            return Err(FatigueError::EmptySeries {
                channel: self.channel.clone(),
            });
        }
        if self.samples.len() < 3 {
            return Err(FatigueError::SeriesTooShort {
                channel: self.channel.clone(),
                len: self.samples.len(),
            });
        }
        if let Some(index) = self.samples.iter().position(|s| !s.is_finite()) {
            return Err(FatigueError::NonFiniteSample { index });
        }
        Ok(())
    }

    /// Normal stress history on the plane with unit normal `normal`
    pub fn resolve(&self, normal: &Vector3<f64>) -> Vec<f64> {
        self.samples.iter().map(|s| s.normal_stress(normal)).collect()
    }

    /// Copy of the series with every sample mapped through `f`
    pub fn map_samples(&self, f: impl Fn(&StressTensor) -> StressTensor) -> Self {
        Self::new(self.channel.clone(), self.samples.iter().map(f).collect())
    }

    /// Copy of the series expressed in another stress unit
    pub fn converted(&self, from: StressUnit, to: StressUnit) -> Self {
        let factor = StressUnit::conversion_factor(from, to);
        if factor == 1.0 {
            return self.clone();
        }
        self.map_samples(|s| s.scaled(factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_and_short() {
        let empty = StressSeries::new("A", vec![]);
        assert!(matches!(
            empty.validate(),
            Err(FatigueError::EmptySeries { .. })
        ));

        let short = StressSeries::new("B", vec![StressTensor::zero(); 2]);
        assert_eq!(
            short.validate(),
            Err(FatigueError::SeriesTooShort {
                channel: "B".to_string(),
                len: 2
            })
        );
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut samples = vec![StressTensor::zero(); 4];
        samples[2].s23 = f64::NAN;
        let series = StressSeries::new("C", samples);
        assert_eq!(
            series.validate(),
            Err(FatigueError::NonFiniteSample { index: 2 })
        );
    }

    #[test]
    fn test_from_matrices_reports_sample_index() {
        let good = StressTensor::new(1.0, 2.0, 3.0, 0.5, 0.0, 0.0).to_matrix();
        let mut bad = good;
        bad[(2, 0)] = 9.0;
        let err = StressSeries::from_matrices("D", &[good, good, bad]).unwrap_err();
        assert!(matches!(
            err,
            FatigueError::NonSymmetricTensor { index: 2, .. }
        ));
    }

    #[test]
    fn test_converted_scales_components() {
        let series = StressSeries::from_voigt_rows("E", &[[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]]);
        let pa = series.converted(StressUnit::MPa, StressUnit::Pa);
        assert_eq!(pa.samples()[0].s23, 6.0e6);
        assert_eq!(pa.channel, "E");
    }
}
