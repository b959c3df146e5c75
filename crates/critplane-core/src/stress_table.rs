//! Stress tensors from (pressure, temperature) load histories
//!
//! Each stress component of a channel is tabulated on a temperature axis
//! (columns) and a pressure axis (rows). A measured load history is turned
//! into a [`StressSeries`] by bilinear interpolation of the six component
//! tables at every sample.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{FatigueError, Result};
use crate::series::StressSeries;
use crate::tensor::StressTensor;

/// Behaviour outside the tabulated range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryHandling {
    /// Fail with `OutOfTableRange`
    #[default]
    Error,
    /// Clamp to the nearest edge value
    Constant,
    /// Extrapolate linearly from the edge cell
    Linear,
}

/// Bilinear interpolation on a rectilinear grid
#[derive(Debug, Clone, PartialEq)]
pub struct BilinearTable {
    x_axis: Vec<f64>,
    y_axis: Vec<f64>,
    /// rows follow `y_axis`, columns follow `x_axis`
    values: DMatrix<f64>,
    boundary: BoundaryHandling,
}

fn check_axis(name: &str, axis: &[f64]) -> Result<()> {
    if axis.len() < 2 {
        return Err(FatigueError::TableShape(format!(
            "{name} axis needs at least 2 points, got {}",
            axis.len()
        )));
    }
    if axis.iter().any(|v| !v.is_finite()) || axis.windows(2).any(|w| w[1] <= w[0]) {
        return Err(FatigueError::TableShape(format!(
            "{name} axis must be finite and strictly increasing"
        )));
    }
    Ok(())
}

/// Index of the cell `[axis[i], axis[i+1]]` containing `value`, clamped to the edge cells
fn locate(axis: &[f64], value: f64) -> usize {
    let upper = axis.partition_point(|&a| a <= value);
    upper.saturating_sub(1).min(axis.len() - 2)
}

impl BilinearTable {
    /// # Arguments
    ///
    /// * `x_axis` - column coordinates, strictly increasing
    /// * `y_axis` - row coordinates, strictly increasing
    /// * `rows` - `y_axis.len()` rows of `x_axis.len()` values
    /// * `boundary` - handling of points outside the axes
    pub fn new(
        x_axis: Vec<f64>,
        y_axis: Vec<f64>,
        rows: &[Vec<f64>],
        boundary: BoundaryHandling,
    ) -> Result<Self> {
        check_axis("x", &x_axis)?;
        check_axis("y", &y_axis)?;
        if rows.len() != y_axis.len() {
            return Err(FatigueError::TableShape(format!(
                "expected {} rows (y axis), got {}",
                y_axis.len(),
                rows.len()
            )));
        }
        if let Some((r, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != x_axis.len()) {
            return Err(FatigueError::TableShape(format!(
                "row {r} has {} values, expected {} (x axis)",
                row.len(),
                x_axis.len()
            )));
        }
        let values = DMatrix::from_fn(y_axis.len(), x_axis.len(), |i, j| rows[i][j]);
        Ok(Self {
            x_axis,
            y_axis,
            values,
            boundary,
        })
    }

    pub fn x_axis(&self) -> &[f64] {
        &self.x_axis
    }

    pub fn y_axis(&self) -> &[f64] {
        &self.y_axis
    }

    fn in_range(axis: &[f64], v: f64) -> bool {
        v >= axis[0] && v <= axis[axis.len() - 1]
    }

    /// Interpolated value at `(x, y)`
    pub fn evaluate(&self, x: f64, y: f64) -> Result<f64> {
        if x.is_nan() || y.is_nan() {
            return Err(FatigueError::OutOfTableRange { x, y });
        }
        let inside = Self::in_range(&self.x_axis, x) && Self::in_range(&self.y_axis, y);
        let (x, y) = match self.boundary {
            BoundaryHandling::Error if !inside => {
                return Err(FatigueError::OutOfTableRange { x, y });
            }
            BoundaryHandling::Constant => (
                x.clamp(self.x_axis[0], self.x_axis[self.x_axis.len() - 1]),
                y.clamp(self.y_axis[0], self.y_axis[self.y_axis.len() - 1]),
            ),
            _ => (x, y),
        };

        let i = locate(&self.x_axis, x);
        let j = locate(&self.y_axis, y);
        let tx = (x - self.x_axis[i]) / (self.x_axis[i + 1] - self.x_axis[i]);
        let ty = (y - self.y_axis[j]) / (self.y_axis[j + 1] - self.y_axis[j]);
        let z = &self.values;
        Ok((1.0 - tx) * (1.0 - ty) * z[(j, i)]
            + tx * (1.0 - ty) * z[(j, i + 1)]
            + (1.0 - tx) * ty * z[(j + 1, i)]
            + tx * ty * z[(j + 1, i + 1)])
    }
}

/// Component names in Voigt order
pub const COMPONENT_NAMES: [&str; 6] = ["s11", "s22", "s33", "s12", "s13", "s23"];

/// Six component tables of one channel over (temperature, pressure)
#[derive(Debug, Clone, PartialEq)]
pub struct StressTable {
    components: [BilinearTable; 6],
}

impl StressTable {
    /// # Arguments
    ///
    /// * `temperature` - column axis
    /// * `pressure` - row axis
    /// * `grids` - one `pressure × temperature` grid per component, Voigt order
    pub fn new(
        temperature: &[f64],
        pressure: &[f64],
        grids: [&[Vec<f64>]; 6],
        boundary: BoundaryHandling,
    ) -> Result<Self> {
        let build = |k: usize| {
            BilinearTable::new(temperature.to_vec(), pressure.to_vec(), grids[k], boundary).map_err(
                |err| match err {
                    FatigueError::TableShape(msg) => {
                        FatigueError::TableShape(format!("{}: {msg}", COMPONENT_NAMES[k]))
                    }
                    other => other,
                },
            )
        };
        Ok(Self {
            components: [build(0)?, build(1)?, build(2)?, build(3)?, build(4)?, build(5)?],
        })
    }

    pub fn stress_at(&self, pressure: f64, temperature: f64) -> Result<StressTensor> {
        let mut voigt = [0.0; 6];
        for (value, table) in voigt.iter_mut().zip(&self.components) {
            *value = table.evaluate(temperature, pressure)?;
        }
        Ok(StressTensor::from_voigt(voigt))
    }

    /// Stress series of a (pressure, temperature) history
    pub fn compute_series(
        &self,
        channel: impl Into<String>,
        pressure: &[f64],
        temperature: &[f64],
    ) -> Result<StressSeries> {
        if pressure.len() != temperature.len() {
            return Err(FatigueError::config(
                "load history",
                format!(
                    "pressure has {} samples but temperature has {}",
                    pressure.len(),
                    temperature.len()
                ),
            ));
        }
        let samples = pressure
            .iter()
            .zip(temperature)
            .map(|(&p, &t)| self.stress_at(p, t))
            .collect::<Result<Vec<_>>>()?;
        Ok(StressSeries::new(channel, samples))
    }
}

/// Stress tables of several named channels
#[derive(Debug, Clone, Default)]
pub struct StressTableSet {
    channels: BTreeMap<String, StressTable>,
}

impl StressTableSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, channel: impl Into<String>, table: StressTable) {
        self.channels.insert(channel.into(), table);
    }

    pub fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    pub fn get(&self, channel: &str) -> Option<&StressTable> {
        self.channels.get(channel)
    }

    /// One stress series per channel, in channel-name order
    pub fn compute_all(&self, pressure: &[f64], temperature: &[f64]) -> Result<Vec<StressSeries>> {
        self.channels
            .iter()
            .map(|(name, table)| table.compute_series(name.clone(), pressure, temperature))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // z = 2x + 3y + 1 is reproduced exactly by bilinear interpolation
    fn plane_table(boundary: BoundaryHandling) -> BilinearTable {
        let x = vec![0.0, 1.0, 3.0];
        let y = vec![10.0, 20.0];
        let rows: Vec<Vec<f64>> = y
            .iter()
            .map(|&yv| x.iter().map(|&xv| 2.0 * xv + 3.0 * yv + 1.0).collect())
            .collect();
        BilinearTable::new(x, y, &rows, boundary).unwrap()
    }

    #[test]
    fn test_interpolates_plane_exactly() {
        let table = plane_table(BoundaryHandling::Error);
        for &(x, y) in &[(0.0, 10.0), (0.5, 15.0), (2.2, 12.5), (3.0, 20.0)] {
            let z = table.evaluate(x, y).unwrap();
            assert!((z - (2.0 * x + 3.0 * y + 1.0)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_boundary_handling() {
        let error = plane_table(BoundaryHandling::Error);
        assert!(matches!(
            error.evaluate(4.0, 15.0),
            Err(FatigueError::OutOfTableRange { .. })
        ));

        let constant = plane_table(BoundaryHandling::Constant);
        let z = constant.evaluate(4.0, 25.0).unwrap();
        assert!((z - (2.0 * 3.0 + 3.0 * 20.0 + 1.0)).abs() < 1e-12);

        let linear = plane_table(BoundaryHandling::Linear);
        let z = linear.evaluate(4.0, 25.0).unwrap();
        assert!((z - (2.0 * 4.0 + 3.0 * 25.0 + 1.0)).abs() < 1e-12);

        assert!(linear.evaluate(f64::NAN, 12.0).is_err());
    }

    #[test]
    fn test_shape_errors() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            BilinearTable::new(vec![0.0, 1.0], vec![0.0, 1.0], &rows, BoundaryHandling::Error),
            Err(FatigueError::TableShape(_))
        ));
        let rows = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(BilinearTable::new(vec![1.0, 0.0], vec![0.0, 1.0], &rows, BoundaryHandling::Error)
            .is_err());
        assert!(BilinearTable::new(vec![0.0], vec![0.0, 1.0], &rows[..1], BoundaryHandling::Error)
            .is_err());
    }

    #[test]
    fn test_stress_series_from_history() {
        let temperature = [20.0, 120.0];
        let pressure = [0.0, 100.0];
        // s11 = pressure, s12 = temperature / 10, everything else zero
        let s11 = vec![vec![0.0, 0.0], vec![100.0, 100.0]];
        let s12 = vec![vec![2.0, 12.0], vec![2.0, 12.0]];
        let zero = vec![vec![0.0, 0.0], vec![0.0, 0.0]];
        let table = StressTable::new(
            &temperature,
            &pressure,
            [
                s11.as_slice(),
                zero.as_slice(),
                zero.as_slice(),
                s12.as_slice(),
                zero.as_slice(),
                zero.as_slice(),
            ],
            BoundaryHandling::Error,
        )
        .unwrap();

        let series = table
            .compute_series("liner", &[0.0, 50.0, 100.0], &[20.0, 70.0, 120.0])
            .unwrap();
        assert_eq!(series.len(), 3);
        let mid = series.samples()[1];
        assert!((mid.s11 - 50.0).abs() < 1e-12);
        assert!((mid.s12 - 7.0).abs() < 1e-12);
        assert_eq!(mid.s33, 0.0);

        assert!(table.compute_series("liner", &[0.0], &[20.0, 30.0]).is_err());

        let mut set = StressTableSet::new();
        set.insert("B", table.clone());
        set.insert("A", table);
        let all = set.compute_all(&[0.0, 100.0], &[20.0, 20.0]).unwrap();
        assert_eq!(all[0].channel, "A");
        assert_eq!(set.channel_names(), vec!["A".to_string(), "B".to_string()]);
    }
}
