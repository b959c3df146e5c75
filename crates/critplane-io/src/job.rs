use std::collections::BTreeSet;
use std::f64::consts::FRAC_PI_4;
use std::fs;
use std::path::Path;

use critplane_core::synthetic::oscillating_normal_stress;
use critplane_core::{
    BoundaryHandling, FatigueConfig, MultiaxialDamageCalculator, StressSeries, StressTable,
    StressUnit,
};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::error::{IoError, Result};
use crate::report::DamageReport;

/// One pressure × temperature grid per stress component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTables {
    pub s11: Vec<Vec<f64>>,
    pub s22: Vec<Vec<f64>>,
    pub s33: Vec<Vec<f64>>,
    pub s12: Vec<Vec<f64>>,
    pub s13: Vec<Vec<f64>>,
    pub s23: Vec<Vec<f64>>,
}

/// Where the stress history of a channel comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelSource {
    /// Explicit tensors as `[s11, s22, s33, s12, s13, s23]` rows
    Tensors { samples: Vec<[f64; 6]> },
    /// Stress tables interpolated along a (pressure, temperature) history
    Table {
        temperature_axis: Vec<f64>,
        pressure_axis: Vec<f64>,
        components: ComponentTables,
        #[serde(default)]
        boundary: BoundaryHandling,
        pressure: Vec<f64>,
        temperature: Vec<f64>,
    },
    /// Rotated uniaxial sine load
    Oscillating {
        amplitude: f64,
        /// cycles per sample
        frequency: f64,
        #[serde(default)]
        phase: f64,
        #[serde(default = "default_angle")]
        theta: f64,
        #[serde(default = "default_angle")]
        phi: f64,
        num_samples: usize,
    },
}

fn default_angle() -> f64 {
    FRAC_PI_4
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDefinition {
    pub name: String,
    pub source: ChannelSource,
}

impl ChannelDefinition {
    /// Stress series in the unit the source is written in
    pub fn build_series(&self) -> Result<StressSeries> {
        let series = match &self.source {
            ChannelSource::Tensors { samples } => {
                StressSeries::from_voigt_rows(self.name.clone(), samples)
            }
            ChannelSource::Table {
                temperature_axis,
                pressure_axis,
                components,
                boundary,
                pressure,
                temperature,
            } => {
                let table = StressTable::new(
                    temperature_axis,
                    pressure_axis,
                    [
                        components.s11.as_slice(),
                        components.s22.as_slice(),
                        components.s33.as_slice(),
                        components.s12.as_slice(),
                        components.s13.as_slice(),
                        components.s23.as_slice(),
                    ],
                    *boundary,
                )?;
                table.compute_series(self.name.clone(), pressure, temperature)?
            }
            ChannelSource::Oscillating {
                amplitude,
                frequency,
                phase,
                theta,
                phi,
                num_samples,
            } => oscillating_normal_stress(
                self.name.clone(),
                *amplitude,
                *frequency,
                *phase,
                *theta,
                *phi,
                *num_samples,
            ),
        };
        Ok(series)
    }
}

/// A damage job: configuration and the channels to evaluate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub config: FatigueConfig,
    /// Unit of the stress data in the channel sources
    #[serde(default)]
    pub stress_unit: StressUnit,
    /// Unit of the S–N curve reference stress
    #[serde(default)]
    pub sn_unit: StressUnit,
    pub channels: Vec<ChannelDefinition>,
}

impl Job {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check the configuration and the channel list
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(IoError::InvalidJob("job name is empty".to_string()));
        }
        if self.channels.is_empty() {
            return Err(IoError::InvalidJob(format!("job '{}' has no channels", self.name)));
        }
        let mut seen = BTreeSet::new();
        for channel in &self.channels {
            if !seen.insert(channel.name.as_str()) {
                return Err(IoError::InvalidJob(format!(
                    "duplicate channel name '{}'",
                    channel.name
                )));
            }
        }
        self.config.validate()?;
        Ok(())
    }

    /// Stress series of every channel, converted to the S–N curve unit
    pub fn build_series(&self) -> Result<Vec<StressSeries>> {
        self.channels
            .iter()
            .map(|channel| {
                let series = channel
                    .build_series()?
                    .converted(self.stress_unit, self.sn_unit);
                series.validate()?;
                Ok(series)
            })
            .collect()
    }
}

/// Validate, build and evaluate every channel of `job`
pub fn run_job(job: &Job) -> Result<DamageReport> {
    let span = info_span!("job", name = %job.name);
    let _guard = span.enter();

    job.validate()?;
    let series = job.build_series()?;
    let calculator = MultiaxialDamageCalculator::new(job.config.clone())?;
    let (rows, cols) = calculator.grid().shape();
    info!(
        channels = series.len(),
        theta_steps = rows,
        phi_steps = cols,
        "starting damage evaluation"
    );

    let results = calculator.compute_all(&series)?;
    Ok(DamageReport::new(&job.name, &job.config, job.sn_unit, &results))
}
