use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use critplane_core::{CellFailure, ChannelDamage, CriticalPlane, FatigueConfig, StressUnit};
use serde::{Deserialize, Serialize};

use crate::error::{IoError, Result};

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Damage surface and critical plane of one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel: String,
    pub num_samples: usize,
    pub theta_deg: Vec<f64>,
    pub phi_deg: Vec<f64>,
    /// Rows follow `theta_deg`, columns `phi_deg`; `null` marks a failed cell
    pub damage: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    pub failures: Vec<CellFailure>,
    pub critical: CriticalPlane,
}

impl From<&ChannelDamage> for ChannelReport {
    fn from(result: &ChannelDamage) -> Self {
        let surface = &result.surface;
        let (rows, cols) = surface.shape();
        let damage = (0..rows)
            .map(|i| (0..cols).map(|j| surface.get(i, j)).collect())
            .collect();
        Self {
            channel: result.channel.clone(),
            num_samples: result.num_samples,
            theta_deg: surface.theta_deg.clone(),
            phi_deg: surface.phi_deg.clone(),
            damage,
            failures: surface.failures.clone(),
            critical: result.critical,
        }
    }
}

/// Results of one job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageReport {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub job: String,
    pub config: FatigueConfig,
    /// Stress unit of the damage calculation (the S–N curve unit)
    pub stress_unit: StressUnit,
    pub channels: Vec<ChannelReport>,
}

impl DamageReport {
    pub fn new(
        job: &str,
        config: &FatigueConfig,
        stress_unit: StressUnit,
        results: &[ChannelDamage],
    ) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            generated_at: Utc::now(),
            job: job.to_string(),
            config: config.clone(),
            stress_unit,
            channels: results.iter().map(ChannelReport::from).collect(),
        }
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelReport> {
        self.channels.iter().find(|c| c.channel == name)
    }

    /// Channel with the largest critical-plane damage
    pub fn most_damaged(&self) -> Option<&ChannelReport> {
        self.channels
            .iter()
            .max_by(|a, b| a.critical.max_damage.total_cmp(&b.critical.max_damage))
    }
}

pub fn save_report(path: impl AsRef<Path>, report: &DamageReport) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let bytes = serde_json::to_vec_pretty(report)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_report(path: impl AsRef<Path>) -> Result<DamageReport> {
    let bytes = fs::read(path)?;
    let report: DamageReport = serde_json::from_slice(&bytes)?;
    if report.schema_version != REPORT_SCHEMA_VERSION {
        return Err(IoError::SchemaVersion {
            found: report.schema_version,
            expected: REPORT_SCHEMA_VERSION,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use critplane_core::{DamageSurface, SnCurve};
    use nalgebra::DMatrix;

    fn sample_result() -> ChannelDamage {
        let surface = DamageSurface {
            theta_deg: vec![0.0, 90.0],
            phi_deg: vec![0.0, 90.0],
            values: DMatrix::from_row_slice(2, 2, &[1e-5, 2e-5, f64::NAN, 0.0]),
            failures: vec![CellFailure {
                theta_index: 1,
                phi_index: 0,
                message: "Non-finite stress value at sample 3".to_string(),
            }],
        };
        let critical = surface.critical_plane().unwrap();
        ChannelDamage {
            channel: "P1".to_string(),
            num_samples: 12,
            surface,
            critical,
        }
    }

    fn sample_report() -> DamageReport {
        let config = FatigueConfig::new(SnCurve::new(300.0, 1e6, 5.0)).with_grid(2, 2);
        DamageReport::new("unit", &config, StressUnit::MPa, &[sample_result()])
    }

    #[test]
    fn failed_cells_become_null() {
        let report = sample_report();
        let channel = report.channel("P1").unwrap();
        assert_eq!(channel.damage[1][0], None);
        assert_eq!(channel.damage[0][1], Some(2e-5));
        assert_eq!(channel.critical.phi_index, 1);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["channels"][0]["damage"][1][0].is_null());
    }

    #[test]
    fn report_roundtrip_preserves_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        let report = sample_report();

        save_report(&path, &report).expect("save should succeed");
        let loaded = load_report(&path).expect("load should succeed");
        assert_eq!(loaded, report);
    }

    #[test]
    fn load_report_rejects_other_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = sample_report();
        report.schema_version = 99;
        save_report(&path, &report).unwrap();

        let err = load_report(&path).unwrap_err();
        assert!(matches!(err, IoError::SchemaVersion { found: 99, .. }));
    }

    #[test]
    fn load_report_fails_for_invalid_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(load_report(&path), Err(IoError::Json(_))));

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_report(&missing), Err(IoError::Io(_))));
    }
}
