//! Stress units and conversions.
//!
//! The damage pipeline itself is unit-agnostic: the stress series and the
//! S–N reference stress `S_E` only have to share a unit. [`StressUnit`] is
//! used by callers to bring the series into the unit of the S–N curve
//! before processing.

use serde::{Deserialize, Serialize};

/// Units of stress (pressure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressUnit {
    /// Pascal
    Pa,
    /// Kilopascal (1e3 Pa)
    KPa,
    /// Megapascal (1e6 Pa), N/mm²
    #[default]
    MPa,
    /// Gigapascal (1e9 Pa)
    GPa,
    /// Bar (1e5 Pa)
    Bar,
    /// Pound-force per square inch
    Psi,
}

impl StressUnit {
    /// Size of one unit in pascal
    pub fn factor_to_pa(self) -> f64 {
        match self {
            StressUnit::Pa => 1.0,
            StressUnit::KPa => 1e3,
            StressUnit::MPa => 1e6,
            StressUnit::GPa => 1e9,
            StressUnit::Bar => 1e5,
            StressUnit::Psi => 6_894.757_293_168_361,
        }
    }

    /// Multiplier converting a value in `from` into `to`
    pub fn conversion_factor(from: StressUnit, to: StressUnit) -> f64 {
        if from == to {
            1.0
        } else {
            from.factor_to_pa() / to.factor_to_pa()
        }
    }

    pub fn convert(value: f64, from: StressUnit, to: StressUnit) -> f64 {
        value * Self::conversion_factor(from, to)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            StressUnit::Pa => "Pa",
            StressUnit::KPa => "kPa",
            StressUnit::MPa => "MPa",
            StressUnit::GPa => "GPa",
            StressUnit::Bar => "bar",
            StressUnit::Psi => "psi",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_conversion() {
        assert_eq!(StressUnit::conversion_factor(StressUnit::Psi, StressUnit::Psi), 1.0);
        assert_eq!(StressUnit::convert(12.5, StressUnit::Bar, StressUnit::Bar), 12.5);
    }

    #[test]
    fn test_bar_to_mpa() {
        let v = StressUnit::convert(250.0, StressUnit::Bar, StressUnit::MPa);
        assert!((v - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_psi_round_trip() {
        let mpa = StressUnit::convert(1000.0, StressUnit::Psi, StressUnit::MPa);
        assert!((mpa - 6.894_757_293_168_361).abs() < 1e-9);
        let back = StressUnit::convert(mpa, StressUnit::MPa, StressUnit::Psi);
        assert!((back - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_symbols() {
        assert_eq!(StressUnit::MPa.symbol(), "MPa");
        assert_eq!(StressUnit::default(), StressUnit::MPa);
    }
}
