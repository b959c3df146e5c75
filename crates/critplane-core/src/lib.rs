//! Critical-plane multiaxial fatigue damage.
//!
//! A stress tensor history is resolved onto a grid of candidate planes. For
//! every plane the scalar normal-stress signal is reduced to its turning
//! points, rainflow counted, corrected for mean stress and summed with the
//! Palmgren–Miner rule. The plane with the largest damage is the critical
//! plane.

pub mod config;
pub mod damage;
pub mod error;
pub mod extrema;
pub mod multiaxial;
pub mod rainflow;
pub mod series;
pub mod stress_table;
pub mod synthetic;
pub mod tensor;
pub mod units;

pub use config::{FailurePolicy, FatigueConfig};
pub use damage::{corrected_amplitude, DamageCalculator, SnCurve};
pub use error::{FatigueError, Result};
pub use extrema::{ExtremaExtractor, ExtremaSequence, StressBins, DEFAULT_NUM_BINS};
pub use multiaxial::{
    analyze_signal, scale_stresses, signal_damage, triaxiality_factor, CellFailure,
    ChannelDamage, CriticalPlane, DamageSurface, MultiaxialDamageCalculator, OrientationGrid,
    SignalAnalysis,
};
pub use rainflow::{RainflowCounter, RainflowMatrix, RainflowPass};
pub use series::StressSeries;
pub use stress_table::{BilinearTable, BoundaryHandling, StressTable, StressTableSet};
pub use tensor::{
    plane_normal, principal_stresses, rotation_matrix, PrincipalStresses, StressTensor,
};
pub use units::StressUnit;
