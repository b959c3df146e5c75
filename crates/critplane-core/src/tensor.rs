//! Stress tensor algebra for critical-plane evaluation
//!
//! Provides:
//! - Symmetric stress tensor in Voigt order (s11, s22, s33, s12, s13, s23)
//! - Principal stresses from the cubic invariants (trigonometric solution)
//! - Two-angle rotation matrix for candidate material planes
//! - Similarity transform `R·S·Rᵀ` and normal stress on a plane
//!
//! ## Usage
//!
//! ```rust
//! use critplane_core::tensor::{plane_normal, StressTensor};
//!
//! let stress = StressTensor::new(100.0, 0.0, 0.0, 0.0, 0.0, 0.0);
//! let normal = plane_normal(0.0, 0.0);
//! assert!((stress.normal_stress(&normal) - 100.0).abs() < 1e-12);
//! ```

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{FatigueError, Result};

/// Relative tolerance for the symmetry check of full 3×3 input
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// Below this (relative) value of `I1² - 3·I2` the tensor is treated as isotropic
const ISOTROPIC_TOLERANCE: f64 = 1e-14;

/// Symmetric 3×3 stress tensor stored by its six independent components
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StressTensor {
    /// Normal component 11
    pub s11: f64,
    /// Normal component 22
    pub s22: f64,
    /// Normal component 33
    pub s33: f64,
    /// Shear component 12
    pub s12: f64,
    /// Shear component 13
    pub s13: f64,
    /// Shear component 23
    pub s23: f64,
}

/// Principal stresses sorted ascending (`values[0] <= values[1] <= values[2]`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipalStresses {
    pub values: [f64; 3],
}

impl PrincipalStresses {
    /// Smallest (most compressive) principal stress
    pub fn min(&self) -> f64 {
        self.values[0]
    }

    /// Intermediate principal stress
    pub fn mid(&self) -> f64 {
        self.values[1]
    }

    /// Largest (most tensile) principal stress
    pub fn max(&self) -> f64 {
        self.values[2]
    }
}

impl StressTensor {
    pub fn new(s11: f64, s22: f64, s33: f64, s12: f64, s13: f64, s23: f64) -> Self {
        Self {
            s11,
            s22,
            s33,
            s12,
            s13,
            s23,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Diagonal tensor (principal axes aligned with the coordinate axes)
    pub fn diagonal(s11: f64, s22: f64, s33: f64) -> Self {
        Self::new(s11, s22, s33, 0.0, 0.0, 0.0)
    }

    /// Build from Voigt components `[s11, s22, s33, s12, s13, s23]`
    pub fn from_voigt(v: [f64; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }

    pub fn to_voigt(&self) -> [f64; 6] {
        [self.s11, self.s22, self.s33, self.s12, self.s13, self.s23]
    }

    /// Build from a full 3×3 matrix, rejecting non-symmetric input
    ///
    /// The off-diagonal pairs are averaged once they pass the check.
    pub fn from_matrix(m: &Matrix3<f64>) -> Result<Self> {
        let scale = m.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
        let deviation = [(0, 1), (0, 2), (1, 2)]
            .iter()
            .map(|&(i, j)| (m[(i, j)] - m[(j, i)]).abs())
            .fold(0.0_f64, f64::max);
        if !(deviation <= SYMMETRY_TOLERANCE * scale) {
            return Err(FatigueError::NonSymmetricTensor {
                index: 0,
                deviation,
            });
        }
        Ok(Self::new(
            m[(0, 0)],
            m[(1, 1)],
            m[(2, 2)],
            0.5 * (m[(0, 1)] + m[(1, 0)]),
            0.5 * (m[(0, 2)] + m[(2, 0)]),
            0.5 * (m[(1, 2)] + m[(2, 1)]),
        ))
    }

    pub fn to_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.s11, self.s12, self.s13, //
            self.s12, self.s22, self.s23, //
            self.s13, self.s23, self.s33,
        )
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_voigt(self.to_voigt().map(|c| c * factor))
    }

    pub fn max_abs_component(&self) -> f64 {
        self.to_voigt().iter().fold(0.0, |acc, c| acc.max(c.abs()))
    }

    pub fn is_finite(&self) -> bool {
        self.to_voigt().iter().all(|c| c.is_finite())
    }

    /// Stress invariants `(I1, I2, I3)`
    ///
    /// - I1 = tr(S)
    /// - I2 = sum of the 2×2 principal minors
    /// - I3 = det(S)
    pub fn invariants(&self) -> (f64, f64, f64) {
        let s = self;
        let i1 = s.s11 + s.s22 + s.s33;
        let i2 = s.s11 * s.s22 + s.s22 * s.s33 + s.s33 * s.s11
            - s.s12.powi(2)
            - s.s23.powi(2)
            - s.s13.powi(2);
        let i3 = s.s11 * s.s22 * s.s33
            - s.s11 * s.s23.powi(2)
            - s.s22 * s.s13.powi(2)
            - s.s33 * s.s12.powi(2)
            + 2.0 * s.s12 * s.s23 * s.s13;
        (i1, i2, i3)
    }

    pub fn principal(&self) -> PrincipalStresses {
        principal_stresses(self)
    }

    /// Similarity transform `R·S·Rᵀ`
    pub fn rotated(&self, rotation: &Matrix3<f64>) -> StressTensor {
        transform(rotation, self)
    }

    /// Normal stress on the plane with unit normal `n`: `n·S·nᵀ`
    pub fn normal_stress(&self, normal: &Vector3<f64>) -> f64 {
        resolve(self, normal)
    }

    /// von Mises equivalent stress
    ///
    /// Formula:
    /// σ_v = sqrt(0.5 * [(σ11 - σ22)² + (σ22 - σ33)² + (σ33 - σ11)²]
    ///   + 3 * [σ12² + σ23² + σ13²])
    pub fn von_mises(&self) -> f64 {
        let term1 = 0.5
            * ((self.s11 - self.s22).powi(2)
                + (self.s22 - self.s33).powi(2)
                + (self.s33 - self.s11).powi(2));
        let term2 = 3.0 * (self.s12.powi(2) + self.s23.powi(2) + self.s13.powi(2));
        (term1 + term2).sqrt()
    }

    /// Hydrostatic (mean) stress, `tr(S) / 3`
    pub fn hydrostatic(&self) -> f64 {
        (self.s11 + self.s22 + self.s33) / 3.0
    }
}

/// Compute principal stresses from the cubic invariants
///
/// ```text
/// phiArg = (2·I1³ − 9·I1·I2 + 27·I3) / (2·(I1² − 3·I2)^1.5)
/// phi    = acos(phiArg) / 3
/// s_j    = I1/3 + 2/3·sqrt(I1² − 3·I2)·cos(phi + 2π·j/3),  j = 0, 1, 2
/// ```
///
/// `phiArg` outside [-1, 1] (rounding) maps to phi = π/3 or phi = 0. An
/// isotropic tensor (`I1² − 3·I2` ≈ 0) returns `I1/3` three times.
///
/// # Returns
///
/// Principal stresses sorted ascending
pub fn principal_stresses(stress: &StressTensor) -> PrincipalStresses {
    let (i1, i2, i3) = stress.invariants();
    let scale = stress.max_abs_component();
    let discriminant = (i1 * i1 - 3.0 * i2).max(0.0);

    if scale == 0.0 || discriminant <= ISOTROPIC_TOLERANCE * scale * scale {
        let mean = i1 / 3.0;
        return PrincipalStresses {
            values: [mean; 3],
        };
    }

    let phi_arg =
        (2.0 * i1.powi(3) - 9.0 * i1 * i2 + 27.0 * i3) / (2.0 * discriminant.powf(1.5));
    let phi = if phi_arg <= -1.0 {
        PI / 3.0
    } else if phi_arg >= 1.0 {
        0.0
    } else {
        phi_arg.acos() / 3.0
    };

    let radius = 2.0 / 3.0 * discriminant.sqrt();
    let mut values = [0.0; 3];
    for (j, value) in values.iter_mut().enumerate() {
        *value = i1 / 3.0 + radius * (phi + 2.0 / 3.0 * PI * j as f64).cos();
    }
    values.sort_by(f64::total_cmp);

    PrincipalStresses { values }
}

/// Two-angle rotation matrix of a candidate plane
///
/// Rows:
/// - R[0] = ( cosθ·sinφ,  sinθ·sinφ, cosφ)
/// - R[1] = (-sinθ,       cosθ,      0   )
/// - R[2] = (-cosθ·cosφ, -sinθ·cosφ, sinφ)
pub fn rotation_matrix(theta: f64, phi: f64) -> Matrix3<f64> {
    let (st, ct) = theta.sin_cos();
    let (sp, cp) = phi.sin_cos();
    Matrix3::new(
        ct * sp, st * sp, cp, //
        -st, ct, 0.0, //
        -ct * cp, -st * cp, sp,
    )
}

/// Unit normal of the plane (θ, φ)
///
/// This is row 2 of [`rotation_matrix`], so that the resolved stress equals
/// the (3,3) component of the rotated tensor.
pub fn plane_normal(theta: f64, phi: f64) -> Vector3<f64> {
    rotation_matrix(theta, phi).row(2).transpose()
}

/// Normal stress `n·S·nᵀ` on the plane with unit normal `n`
pub fn resolve(stress: &StressTensor, normal: &Vector3<f64>) -> f64 {
    let (n1, n2, n3) = (normal[0], normal[1], normal[2]);
    let s = stress;
    s.s11 * n1 * n1
        + s.s22 * n2 * n2
        + s.s33 * n3 * n3
        + 2.0 * (s.s12 * n1 * n2 + s.s13 * n1 * n3 + s.s23 * n2 * n3)
}

/// Similarity transform `R·S·Rᵀ`
pub fn transform(rotation: &Matrix3<f64>, stress: &StressTensor) -> StressTensor {
    let rotated = rotation * stress.to_matrix() * rotation.transpose();
    StressTensor::new(
        rotated[(0, 0)],
        rotated[(1, 1)],
        rotated[(2, 2)],
        0.5 * (rotated[(0, 1)] + rotated[(1, 0)]),
        0.5 * (rotated[(0, 2)] + rotated[(2, 0)]),
        0.5 * (rotated[(1, 2)] + rotated[(2, 1)]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_principal_diagonal_is_sorted_diagonal() {
        let stress = StressTensor::diagonal(30.0, -10.0, 20.0);
        let p = principal_stresses(&stress);
        assert_close(p.min(), -10.0, 1e-9);
        assert_close(p.mid(), 20.0, 1e-9);
        assert_close(p.max(), 30.0, 1e-9);
    }

    #[test]
    fn test_principal_uniaxial() {
        let p = StressTensor::new(100.0, 0.0, 0.0, 0.0, 0.0, 0.0).principal();
        assert_close(p.max(), 100.0, 1e-9);
        assert_close(p.mid(), 0.0, 1e-9);
        assert_close(p.min(), 0.0, 1e-9);
    }

    #[test]
    fn test_principal_pure_shear() {
        let p = StressTensor::new(0.0, 0.0, 0.0, 50.0, 0.0, 0.0).principal();
        assert_close(p.min(), -50.0, 1e-9);
        assert_close(p.mid(), 0.0, 1e-9);
        assert_close(p.max(), 50.0, 1e-9);
    }

    #[test]
    fn test_principal_isotropic_has_no_nan() {
        let p = StressTensor::diagonal(-7.5, -7.5, -7.5).principal();
        for v in p.values {
            assert!(v.is_finite());
            assert_close(v, -7.5, 1e-12);
        }

        let zero = StressTensor::zero().principal();
        assert_eq!(zero.values, [0.0; 3]);
    }

    #[test]
    fn test_principal_general_matches_invariants() {
        let stress = StressTensor::new(100.0, 50.0, 30.0, 10.0, 5.0, 3.0);
        let p = stress.principal();
        let (i1, i2, i3) = stress.invariants();
        let [a, b, c] = p.values;
        assert!(a <= b && b <= c);
        assert_close(a + b + c, i1, 1e-9);
        assert_close(a * b + b * c + c * a, i2, 1e-6);
        assert_close(a * b * c, i3, 1e-3);
    }

    #[test]
    fn test_rotation_matrix_is_orthonormal() {
        for &(theta, phi) in &[(0.0, 0.0), (0.3, 1.1), (2.5, 0.7), (PI / 2.0, PI / 4.0)] {
            let r = rotation_matrix(theta, phi);
            let identity = r * r.transpose();
            assert!((identity - Matrix3::identity()).norm() < 1e-12);
        }
    }

    #[test]
    fn test_rotation_matrix_rows() {
        let (theta, phi) = (0.4_f64, 1.2_f64);
        let r = rotation_matrix(theta, phi);
        assert_close(r[(0, 0)], theta.cos() * phi.sin(), 1e-15);
        assert_close(r[(0, 2)], phi.cos(), 1e-15);
        assert_close(r[(1, 0)], -theta.sin(), 1e-15);
        assert_close(r[(1, 2)], 0.0, 1e-15);
        assert_close(r[(2, 1)], -theta.sin() * phi.cos(), 1e-15);
        assert_close(r[(2, 2)], phi.sin(), 1e-15);
    }

    #[test]
    fn test_resolve_equals_rotated_33_component() {
        let stress = StressTensor::new(120.0, -40.0, 15.0, 22.0, -8.0, 5.0);
        let (theta, phi) = (0.9, 0.35);
        let r = rotation_matrix(theta, phi);
        let rotated = stress.rotated(&r);
        let resolved = stress.normal_stress(&plane_normal(theta, phi));
        assert_close(resolved, rotated.s33, 1e-9);
    }

    #[test]
    fn test_rotation_preserves_principal_stresses() {
        let stress = StressTensor::new(80.0, 20.0, -30.0, 15.0, 4.0, -6.0);
        let rotated = stress.rotated(&rotation_matrix(1.3, 0.6));
        let a = stress.principal().values;
        let b = rotated.principal().values;
        for i in 0..3 {
            assert_close(a[i], b[i], 1e-8);
        }
    }

    #[test]
    fn test_from_matrix_rejects_non_symmetric() {
        let m = Matrix3::new(1.0, 2.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            StressTensor::from_matrix(&m),
            Err(FatigueError::NonSymmetricTensor { .. })
        ));

        let stress = StressTensor::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(StressTensor::from_matrix(&stress.to_matrix()), Ok(stress));
    }

    #[test]
    fn test_von_mises_and_hydrostatic() {
        let shear = StressTensor::new(0.0, 0.0, 0.0, 100.0, 0.0, 0.0);
        assert_close(shear.von_mises(), 3.0_f64.sqrt() * 100.0, 1e-9);
        let stress = StressTensor::diagonal(100.0, 50.0, 25.0);
        assert_close(stress.hydrostatic(), 175.0 / 3.0, 1e-12);
    }
}
