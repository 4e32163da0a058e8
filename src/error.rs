//! Error taxonomy for the crystallographic core.
//!
//! Numerical impossibilities are errors. Physically questionable but
//! computable results are reported as `CompatibilityWarning` values instead.

use nalgebra::{Matrix3, Vector3};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CrystalError {
    /// The unit cell does not describe a valid, non-degenerate crystal cell.
    #[error(
        "Invalid unit cell (a={a}, b={b}, c={c}, alpha={alpha}, beta={beta}, gamma={gamma}): {reason}"
    )]
    Geometry {
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
        reason: String,
    },

    /// Angle requested between vectors where at least one has zero length.
    #[error("Cannot measure an angle with a zero-length vector: v1={v1:?}, v2={v2:?}")]
    DegenerateVector { v1: Vector3<f64>, v2: Vector3<f64> },

    /// A lattice (or tensor) that must be inverted is singular.
    #[error("Matrix is not invertible: {matrix:?}")]
    SingularLattice { matrix: Matrix3<f64> },

    /// A deformation gradient supplied directly does not preserve orientation.
    #[error("Deformation gradient must have a positive determinant, got {determinant}")]
    NonPositiveDeterminant { determinant: f64 },

    /// The twinning equation has no well-defined solution (lambda_1 == lambda_3).
    #[error(
        "Twinning equations are singular for eigenvalues [{:.6}, {:.6}, {:.6}]",
        .eigenvalues[0], .eigenvalues[1], .eigenvalues[2]
    )]
    CompatibilityDegeneracy { eigenvalues: [f64; 3] },
}

pub type CrystalResult<T> = Result<T, CrystalError>;

/// Non-fatal diagnostic: the eigenvalues of C violate
/// `lambda_1 <= 1 = lambda_2 <= lambda_3` beyond the configured tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompatibilityWarning {
    pub eigenvalues: [f64; 3],
    pub tolerance: f64,
}

impl fmt::Display for CompatibilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "eigenvalues do not satisfy kinematic compatibility (tol {:e}): lam1 = {:.6}, lam2 = {:.6}, lam3 = {:.6}",
            self.tolerance, self.eigenvalues[0], self.eigenvalues[1], self.eigenvalues[2]
        )
    }
}
