//! Kinematic compatibility (twinning equation) solver.
//!
//! Given a deformation gradient `F` and a reference shape tensor `G`, finds
//! the habit-plane normal `n` and shear vector `a` such that
//! `(I + a (x) n)^T (I + a (x) n) = C` with `C = G^-T F^T F G^-1`.
//! Both twin branches (Type I, kappa = +1 and Type II, kappa = -1) are
//! returned; picking one is left to the caller.

use crate::core::kinematics::DeformationGradient;
use crate::error::{CompatibilityWarning, CrystalError, CrystalResult};
use crate::math::eigen::{sorted_symmetric_eigen, SortedEigen};
use log::{debug, warn};
use nalgebra::{Matrix3, Vector3};
use std::fmt;

// ============================================================================
// CONFIGURATION & RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompatibilityConfig {
    /// Allowed deviation of the middle eigenvalue from 1. The outer
    /// eigenvalues must bracket 1 exactly. `0.0` demands exact equality.
    pub tolerance: f64,
}

impl Default for CompatibilityConfig {
    fn default() -> Self {
        Self { tolerance: 1e-3 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwinType {
    /// kappa = +1
    TypeOne,
    /// kappa = -1
    TypeTwo,
}

impl TwinType {
    pub fn kappa(self) -> f64 {
        match self {
            TwinType::TypeOne => 1.0,
            TwinType::TypeTwo => -1.0,
        }
    }
}

impl fmt::Display for TwinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TwinType::TypeOne => write!(f, "Type I"),
            TwinType::TypeTwo => write!(f, "Type II"),
        }
    }
}

/// One branch of the twinning solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwinSolution {
    pub twin_type: TwinType,
    /// Unit habit-plane normal (Cartesian).
    pub normal: Vector3<f64>,
    /// Shear vector, scaled so that `I + a (x) n` solves the twinning equation.
    pub shear_vector: Vector3<f64>,
    /// `|a| * |G^-1 n|`
    pub shear_magnitude: f64,
    /// Unit shear direction `a / |a|`.
    pub shear_direction: Vector3<f64>,
    /// Unit twin-plane normal in the reference frame, `G^-1 n / |G^-1 n|`.
    pub twin_plane_normal: Vector3<f64>,
}

impl TwinSolution {
    /// `I + a (x) n`
    pub fn invariant_plane_strain(&self) -> Matrix3<f64> {
        Matrix3::identity() + self.shear_vector * self.normal.transpose()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompatibilitySolution {
    pub type_one: TwinSolution,
    pub type_two: TwinSolution,
    /// Ascending eigenvalues of `C`.
    pub eigenvalues: [f64; 3],
    /// Set when the eigenvalues fail the compatibility check; the numbers
    /// above are still computed on a best-effort basis.
    pub warning: Option<CompatibilityWarning>,
}

impl CompatibilitySolution {
    pub fn branch(&self, twin_type: TwinType) -> &TwinSolution {
        match twin_type {
            TwinType::TypeOne => &self.type_one,
            TwinType::TypeTwo => &self.type_two,
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.warning.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KinematicOutcome {
    /// `C` is exactly the identity: the lattices already fit, nothing to twin.
    Untransformed,
    Twinned(CompatibilitySolution),
}

impl KinematicOutcome {
    pub fn solution(&self) -> Option<&CompatibilitySolution> {
        match self {
            KinematicOutcome::Untransformed => None,
            KinematicOutcome::Twinned(sol) => Some(sol),
        }
    }
}

// ============================================================================
// SOLVER
// ============================================================================

pub struct CompatibilitySolver {
    config: CompatibilityConfig,
}

impl CompatibilitySolver {
    pub fn new(config: CompatibilityConfig) -> Self {
        Self { config }
    }

    /// Solves the twinning equation for `F` against the shape tensor `G`.
    pub fn solve(&self, f: &DeformationGradient, g: &Matrix3<f64>) -> CrystalResult<KinematicOutcome> {
        let g_inv = g
            .try_inverse()
            .ok_or(CrystalError::SingularLattice { matrix: *g })?;

        // 1. C = G^-T F^T F G^-1
        let c = g_inv.transpose() * f.right_cauchy_green() * g_inv;
        debug!("C = {:?}", c);

        // 2. Exact identity is a terminal state, not an error.
        if c == Matrix3::identity() {
            return Ok(KinematicOutcome::Untransformed);
        }

        // 3. Ascending eigenpairs with fixed eigenvector signs.
        let eig = sorted_symmetric_eigen(&c);
        let lam = [eig.value(0), eig.value(1), eig.value(2)];
        debug!("eigenvalues of C: {:?}", lam);

        // 4. Compatibility check (non-fatal).
        let warning = self.check(lam);
        if let Some(w) = &warning {
            warn!("{}", w);
        }

        // 5. Both branches.
        let type_one = twin_branch(&eig, g, &g_inv, TwinType::TypeOne)?;
        let type_two = twin_branch(&eig, g, &g_inv, TwinType::TypeTwo)?;

        Ok(KinematicOutcome::Twinned(CompatibilitySolution {
            type_one,
            type_two,
            eigenvalues: lam,
            warning,
        }))
    }

    fn check(&self, lam: [f64; 3]) -> Option<CompatibilityWarning> {
        let tol = self.config.tolerance;
        let ok = lam[0] <= 1.0 && (lam[1] - 1.0).abs() <= tol && lam[2] >= 1.0;
        if ok {
            None
        } else {
            Some(CompatibilityWarning { eigenvalues: lam, tolerance: tol })
        }
    }
}

/// Convenience wrapper over [`CompatibilitySolver`].
pub fn kin_comp(
    f: &DeformationGradient,
    g: &Matrix3<f64>,
    config: &CompatibilityConfig,
) -> CrystalResult<KinematicOutcome> {
    CompatibilitySolver::new(*config).solve(f, g)
}

fn twin_branch(
    eig: &SortedEigen,
    g: &Matrix3<f64>,
    g_inv: &Matrix3<f64>,
    twin_type: TwinType,
) -> CrystalResult<TwinSolution> {
    let (l1, l3) = (eig.value(0), eig.value(2));
    let (e1, e3) = (eig.vector(0), eig.vector(2));
    let kappa = twin_type.kappa();
    let degenerate = || CrystalError::CompatibilityDegeneracy {
        eigenvalues: [l1, eig.value(1), l3],
    };

    let gap = l3 - l1;
    if gap <= 1e-12 * l3.abs().max(1.0) {
        return Err(degenerate());
    }

    // Negative radicands only occur for incompatible C; clamp to keep going.
    let root = |x: f64| x.max(0.0).sqrt();

    let prefactor = (root(l3) - root(l1)) / gap.sqrt();
    let n_raw = (g.transpose() * e1 * -root(1.0 - l1) + g.transpose() * e3 * (kappa * root(l3 - 1.0))) * prefactor;
    let rho = n_raw.norm();
    if !(rho > 0.0) {
        return Err(degenerate());
    }
    let normal = n_raw / rho;

    let shear_vector = (e1 * root(l3 * (1.0 - l1) / gap) + e3 * (kappa * root(l1 * (l3 - 1.0) / gap))) * rho;
    let a_norm = shear_vector.norm();
    if !(a_norm > 0.0) {
        return Err(degenerate());
    }

    let k_raw = g_inv * normal;
    let k_norm = k_raw.norm();

    Ok(TwinSolution {
        twin_type,
        normal,
        shear_vector,
        shear_magnitude: a_norm * k_norm,
        shear_direction: shear_vector / a_norm,
        twin_plane_normal: k_raw / k_norm,
    })
}
