use crate::core::structure::Lattice;
use crate::error::{CrystalError, CrystalResult};
use crate::math::eigen::sorted_symmetric_eigen;
use nalgebra::{Matrix3, Vector3};

// ============================================================================
// DEFORMATION GRADIENT
// ============================================================================

/// Linear map taking reference lattice vectors onto deformed ones.
/// Always orientation preserving (`det F > 0`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeformationGradient {
    matrix: Matrix3<f64>,
}

impl DeformationGradient {
    /// `F = deformed * reference^-1`.
    pub fn between(reference: &Lattice, deformed: &Lattice) -> CrystalResult<Self> {
        let ref_inv = reference
            .matrix
            .try_inverse()
            .ok_or(CrystalError::SingularLattice { matrix: reference.matrix })?;
        Self::from_matrix(deformed.matrix * ref_inv)
    }

    /// Wraps a gradient supplied directly, e.g. a stretch-tensor variant.
    pub fn from_matrix(matrix: Matrix3<f64>) -> CrystalResult<Self> {
        let determinant = matrix.determinant();
        if !(determinant > 0.0) {
            return Err(CrystalError::NonPositiveDeterminant { determinant });
        }
        Ok(Self { matrix })
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Right Cauchy-Green tensor `C = F^T F`.
    pub fn right_cauchy_green(&self) -> Matrix3<f64> {
        self.matrix.transpose() * self.matrix
    }

    /// `J = det F`, the ratio of deformed to reference volume.
    pub fn volume_ratio(&self) -> f64 {
        self.matrix.determinant()
    }

    /// Area ratio of a plane with reference normal `normal` (Nanson's formula):
    /// `J * |F^-T N| / |N|`.
    pub fn area_ratio(&self, normal: &Vector3<f64>) -> CrystalResult<f64> {
        let len = normal.norm();
        if len == 0.0 {
            return Err(CrystalError::DegenerateVector { v1: *normal, v2: *normal });
        }
        let inv_t = self
            .matrix
            .try_inverse()
            .ok_or(CrystalError::SingularLattice { matrix: self.matrix })?
            .transpose();
        Ok(self.volume_ratio() * (inv_t * normal).norm() / len)
    }

    /// Green-Lagrange strain `E = (C - I) / 2`.
    pub fn green_lagrange_strain(&self) -> Matrix3<f64> {
        (self.right_cauchy_green() - Matrix3::identity()) * 0.5
    }

    /// Eigenvalues of `U`, ascending.
    pub fn principal_stretches(&self) -> Vector3<f64> {
        sorted_symmetric_eigen(&self.right_cauchy_green())
            .values
            .map(|l| l.abs().sqrt())
    }

    pub fn polar_decompose(&self) -> CrystalResult<StretchRotation> {
        polar_decompose(self)
    }
}

/// Deformation gradient between two lattices.
pub fn deformation_gradient(reference: &Lattice, deformed: &Lattice) -> CrystalResult<DeformationGradient> {
    DeformationGradient::between(reference, deformed)
}

// ============================================================================
// POLAR DECOMPOSITION
// ============================================================================

/// Right polar decomposition `F = Q U`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchRotation {
    /// Symmetric positive-definite stretch tensor.
    pub stretch: Matrix3<f64>,
    /// Proper rotation.
    pub rotation: Matrix3<f64>,
}

impl StretchRotation {
    pub fn recompose(&self) -> Matrix3<f64> {
        self.rotation * self.stretch
    }
}

/// Computes `U = sqrt(F^T F)` spectrally and `Q = F U^-1`.
pub fn polar_decompose(f: &DeformationGradient) -> CrystalResult<StretchRotation> {
    let eig = sorted_symmetric_eigen(&f.right_cauchy_green());

    // abs() only absorbs round-off; C is positive semi-definite.
    let stretch = eig.spectral_map(|l| l.abs().sqrt());
    let stretch = (stretch + stretch.transpose()) * 0.5;

    let stretch_inv = stretch
        .try_inverse()
        .ok_or(CrystalError::SingularLattice { matrix: stretch })?;
    let rotation = f.matrix() * stretch_inv;

    Ok(StretchRotation { stretch, rotation })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::UnitCell;
    use nalgebra::Rotation3;

    fn sample_gradient() -> DeformationGradient {
        DeformationGradient::from_matrix(Matrix3::new(
            1.02, 0.05, -0.01,
            -0.03, 0.97, 0.04,
            0.02, -0.06, 1.08,
        ))
        .unwrap()
    }

    #[test]
    fn test_identical_lattices_give_identity() {
        let lattice = UnitCell::new([6.1748, 9.9126, 19.6020], [84.484, 86.208, 88.252])
            .to_lattice()
            .unwrap();
        let f = deformation_gradient(&lattice, &lattice).unwrap();
        assert!((f.matrix() - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_gradient_maps_reference_onto_deformed() {
        let reference = UnitCell::new([3.8672, 30.896, 6.0220], [90.0, 90.489, 90.0]).to_lattice().unwrap();
        let deformed = UnitCell::new([3.8653, 30.896, 6.0240], [90.0, 90.495, 90.0]).to_lattice().unwrap();
        let f = deformation_gradient(&reference, &deformed).unwrap();
        assert!((f.matrix() * reference.matrix - deformed.matrix).norm() < 1e-10);
        assert!((f.volume_ratio() - deformed.volume() / reference.volume()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_orientation_reversal() {
        let mirror = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        assert!(matches!(
            DeformationGradient::from_matrix(mirror),
            Err(CrystalError::NonPositiveDeterminant { .. })
        ));
    }

    #[test]
    fn test_polar_decomposition_properties() {
        let f = sample_gradient();
        let pd = f.polar_decompose().unwrap();

        assert!((pd.recompose() - f.matrix()).norm() < 1e-10);
        assert!((pd.stretch - pd.stretch.transpose()).norm() < 1e-14);
        assert!((pd.rotation.transpose() * pd.rotation - Matrix3::identity()).norm() < 1e-10);
        assert!((pd.rotation.determinant() - 1.0).abs() < 1e-10);
        assert!(pd.stretch.symmetric_eigen().eigenvalues.iter().all(|&l| l > 0.0));
    }

    #[test]
    fn test_pure_rotation_has_unit_stretch() {
        let rot = Rotation3::from_euler_angles(0.3, -0.7, 1.1).into_inner();
        let pd = DeformationGradient::from_matrix(rot).unwrap().polar_decompose().unwrap();
        assert!((pd.stretch - Matrix3::identity()).norm() < 1e-10);
        assert!((pd.rotation - rot).norm() < 1e-10);
    }

    #[test]
    fn test_derived_measures() {
        let stretch = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 1.2));
        let f = DeformationGradient::from_matrix(stretch).unwrap();

        assert!((f.volume_ratio() - 1.2).abs() < 1e-15);
        // Plane normal to x is stretched along z only.
        assert!((f.area_ratio(&Vector3::x()).unwrap() - 1.2).abs() < 1e-12);
        // Plane normal to z keeps its area.
        assert!((f.area_ratio(&Vector3::z()).unwrap() - 1.0).abs() < 1e-12);
        assert!((f.green_lagrange_strain()[(2, 2)] - 0.22).abs() < 1e-12);
        assert!((f.principal_stretches() - Vector3::new(1.0, 1.0, 1.2)).norm() < 1e-12);

        let identity = DeformationGradient::from_matrix(Matrix3::identity()).unwrap();
        assert_eq!(identity.green_lagrange_strain(), Matrix3::zeros());
        assert!(matches!(
            identity.area_ratio(&Vector3::zeros()),
            Err(CrystalError::DegenerateVector { .. })
        ));
    }
}
