use crate::error::{CrystalError, CrystalResult};
use nalgebra::{Matrix3, Vector3};
use std::fmt;

// ============================================================================
// UNIT CELL
// ============================================================================

/// Measured unit-cell parameters. Lengths in Å (or any consistent unit),
/// angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitCell {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl UnitCell {
    pub fn new(lengths: [f64; 3], angles: [f64; 3]) -> Self {
        Self {
            a: lengths[0],
            b: lengths[1],
            c: lengths[2],
            alpha: angles[0],
            beta: angles[1],
            gamma: angles[2],
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> CrystalError {
        CrystalError::Geometry {
            a: self.a,
            b: self.b,
            c: self.c,
            alpha: self.alpha,
            beta: self.beta,
            gamma: self.gamma,
            reason: reason.into(),
        }
    }

    /// Builds the lattice matrix with `a` along axis 1 and `b` in the 1-2 plane:
    ///
    /// ```text
    /// [[a1, b1, c1],
    ///  [0,  b2, c2],
    ///  [0,  0,  c3]]
    /// ```
    pub fn to_lattice(&self) -> CrystalResult<Lattice> {
        for (name, len) in [("a", self.a), ("b", self.b), ("c", self.c)] {
            if !(len.is_finite() && len > 0.0) {
                return Err(self.invalid(format!("length {} must be positive", name)));
            }
        }
        for (name, ang) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !(ang.is_finite() && ang > 0.0 && ang < 180.0) {
                return Err(self.invalid(format!("angle {} must lie in (0, 180) degrees", name)));
            }
        }

        let (ca, cb, cg) = (
            self.alpha.to_radians().cos(),
            self.beta.to_radians().cos(),
            self.gamma.to_radians().cos(),
        );
        let sg = self.gamma.to_radians().sin();
        if sg.abs() < 1e-12 {
            return Err(self.invalid("sin(gamma) is zero"));
        }

        let radicand = 1.0 - ca.powi(2) - cb.powi(2) - cg.powi(2) + 2.0 * ca * cb * cg;
        if radicand <= 0.0 {
            return Err(self.invalid(format!("angles give a non-positive volume term ({:e})", radicand)));
        }

        let matrix = Matrix3::new(
            self.a, self.b * cg, self.c * cb,
            0.0, self.b * sg, (self.c / sg) * (ca - cb * cg),
            0.0, 0.0, (self.c / sg) * radicand.sqrt(),
        );

        if matrix.iter().any(|x| !x.is_finite()) {
            return Err(self.invalid("lattice matrix contains non-finite entries"));
        }

        Lattice::new(matrix)
    }
}

// ============================================================================
// LATTICE
// ============================================================================

/// Lattice matrix whose columns are the basis vectors in Cartesian coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lattice {
    pub matrix: Matrix3<f64>,
    /// Cached inverse, maps Cartesian to fractional coordinates.
    pub inverse: Matrix3<f64>,
}

impl Lattice {
    pub fn new(matrix: Matrix3<f64>) -> CrystalResult<Self> {
        if matrix.determinant() <= 0.0 {
            return Err(CrystalError::SingularLattice { matrix });
        }
        let inverse = matrix
            .try_inverse()
            .ok_or(CrystalError::SingularLattice { matrix })?;
        Ok(Self { matrix, inverse })
    }

    pub fn volume(&self) -> f64 {
        self.matrix.determinant()
    }

    /// `h*a + k*b + l*c`.
    pub fn to_cartesian(&self, miller: &MillerIndex) -> Vector3<f64> {
        self.matrix * miller.as_vector()
    }

    /// Solves `matrix * frac = cart`. Not normalised; see [`MillerIndex::normalized`].
    pub fn to_fractional(&self, cart: &Vector3<f64>) -> MillerIndex {
        MillerIndex::from(self.inverse * cart)
    }

    pub fn to_parameters(&self) -> UnitCell {
        let (va, vb, vc) = (self.matrix.column(0), self.matrix.column(1), self.matrix.column(2));
        let (a, b, c) = (va.norm(), vb.norm(), vc.norm());
        let angle = |u: f64| u.clamp(-1.0, 1.0).acos().to_degrees();
        UnitCell {
            a,
            b,
            c,
            alpha: angle(vb.dot(&vc) / (b * c)),
            beta: angle(va.dot(&vc) / (a * c)),
            gamma: angle(va.dot(&vb) / (a * b)),
        }
    }
}

/// Unit cell parameters to lattice vectors.
pub fn unit2vect(lengths: [f64; 3], angles: [f64; 3]) -> CrystalResult<Lattice> {
    UnitCell::new(lengths, angles).to_lattice()
}

/// Fractional (Miller) coordinates to a Cartesian vector.
pub fn frac2cart(miller: &MillerIndex, lattice: &Lattice) -> Vector3<f64> {
    lattice.to_cartesian(miller)
}

/// Cartesian vector to fractional (Miller) coordinates.
pub fn cart2frac(cart: &Vector3<f64>, lattice: &Lattice) -> MillerIndex {
    lattice.to_fractional(cart)
}

// ============================================================================
// MILLER INDEX
// ============================================================================

/// Direction `(h, k, l)` in fractional coordinates. Components may be
/// non-integral once converted back from Cartesian space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MillerIndex {
    pub h: f64,
    pub k: f64,
    pub l: f64,
}

impl MillerIndex {
    pub fn new(h: f64, k: f64, l: f64) -> Self {
        Self { h, k, l }
    }

    pub fn from_integers(h: i32, k: i32, l: i32) -> Self {
        Self::new(h as f64, k as f64, l as f64)
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.h, self.k, self.l)
    }

    pub fn norm(&self) -> f64 {
        self.as_vector().norm()
    }

    /// Unit-length copy; `None` for the zero index.
    pub fn normalized(&self) -> Option<Self> {
        self.as_vector().try_normalize(0.0).map(Self::from)
    }
}

impl From<Vector3<f64>> for MillerIndex {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<[i32; 3]> for MillerIndex {
    fn from(hkl: [i32; 3]) -> Self {
        Self::from_integers(hkl[0], hkl[1], hkl[2])
    }
}

impl fmt::Display for MillerIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4} {:.4} {:.4})", self.h, self.k, self.l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triclinic() -> UnitCell {
        UnitCell::new([6.1748, 9.9126, 19.6020], [84.484, 86.208, 88.252])
    }

    #[test]
    fn test_lattice_is_upper_triangular_with_positive_diagonal() {
        for cell in [
            triclinic(),
            UnitCell::new([3.8672, 30.896, 6.0220], [90.0, 90.489, 90.0]),
            UnitCell::new([5.0, 5.0, 8.0], [90.0, 90.0, 120.0]),
        ] {
            let m = cell.to_lattice().unwrap().matrix;
            assert_eq!(m[(1, 0)], 0.0);
            assert_eq!(m[(2, 0)], 0.0);
            assert_eq!(m[(2, 1)], 0.0);
            assert!(m[(0, 0)] > 0.0 && m[(1, 1)] > 0.0 && m[(2, 2)] > 0.0);
        }
    }

    #[test]
    fn test_cubic_cell_is_diagonal() {
        let lattice = unit2vect([2.0, 3.0, 4.0], [90.0, 90.0, 90.0]).unwrap();
        let expected = Matrix3::from_diagonal(&Vector3::new(2.0, 3.0, 4.0));
        assert!((lattice.matrix - expected).norm() < 1e-12);
        assert!((lattice.volume() - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_parameters_round_trip() {
        let cell = triclinic();
        let back = cell.to_lattice().unwrap().to_parameters();
        for (x, y) in [
            (cell.a, back.a), (cell.b, back.b), (cell.c, back.c),
            (cell.alpha, back.alpha), (cell.beta, back.beta), (cell.gamma, back.gamma),
        ] {
            assert!((x - y).abs() < 1e-9, "{} vs {}", x, y);
        }
    }

    #[test]
    fn test_fractional_cartesian_round_trip() {
        let lattice = triclinic().to_lattice().unwrap();
        for hkl in [[1, 0, -1], [0, 0, 1], [2, -3, 5], [-1, 1, 1]] {
            let m = MillerIndex::from(hkl);
            let back = cart2frac(&frac2cart(&m, &lattice), &lattice);
            assert!((back.as_vector() - m.as_vector()).norm() < 1e-12);
        }
    }

    #[test]
    fn test_frac2cart_is_column_combination() {
        let lattice = triclinic().to_lattice().unwrap();
        let v = frac2cart(&MillerIndex::new(1.0, 0.0, -1.0), &lattice);
        let expected = lattice.matrix.column(0) - lattice.matrix.column(2);
        assert!((v - expected).norm() < 1e-12);
    }

    #[test]
    fn test_invalid_cells_are_rejected() {
        let bad = [
            UnitCell::new([0.0, 1.0, 1.0], [90.0, 90.0, 90.0]),
            UnitCell::new([1.0, 1.0, 1.0], [90.0, 90.0, 180.0]),
            UnitCell::new([1.0, 1.0, 1.0], [150.0, 150.0, 150.0]),
            UnitCell::new([1.0, f64::NAN, 1.0], [90.0, 90.0, 90.0]),
        ];
        for cell in bad {
            match cell.to_lattice() {
                Err(CrystalError::Geometry { a, .. }) => assert_eq!(a, cell.a),
                other => panic!("expected geometry error for {:?}, got {:?}", cell, other),
            }
        }
    }

    #[test]
    fn test_singular_matrix_is_rejected() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0);
        assert!(matches!(Lattice::new(m), Err(CrystalError::SingularLattice { .. })));
    }

    #[test]
    fn test_normalized_miller_index() {
        let m = MillerIndex::new(3.0, 0.0, -4.0).normalized().unwrap();
        assert!((m.norm() - 1.0).abs() < 1e-15);
        assert!((m.h - 0.6).abs() < 1e-15);
        assert!(MillerIndex::new(0.0, 0.0, 0.0).normalized().is_none());
    }
}
