use nalgebra::{Matrix3, Vector3};

/// Eigen-decomposition of a symmetric 3x3 tensor with a reproducible layout.
#[derive(Debug, Clone, Copy)]
pub struct SortedEigen {
    /// Eigenvalues in ascending order.
    pub values: Vector3<f64>,
    /// Column `i` is the unit eigenvector of `values[i]`.
    pub vectors: Matrix3<f64>,
}

impl SortedEigen {
    pub fn value(&self, i: usize) -> f64 {
        self.values[i]
    }

    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.vectors.column(i).into_owned()
    }

    /// Rebuilds `sum f(lambda_i) e_i (x) e_i`.
    pub fn spectral_map<F: Fn(f64) -> f64>(&self, f: F) -> Matrix3<f64> {
        (0..3).fold(Matrix3::zeros(), |acc, i| {
            let e = self.vector(i);
            acc + (e * e.transpose()) * f(self.values[i])
        })
    }
}

/// Decomposes a symmetric tensor, sorting eigenpairs by ascending eigenvalue.
///
/// Eigenvector signs are fixed so that the component with the largest
/// magnitude is positive (lowest index wins ties). The twinning formulas are
/// sign-sensitive, so this keeps results independent of solver internals.
pub fn sorted_symmetric_eigen(tensor: &Matrix3<f64>) -> SortedEigen {
    // Symmetrise first: products like G^-T F^T F G^-1 drift by round-off.
    let sym = (tensor + tensor.transpose()) * 0.5;
    let eigen = sym.symmetric_eigen();

    let mut pairs: Vec<(f64, Vector3<f64>)> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .map(|(i, &val)| (val, eigen.eigenvectors.column(i).into_owned()))
        .collect();

    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut values = Vector3::zeros();
    let mut vectors = Matrix3::zeros();
    for (i, (val, vec)) in pairs.into_iter().enumerate() {
        values[i] = val;
        vectors.set_column(i, &canonical_sign(vec.normalize()));
    }

    SortedEigen { values, vectors }
}

/// Flips `v` so its largest-magnitude component is positive.
pub fn canonical_sign(v: Vector3<f64>) -> Vector3<f64> {
    let mut pivot = 0;
    for i in 1..3 {
        if v[i].abs() > v[pivot].abs() {
            pivot = i;
        }
    }
    if v[pivot] < 0.0 { -v } else { v }
}
