use crate::analysis::compatibility::TwinType;
use crate::error::{CrystalError, CrystalResult};
use nalgebra::Vector3;

/// Best match between the analytic habit-plane normals and an observed one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleReport {
    /// Minimum angle in degrees.
    pub angle: f64,
    /// Analytic normal that achieved the minimum (Cartesian).
    pub normal: Vector3<f64>,
    pub twin_type: TwinType,
    /// True when the minimum was reached against the negated experimental vector.
    pub flipped: bool,
}

/// Angle between two vectors in degrees, in `[0, 180]`.
pub fn angle_between(v1: &Vector3<f64>, v2: &Vector3<f64>) -> CrystalResult<f64> {
    let norm1 = v1.norm();
    let norm2 = v2.norm();
    if norm1 == 0.0 || norm2 == 0.0 {
        return Err(CrystalError::DegenerateVector { v1: *v1, v2: *v2 });
    }

    // Clip: round-off pushes |cos| past 1 for (anti)parallel vectors.
    let cos = (v1.dot(v2) / (norm1 * norm2)).clamp(-1.0, 1.0);
    Ok(cos.acos().to_degrees())
}

/// Minimum angle over both twin branches and both signs of the experimental
/// normal. Candidates are checked in the order `(I, +)`, `(I, -)`,
/// `(II, +)`, `(II, -)`; the first one wins ties.
pub fn minimum_angle(
    type_one: &Vector3<f64>,
    type_two: &Vector3<f64>,
    experimental: &Vector3<f64>,
) -> CrystalResult<AngleReport> {
    let flipped_exp = -experimental;
    let candidates = [
        (type_one, TwinType::TypeOne, experimental, false),
        (type_one, TwinType::TypeOne, &flipped_exp, true),
        (type_two, TwinType::TypeTwo, experimental, false),
        (type_two, TwinType::TypeTwo, &flipped_exp, true),
    ];

    let (normal, twin_type, exp, flipped) = candidates[0];
    let mut best = AngleReport { angle: angle_between(normal, exp)?, normal: *normal, twin_type, flipped };
    for (normal, twin_type, exp, flipped) in candidates.into_iter().skip(1) {
        let angle = angle_between(normal, exp)?;
        if angle < best.angle {
            best = AngleReport { angle, normal: *normal, twin_type, flipped };
        }
    }
    Ok(best)
}
