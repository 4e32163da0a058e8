// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
pub mod core;
pub mod error;
pub mod io;
pub mod math;
pub mod analysis;

// ============================================================================
// RE-EXPORTS (Public API)
// ============================================================================
pub use crate::core::structure::{cart2frac, frac2cart, unit2vect, Lattice, MillerIndex, UnitCell};
pub use crate::core::kinematics::{deformation_gradient, polar_decompose, DeformationGradient, StretchRotation};
pub use crate::analysis::compatibility::{
    kin_comp, CompatibilityConfig, CompatibilitySolution, CompatibilitySolver, KinematicOutcome, TwinSolution,
    TwinType,
};
pub use crate::analysis::angles::{angle_between, minimum_angle, AngleReport};
pub use crate::error::{CompatibilityWarning, CrystalError, CrystalResult};
pub use crate::io::parser;

use anyhow::{Context, Result};
use log::{debug, info};
use nalgebra::{Matrix3, Vector3};
use std::fmt::Write;

// ============================================================================
// HIGH-LEVEL INTERFACE
// ============================================================================

/// Configuration for the habit-plane analysis pipeline.
#[derive(Debug, Clone)]
pub struct HabitPlaneConfig {
    pub reference: UnitCell,
    pub deformed: UnitCell,
    /// Experimentally observed habit-plane direction, in reference fractional coordinates.
    pub miller: MillerIndex,
    /// Reference shape tensor `G`; identity when `None`.
    pub shape_tensor: Option<Matrix3<f64>>,
    pub compatibility: CompatibilityConfig,
}

/// Scalar measures of the lattice deformation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicSummary {
    pub volume_ratio: f64,
    pub principal_stretches: Vector3<f64>,
    pub green_lagrange_strain: Matrix3<f64>,
}

impl KinematicSummary {
    pub fn of(f: &DeformationGradient) -> Self {
        Self {
            volume_ratio: f.volume_ratio(),
            principal_stretches: f.principal_stretches(),
            green_lagrange_strain: f.green_lagrange_strain(),
        }
    }
}

/// Everything computed by [`analyze_habit_plane`].
#[derive(Debug, Clone)]
pub struct HabitPlaneReport {
    pub reference: Lattice,
    pub deformed: Lattice,
    pub deformation: DeformationGradient,
    pub stretch_rotation: StretchRotation,
    pub summary: KinematicSummary,
    pub outcome: KinematicOutcome,
    /// `None` when the lattices are already compatible without twinning.
    pub angle: Option<AngleReport>,
    /// Best-fit analytic normal in reference fractional coordinates, unit length.
    pub fractional_normal: Option<MillerIndex>,
}

/// The master pipeline: unit cells -> F -> (U, Q) -> twinning -> best-fit angle.
pub fn analyze_habit_plane(config: &HabitPlaneConfig) -> Result<(HabitPlaneReport, String)> {
    // 1. LATTICE PHASE
    let reference = config.reference.to_lattice().context("Reference unit cell")?;
    let deformed = config.deformed.to_lattice().context("Deformed unit cell")?;

    // 2. KINEMATICS PHASE
    let deformation = deformation_gradient(&reference, &deformed)?;
    let stretch_rotation = deformation.polar_decompose()?;
    let summary = KinematicSummary::of(&deformation);
    debug!("F = {:?}", deformation.matrix());
    debug!("U = {:?}", stretch_rotation.stretch);

    // 3. COMPATIBILITY PHASE
    let g = config.shape_tensor.unwrap_or_else(Matrix3::identity);
    let outcome = kin_comp(&deformation, &g, &config.compatibility).context("Kinematic compatibility")?;

    // 4. COMPARISON PHASE
    let (angle, fractional_normal) = match &outcome {
        KinematicOutcome::Untransformed => {
            info!("Lattices are compatible without twinning.");
            (None, None)
        }
        KinematicOutcome::Twinned(sol) => {
            let milvec = frac2cart(&config.miller, &reference);
            let report = minimum_angle(&sol.type_one.normal, &sol.type_two.normal, &milvec)
                .context("Comparing analytic and experimental normals")?;
            let frac = cart2frac(&report.normal, &reference).normalized();
            (Some(report), frac)
        }
    };

    let report = HabitPlaneReport {
        reference,
        deformed,
        deformation,
        stretch_rotation,
        summary,
        outcome,
        angle,
        fractional_normal,
    };
    let text = render_habit_plane(config, &report);
    Ok((report, text))
}

/// Twinning solve for a gradient supplied directly (e.g. a pair of
/// stretch-tensor variants `U_i`, `U_j`).
pub fn analyze_twin(f: &Matrix3<f64>, g: &Matrix3<f64>, config: &CompatibilityConfig) -> Result<(KinematicOutcome, String)> {
    let deformation = DeformationGradient::from_matrix(*f)?;
    let outcome = kin_comp(&deformation, g, config).context("Kinematic compatibility")?;
    let mut text = String::new();
    render_outcome(&mut text, &outcome);
    Ok((outcome, text))
}

// ============================================================================
// REPORTING
// ============================================================================

fn fmt_vec(v: &Vector3<f64>) -> String {
    format!("[{:>9.4} {:>9.4} {:>9.4}]", v.x, v.y, v.z)
}

fn render_outcome(out: &mut String, outcome: &KinematicOutcome) {
    let sol = match outcome {
        KinematicOutcome::Untransformed => {
            let _ = writeln!(out, "C = I: no twinning required.");
            return;
        }
        KinematicOutcome::Twinned(sol) => sol,
    };

    let _ = writeln!(
        out,
        "• Eigenvalues of C:  {:.6}, {:.6}, {:.6}",
        sol.eigenvalues[0], sol.eigenvalues[1], sol.eigenvalues[2]
    );
    if let Some(w) = &sol.warning {
        let _ = writeln!(out, "• WARNING: {}", w);
    }
    for branch in [&sol.type_one, &sol.type_two] {
        let _ = writeln!(out, "--- {} ---", branch.twin_type);
        let _ = writeln!(out, "  n  = {}", fmt_vec(&branch.normal));
        let _ = writeln!(out, "  a  = {}", fmt_vec(&branch.shear_vector));
        let _ = writeln!(out, "  s  = {:.6}", branch.shear_magnitude);
        let _ = writeln!(out, "  nu = {}", fmt_vec(&branch.shear_direction));
        let _ = writeln!(out, "  K  = {}", fmt_vec(&branch.twin_plane_normal));
    }
}

fn render_habit_plane(config: &HabitPlaneConfig, report: &HabitPlaneReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "--- Habit Plane Report ---");
    let _ = writeln!(
        out,
        "• Experimental plane: ({} {} {})",
        config.miller.h, config.miller.k, config.miller.l
    );
    let _ = writeln!(out, "• Volume ratio:       {:.6}", report.summary.volume_ratio);
    let _ = writeln!(out, "• Principal stretches: {}", fmt_vec(&report.summary.principal_stretches));
    render_outcome(&mut out, &report.outcome);

    if let (Some(angle), Some(frac), Some(sol)) =
        (&report.angle, &report.fractional_normal, report.outcome.solution())
    {
        let _ = writeln!(out, "--- Best Fit ---");
        let _ = writeln!(out, "• Minimum angle:     {:.4} deg ({})", angle.angle, angle.twin_type);
        let _ = writeln!(out, "• Shear magnitude:   {:.6}", sol.branch(angle.twin_type).shear_magnitude);
        let _ = writeln!(out, "• Analytical normal's miller index: {}", frac);
    }
    out
}
