use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use nalgebra::Matrix3;
use std::path::PathBuf;
use std::time::Instant;

use habit_plane::{
    analyze_habit_plane, analyze_twin, parser, CompatibilityConfig, HabitPlaneConfig, MillerIndex, UnitCell,
};

#[derive(Parser)]
#[command(author, version, about = "Habit plane and twinning calculator for shape-memory crystals")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging).
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compares the analytic habit plane of two lattices with an observed plane.
    HabitPlane {
        /// Reference cell: a b c alpha beta gamma (degrees).
        #[arg(long = "ref", num_args = 6, value_names = ["A", "B", "C", "ALPHA", "BETA", "GAMMA"], allow_negative_numbers = true)]
        reference: Option<Vec<f64>>,

        /// Deformed cell: a b c alpha beta gamma (degrees).
        #[arg(long = "def", num_args = 6, value_names = ["A", "B", "C", "ALPHA", "BETA", "GAMMA"], allow_negative_numbers = true)]
        deformed: Option<Vec<f64>>,

        /// Read the reference cell from a CIF file instead.
        #[arg(long)]
        ref_cif: Option<PathBuf>,

        /// Read the deformed cell from a CIF file instead.
        #[arg(long)]
        def_cif: Option<PathBuf>,

        #[arg(allow_negative_numbers = true)]
        h: i32,
        #[arg(allow_negative_numbers = true)]
        k: i32,
        #[arg(allow_negative_numbers = true)]
        l: i32,

        /// Allowed |lambda_2 - 1| before a compatibility warning.
        #[arg(long, default_value_t = 1e-3)]
        tolerance: f64,
    },

    /// Solves the twinning equation for an explicit F (and optional G).
    Twin {
        /// F, nine numbers in row-major order.
        #[arg(long, num_args = 9, required = true, allow_negative_numbers = true)]
        f: Vec<f64>,

        /// G, nine numbers in row-major order (identity if omitted).
        #[arg(long, num_args = 9, allow_negative_numbers = true)]
        g: Option<Vec<f64>>,

        #[arg(long, default_value_t = 1e-3)]
        tolerance: f64,
    },
}

fn resolve_cell(label: &str, numbers: Option<Vec<f64>>, cif: Option<PathBuf>) -> Result<UnitCell> {
    match (numbers, cif) {
        (_, Some(path)) => {
            info!("Reading {} cell from {:?}...", label, path);
            parser::cell_from_cif(&path)
        }
        (Some(p), None) => {
            if p.len() != 6 {
                bail!("--{} expects 6 numbers, got {}.", label, p.len());
            }
            Ok(UnitCell::new([p[0], p[1], p[2]], [p[3], p[4], p[5]]))
        }
        (None, None) => bail!("{} cell missing: pass --{} or --{}-cif.", label, label, label),
    }
}

fn matrix_from_row_major(name: &str, values: &[f64]) -> Result<Matrix3<f64>> {
    if values.len() != 9 {
        bail!("--{} expects 9 numbers, got {}.", name, values.len());
    }
    Ok(Matrix3::from_row_slice(values))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let start_time = Instant::now();

    match cli.command {
        Commands::HabitPlane {
            reference, deformed, ref_cif, def_cif,
            h, k, l, tolerance,
        } => {
            println!("--- Habit Plane Calculator ---");

            let config = HabitPlaneConfig {
                reference: resolve_cell("ref", reference, ref_cif)?,
                deformed: resolve_cell("def", deformed, def_cif)?,
                miller: MillerIndex::from_integers(h, k, l),
                shape_tensor: None,
                compatibility: CompatibilityConfig { tolerance },
            };

            let (_, report) = analyze_habit_plane(&config)?;
            println!("{}", report);
        }
        Commands::Twin { f, g, tolerance } => {
            println!("--- Twinning Calculator ---");

            let f = matrix_from_row_major("f", &f)?;
            let g = match g {
                Some(values) => matrix_from_row_major("g", &values)?,
                None => Matrix3::identity(),
            };

            let (_, report) = analyze_twin(&f, &g, &CompatibilityConfig { tolerance })?;
            println!("{}", report);
        }
    }

    info!("Done in {:.2?}", start_time.elapsed());
    Ok(())
}
