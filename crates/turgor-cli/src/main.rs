//! Turgor CLI: run soft-body simulations and inspect meshes.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use turgor_solver::BodyKind;

mod commands;

#[derive(Parser)]
#[command(name = "turgor")]
#[command(version, about = "Turgor: mass-spring and volume-preserving soft bodies")]
struct Cli {
    /// Log filter when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a body from a mesh and step it.
    Simulate {
        /// Path to a simulation config (TOML).
        #[arg(short, long, conflicts_with = "mesh", required_unless_present = "mesh")]
        config: Option<PathBuf>,

        /// Path to a mesh file, using preset parameters.
        #[arg(short, long)]
        mesh: Option<PathBuf>,

        /// Body kind when running from `--mesh`.
        #[arg(short, long, value_enum, default_value_t = KindArg::Surface)]
        kind: KindArg,

        /// Override the number of steps.
        #[arg(short, long)]
        steps: Option<u32>,

        /// Override the timestep (seconds).
        #[arg(long)]
        dt: Option<f32>,
    },

    /// Print mesh counts, derived edges and topology diagnostics.
    Inspect {
        /// Path to a mesh file.
        path: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Surface,
    Volume,
}

impl From<KindArg> for BodyKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Surface => BodyKind::Surface,
            KindArg::Volume => BodyKind::Volume,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Simulate {
            config,
            mesh,
            kind,
            steps,
            dt,
        } => commands::simulate(commands::SimulateArgs {
            config,
            mesh,
            kind: kind.into(),
            steps,
            dt,
        }),
        Commands::Inspect { path } => commands::inspect(&path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
