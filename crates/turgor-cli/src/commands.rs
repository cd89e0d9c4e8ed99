//! CLI command implementations.

use std::path::{Path, PathBuf};

use tracing::Level;
use turgor_gpu::{ComputeContext, CpuBackend};
use turgor_mesh::{load_obj, EdgeMode, Topology};
use turgor_solver::{reference_program, BodyKind, Runner, SimulationBody, SimulationConfig};
use turgor_telemetry::TracingSink;

/// Diagnostics printed by `inspect` before truncating.
const MAX_LISTED: usize = 20;

pub struct SimulateArgs {
    pub config: Option<PathBuf>,
    pub mesh: Option<PathBuf>,
    pub kind: BodyKind,
    pub steps: Option<u32>,
    pub dt: Option<f32>,
}

/// Build a body on the CPU reference backend and run it.
pub fn simulate(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match (args.config, args.mesh) {
        (Some(path), _) => SimulationConfig::load(path)?,
        (None, Some(mesh)) => SimulationConfig::new(mesh, args.kind),
        (None, None) => return Err("either --config or --mesh is required".into()),
    };
    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(dt) = args.dt {
        config.dt = dt;
    }
    config.validate()?;

    println!("Turgor Simulation");
    println!("─────────────────");
    println!("Mesh:   {}", config.mesh.display());
    println!("Body:   {:?}", config.body.kind);
    println!("Steps:  {} × {}s", config.steps, config.dt);
    println!();

    let loaded = load_obj(&config.mesh)?;
    if !loaded.warnings.is_empty() {
        println!("{} line(s) skipped while loading", loaded.warnings.len());
    }

    let ctx = ComputeContext::new(CpuBackend::new(reference_program()))?;
    let mut body = SimulationBody::new(&ctx, &loaded.mesh, config.topology.mode, &config.body)?;
    if !body.diagnostics().is_empty() {
        println!("{} topology diagnostic(s); run `turgor inspect` for details", body.diagnostics().len());
    }

    let mut runner = Runner::from_config(&config).with_sink(Box::new(TracingSink::new(Level::DEBUG)));
    let metrics = runner.run(&mut body)?;

    println!("{}", metrics.summary());
    Ok(())
}

/// Print what the loader and topology derivation make of a mesh file.
pub fn inspect(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Turgor Mesh Inspector");
    println!("─────────────────────");
    println!();

    let loaded = load_obj(path)?;
    let mesh = &loaded.mesh;
    let topology = Topology::derive(mesh, EdgeMode::Bending);

    println!("Points:          {}", mesh.vertex_count());
    println!("Explicit edges:  {}", mesh.edge_count());
    println!("Faces:           {}", mesh.face_count());
    println!();
    println!("Boundary edges:  {} (before dedup)", topology.boundary_edges.len());
    println!(
        "Bending edges:   {} ({} corners skipped)",
        topology.bending_edges.len(),
        topology.skipped_corner_count()
    );
    println!("Spring edges:    {}", topology.spring_edges().len());
    println!(
        "Closed:          {}",
        if topology.is_closed() {
            "yes".to_string()
        } else {
            format!("no ({} open edges)", topology.open_edge_count())
        }
    );
    if mesh.face_count() > 0 {
        println!("Signed volume:   {:.6}", mesh.signed_volume());
    }

    if !loaded.warnings.is_empty() {
        println!();
        println!("Parse warnings ({}):", loaded.warnings.len());
        for warning in loaded.warnings.iter().take(MAX_LISTED) {
            println!("  {warning}");
        }
        if loaded.warnings.len() > MAX_LISTED {
            println!("  ... {} more", loaded.warnings.len() - MAX_LISTED);
        }
    }

    if !topology.diagnostics.is_empty() {
        println!();
        println!("Topology diagnostics ({}):", topology.diagnostics.len());
        for diagnostic in topology.diagnostics.iter().take(MAX_LISTED) {
            println!("  {diagnostic}");
        }
        if topology.diagnostics.len() > MAX_LISTED {
            println!("  ... {} more", topology.diagnostics.len() - MAX_LISTED);
        }
    }

    Ok(())
}
