//! Integration tests for turgor-solver.

use std::cell::Cell;

use glam::Vec3;
use turgor_gpu::{ComputeContext, CpuBackend, DeviceStatus, KernelArgs, KernelFault, Program};
use turgor_mesh::generators::{cube, icosphere};
use turgor_mesh::volume::signed_volume;
use turgor_mesh::{EdgeMode, Topology};
use turgor_solver::graph::EMPTY_SLOT;
use turgor_solver::kernels::{
    reference_program, APPLY_PRESSURE, CALC_FORCES, CALC_VOLUMES, INTEGRATE_POSITION,
    INTEGRATE_VELOCITY,
};
use turgor_solver::{
    BodyConfig, BodyKind, ConstraintGraphBuilder, Runner, SimulationBody, SimulationConfig,
};
use turgor_telemetry::{EventKind, VecSink};
use turgor_types::{Diagnostic, FaceId, TurgorError, VertexId};

const DT: f32 = 0.001;

fn context() -> ComputeContext {
    ComputeContext::new(CpuBackend::new(reference_program())).unwrap()
}

fn injected_fault(_n: usize, _args: &mut KernelArgs) -> Result<(), KernelFault> {
    Err(KernelFault::new(DeviceStatus::ExecutionFailure, "injected"))
}

thread_local! {
    static VOLUME_CALLS: Cell<u32> = const { Cell::new(0) };
}

/// Measures normally at construction, then fails every later call.
fn volumes_then_fault(n: usize, args: &mut KernelArgs) -> Result<(), KernelFault> {
    let calls = VOLUME_CALLS.with(|c| {
        c.set(c.get() + 1);
        c.get()
    });
    if calls > 1 {
        return injected_fault(n, args);
    }
    let measure = reference_program()
        .get(CALC_VOLUMES)
        .expect("reference program has calc_volumes");
    measure(n, args)
}

fn max_offset(a: &[Vec3], b: &[Vec3]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(p, q)| p.distance(*q))
        .fold(0.0, f32::max)
}

/// Two points one unit apart joined by a single spring.
fn spring_body(ctx: &ComputeContext) -> SimulationBody<'_> {
    SimulationBody::from_edges(
        ctx,
        &[Vec3::ZERO, Vec3::X],
        &[[0, 1]],
        &[],
        &BodyConfig::surface(),
    )
    .unwrap()
}

// ─── Constraint Graph Tests ───────────────────────────────────

#[test]
fn rest_length_is_construction_distance() {
    let points = [Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0)];
    let graph = ConstraintGraphBuilder::new(4, 4, 250.0)
        .build(&points, &[[0, 1]], &[])
        .unwrap();

    assert_eq!(graph.neighbors_of(0), &[1]);
    assert_eq!(graph.neighbors_of(1), &[0]);
    assert_eq!(graph.springs_of(0), &[[5.0, 250.0]]);
    assert_eq!(graph.springs_of(1), &[[5.0, 250.0]]);
    assert_eq!(graph.neighbors[1], EMPTY_SLOT);
    assert!(graph.diagnostics.is_empty());
}

#[test]
fn degree_overflow_drops_edge() {
    let points = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z, Vec3::ONE];
    let edges = [[0, 1], [0, 2], [0, 3], [0, 4]];
    let graph = ConstraintGraphBuilder::new(2, 4, 1.0)
        .build(&points, &edges, &[])
        .unwrap();

    assert_eq!(graph.degrees[0], 2);
    assert_eq!(graph.neighbors_of(0), &[1, 2]);
    assert_eq!(graph.edges, vec![[0, 1], [0, 2]]);
    assert_eq!(graph.degrees[3], 0);
    assert_eq!(&graph.neighbors[6..8], &[EMPTY_SLOT, EMPTY_SLOT]);

    assert_eq!(graph.overflow_count(), 2);
    assert!(graph.diagnostics.contains(&Diagnostic::DegreeOverflow {
        vertex: VertexId(0),
        edge: [VertexId(0), VertexId(4)],
        max_degree: 2,
    }));
}

#[test]
fn corner_overflow_drops_face_corners() {
    let points = [Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y, Vec3::NEG_X];
    let faces = [[0, 1, 2], [0, 2, 3], [0, 3, 4]];
    let graph = ConstraintGraphBuilder::new(8, 2, 1.0)
        .build(&points, &[], &faces)
        .unwrap();

    assert_eq!(graph.corners_of(0), &[[1, 2], [2, 3]]);
    assert_eq!(graph.corners_of(2), &[[0, 1], [3, 0]]);
    assert_eq!(graph.cornered[3], 1);
    assert_eq!(graph.cornered[4], 0);
    assert_eq!(graph.corners[8], [EMPTY_SLOT, EMPTY_SLOT]);
    assert_eq!(graph.cornered_faces, 2);
    assert_eq!(
        graph.diagnostics,
        vec![Diagnostic::CornerOverflow {
            vertex: VertexId(0),
            face: FaceId(2),
            max_cornered: 2,
        }]
    );
}

#[test]
fn invalid_edges_are_rejected() {
    let points = [Vec3::ZERO, Vec3::X];
    let graph = ConstraintGraphBuilder::new(4, 4, 1.0)
        .build(&points, &[[1, 1], [0, 7]], &[])
        .unwrap();

    assert!(graph.edges.is_empty());
    assert_eq!(graph.diagnostics.len(), 2);
    assert!(graph
        .diagnostics
        .iter()
        .all(|d| matches!(d, Diagnostic::InvalidEdge { vertex_count: 2, .. })));
}

#[test]
fn out_of_range_face_is_an_error() {
    let points = [Vec3::ZERO, Vec3::X, Vec3::Y];
    let err = ConstraintGraphBuilder::new(4, 4, 1.0)
        .build(&points, &[], &[[0, 1, 3]])
        .unwrap_err();
    assert!(matches!(err, TurgorError::InvalidMesh(_)));
}

// ─── Config Tests ─────────────────────────────────────────────

#[test]
fn config_from_toml_fills_preset_for_kind() {
    let text = r#"
mesh = "objects/ball.obj"
steps = 50
dt = 0.002

[body]
kind = "volume"
stiffness = 4000.0

[topology]
mode = { proximity = { min_dist = 0.0, max_dist = 0.2 } }
"#;
    let config = SimulationConfig::from_toml(text).unwrap();
    assert_eq!(config.steps, 50);
    assert_eq!(config.body.kind, BodyKind::Volume);
    assert_eq!(config.body.stiffness, 4000.0);
    assert_eq!(config.body.inverse_mass, BodyConfig::volume().inverse_mass);
    assert_eq!(config.body.pressure_gain, BodyConfig::volume().pressure_gain);
    assert_eq!(
        config.topology.mode,
        EdgeMode::Proximity {
            min_dist: 0.0,
            max_dist: 0.2
        }
    );
}

#[test]
fn config_defaults() {
    let config = SimulationConfig::from_toml("mesh = \"cube.obj\"\n").unwrap();
    assert_eq!(config.body, BodyConfig::surface());
    assert_eq!(config.topology.mode, EdgeMode::Bending);
    assert_eq!(config.dt, 0.001);
}

#[test]
fn config_rejects_bad_values() {
    let bad_dt = SimulationConfig::from_toml("mesh = \"a.obj\"\ndt = 0.0\n");
    assert!(matches!(bad_dt, Err(TurgorError::InvalidConfig(_))));

    let unknown = SimulationConfig::from_toml("mesh = \"a.obj\"\n[body]\nstifness = 1.0\n");
    assert!(matches!(unknown, Err(TurgorError::InvalidConfig(_))));

    let zero_degree = SimulationConfig::from_toml("mesh = \"a.obj\"\n[body]\nmax_degree = 0\n");
    assert!(matches!(zero_degree, Err(TurgorError::InvalidConfig(_))));
}

// ─── Body Tests ───────────────────────────────────────────────

#[test]
fn mesh_body_packs_every_spring_edge() {
    let ctx = context();
    let mesh = icosphere(1.0, 1);
    let body = SimulationBody::new(&ctx, &mesh, EdgeMode::Bending, &BodyConfig::surface()).unwrap();

    let expected = Topology::derive(&mesh, EdgeMode::Bending).spring_edges();
    assert_eq!(body.edges(), expected.as_slice());
    assert_eq!(body.faces().len(), 80);
    assert!(body.diagnostics().is_empty());
    assert!(body.volume().is_none());
}

#[test]
fn surface_body_at_rest_stays_at_rest() {
    let ctx = context();
    let mesh = cube(1.0);
    let mut body = SimulationBody::new(&ctx, &mesh, EdgeMode::Bending, &BodyConfig::surface()).unwrap();

    for _ in 0..10 {
        let report = body.step(DT).unwrap();
        assert_eq!(report.volume, None);
    }
    assert_eq!(body.steps_taken(), 10);
    assert!(max_offset(&body.positions().unwrap(), &mesh.points) < 1e-6);
    assert_eq!(body.kinetic_energy().unwrap(), 0.0);
}

#[test]
fn volume_body_at_rest_stays_at_rest() {
    let ctx = context();
    let mesh = cube(1.0);
    let mut body = SimulationBody::new(&ctx, &mesh, EdgeMode::Bending, &BodyConfig::volume()).unwrap();

    let rest = body.rest_volume().unwrap();
    assert!((rest - 1.0).abs() < 1e-5);
    for _ in 0..10 {
        let report = body.step(DT).unwrap();
        assert_eq!(report.volume, Some(rest));
        assert_eq!(report.pressure, Some(0.0));
    }
    assert!(max_offset(&body.positions().unwrap(), &mesh.points) < 1e-6);
}

#[test]
fn stretched_spring_contracts() {
    let ctx = context();
    let mut body = spring_body(&ctx);
    body.set_positions(&[Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]).unwrap();

    body.step(DT).unwrap();
    let p = body.positions().unwrap();
    let length = p[0].distance(p[1]);
    assert!(length < 2.0 && length > 1.9, "length {length}");

    let v = body.velocities().unwrap();
    assert!(v[0].x > 0.0);
    assert!(v[1].x < 0.0);
    assert!(body.kinetic_energy().unwrap() > 0.0);
}

#[test]
fn compressed_volume_body_gains_volume() {
    let ctx = context();
    let mesh = cube(1.0);
    let mut body = SimulationBody::new(&ctx, &mesh, EdgeMode::Bending, &BodyConfig::volume()).unwrap();

    let squeezed: Vec<Vec3> = mesh.points.iter().map(|&p| p * 0.8).collect();
    let squeezed_volume = signed_volume(&squeezed, &mesh.faces);
    body.set_positions(&squeezed).unwrap();

    let report = body.step(DT).unwrap();
    assert!((report.volume.unwrap() - squeezed_volume).abs() < 1e-4);
    assert!(report.pressure.unwrap() > 0.0);
    body.step(DT).unwrap();

    let after = signed_volume(&body.positions().unwrap(), body.faces());
    assert!(after > squeezed_volume, "{after} <= {squeezed_volume}");
    let measured = body.measure_volume().unwrap().unwrap();
    assert!((measured - after).abs() < 1e-4);
}

#[test]
fn inflate_and_deflate_move_the_target() {
    let ctx = context();
    let mut body =
        SimulationBody::new(&ctx, &cube(1.0), EdgeMode::Bending, &BodyConfig::volume()).unwrap();
    let rest = body.rest_volume().unwrap();

    body.inflate(1.0);
    assert!((body.inflation().unwrap() - 1.5).abs() < 1e-6);
    assert!((body.target_volume().unwrap() - 1.5 * rest).abs() < 1e-5);

    body.deflate(10.0);
    assert_eq!(body.inflation(), Some(0.0));
    assert_eq!(body.rest_volume(), Some(rest));
}

#[test]
fn inflate_is_a_no_op_on_surface_bodies() {
    let ctx = context();
    let mut body = spring_body(&ctx);
    body.inflate(1.0);
    body.deflate(1.0);
    assert_eq!(body.kind(), BodyKind::Surface);
    assert_eq!(body.inflation(), None);
    assert_eq!(body.target_volume(), None);
    assert_eq!(body.measure_volume().unwrap(), None);
}

#[test]
fn failing_stage_leaves_state_unchanged() {
    for stage in [CALC_FORCES, INTEGRATE_VELOCITY, INTEGRATE_POSITION] {
        let program = reference_program().with_entry(stage, injected_fault);
        let ctx = ComputeContext::new(CpuBackend::new(program)).unwrap();
        let mut body = spring_body(&ctx);
        let stretched = [Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)];
        body.set_positions(&stretched).unwrap();

        let err = body.step(DT).unwrap_err();
        match err {
            TurgorError::Dispatch { kernel, diagnostic } => {
                assert_eq!(kernel, stage);
                assert!(diagnostic.contains("injected"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(body.positions().unwrap(), stretched.to_vec());
        assert_eq!(body.velocities().unwrap(), vec![Vec3::ZERO; 2]);
        assert_eq!(body.steps_taken(), 0);
    }
}

#[test]
fn failing_volume_stage_leaves_volume_state_unchanged() {
    for (stage, entry) in [
        (CALC_VOLUMES, volumes_then_fault as turgor_gpu::KernelFn),
        (APPLY_PRESSURE, injected_fault),
        (INTEGRATE_VELOCITY, injected_fault),
        (INTEGRATE_POSITION, injected_fault),
    ] {
        VOLUME_CALLS.with(|c| c.set(0));
        let program = reference_program().with_entry(stage, entry);
        let ctx = ComputeContext::new(CpuBackend::new(program)).unwrap();
        let mesh = cube(1.0);
        let mut body =
            SimulationBody::new(&ctx, &mesh, EdgeMode::Bending, &BodyConfig::volume()).unwrap();
        let squeezed: Vec<Vec3> = mesh.points.iter().map(|&p| p * 0.9).collect();
        body.set_positions(&squeezed).unwrap();

        let current = body.current_volume();
        let pressure = body.volume().unwrap().pressure();
        let target = body.target_volume();

        let err = body.step(DT).unwrap_err();
        assert!(
            matches!(err, TurgorError::Dispatch { ref kernel, .. } if kernel == stage),
            "unexpected error for {stage}: {err}"
        );
        assert_eq!(body.current_volume(), current, "{stage}");
        assert_eq!(body.volume().unwrap().pressure(), pressure, "{stage}");
        assert_eq!(body.target_volume(), target, "{stage}");
        assert_eq!(body.positions().unwrap(), squeezed, "{stage}");
        assert_eq!(body.velocities().unwrap(), vec![Vec3::ZERO; squeezed.len()]);
        assert_eq!(body.steps_taken(), 0);
    }
}

#[test]
fn completed_step_records_volume_state() {
    let ctx = context();
    let mesh = cube(1.0);
    let mut body =
        SimulationBody::new(&ctx, &mesh, EdgeMode::Bending, &BodyConfig::volume()).unwrap();
    let squeezed: Vec<Vec3> = mesh.points.iter().map(|&p| p * 0.9).collect();
    body.set_positions(&squeezed).unwrap();

    let report = body.step(DT).unwrap();
    assert_eq!(report.volume, body.current_volume());
    assert_eq!(report.pressure, Some(body.volume().unwrap().pressure()));
    assert!(body.volume().unwrap().pressure() > 0.0);
}

#[test]
fn missing_entry_point_is_fatal() {
    let program = Program::new()
        .with_entry(CALC_FORCES, injected_fault)
        .with_entry(INTEGRATE_VELOCITY, injected_fault)
        .with_entry(INTEGRATE_POSITION, injected_fault);
    let ctx = ComputeContext::new(CpuBackend::new(program)).unwrap();

    let err = SimulationBody::new(&ctx, &cube(1.0), EdgeMode::Bending, &BodyConfig::volume())
        .unwrap_err();
    assert!(matches!(err, TurgorError::KernelNotFound(ref name) if name == CALC_VOLUMES));
    assert!(err.is_fatal());

    // Surface bodies never bind the volume entry points.
    assert!(SimulationBody::new(&ctx, &cube(1.0), EdgeMode::Bending, &BodyConfig::surface()).is_ok());
}

#[test]
fn empty_body_is_rejected() {
    let ctx = context();
    let err = SimulationBody::from_edges(&ctx, &[], &[], &[], &BodyConfig::surface()).unwrap_err();
    assert!(matches!(err, TurgorError::InvalidMesh(_)));
}

// ─── Runner Tests ─────────────────────────────────────────────

#[test]
fn runner_reports_volume_events() {
    let ctx = context();
    let mut body =
        SimulationBody::new(&ctx, &cube(1.0), EdgeMode::Bending, &BodyConfig::volume()).unwrap();
    let sink = VecSink::new();
    let events = sink.events();
    let mut runner = Runner::new(20, DT).with_sink(Box::new(sink));

    let metrics = runner.run(&mut body).unwrap();
    assert_eq!(metrics.completed, 20);
    assert_eq!(metrics.aborted, 0);
    assert_eq!(metrics.vertex_count, 8);
    assert_eq!(metrics.face_count, 12);
    assert!(metrics.volume_drift().unwrap().abs() < 1e-4);
    assert!(metrics.summary().contains("20 completed"));

    let events = events.lock().unwrap();
    let volumes = events
        .iter()
        .filter(|e| matches!(e.kind, EventKind::Volume { .. }))
        .count();
    assert_eq!(volumes, 20);
    assert!(matches!(
        events.last().map(|e| &e.kind),
        Some(EventKind::Energy { .. })
    ));
}

#[test]
fn runner_continues_after_failed_steps() {
    let program = reference_program().with_entry(INTEGRATE_POSITION, injected_fault);
    let ctx = ComputeContext::new(CpuBackend::new(program)).unwrap();
    let mut body = spring_body(&ctx);
    let sink = VecSink::new();
    let events = sink.events();
    let mut runner = Runner::new(5, DT).with_sink(Box::new(sink));

    let metrics = runner.run(&mut body).unwrap();
    assert_eq!(metrics.completed, 0);
    assert_eq!(metrics.aborted, 5);
    assert_eq!(metrics.final_kinetic_energy, 0.0);
    assert_eq!(metrics.volume_drift(), None);

    let events = events.lock().unwrap();
    assert_eq!(events.iter().filter(|e| e.is_abort()).count(), 5);
    assert!(events.iter().any(|e| matches!(
        &e.kind,
        EventKind::StepAborted { kernel, .. } if kernel == INTEGRATE_POSITION
    )));
}

// ─── Sample Scene Tests ───────────────────────────────────────

#[test]
fn sample_scene_loads_and_runs() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../objects/cube.toml");
    let mut config = SimulationConfig::load(path).unwrap();
    assert!(config.mesh.ends_with("cube.obj"));
    assert_eq!(config.body, BodyConfig::volume());

    let loaded = turgor_mesh::load_obj(&config.mesh).unwrap();
    assert!(loaded.warnings.is_empty());
    assert_eq!(loaded.mesh.vertex_count(), 8);
    assert_eq!(loaded.mesh.face_count(), 12);

    let ctx = context();
    let mut body =
        SimulationBody::new(&ctx, &loaded.mesh, config.topology.mode, &config.body).unwrap();
    config.steps = 10;
    let metrics = Runner::from_config(&config).run(&mut body).unwrap();
    assert_eq!(metrics.completed, 10);
    assert!((metrics.rest_volume.unwrap() - 1.0).abs() < 1e-5);
}
