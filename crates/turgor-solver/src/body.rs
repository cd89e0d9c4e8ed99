//! Device-resident soft body.
//!
//! A [`SimulationBody`] owns the device buffers and bound kernels for one
//! mesh and advances it one step at a time:
//!
//! ```text
//! calc_forces ─► [calc_volumes ─► apply_pressure] ─► integrate_velocity ─► integrate_position
//!                 └──── volume capability only ────┘
//! ```
//!
//! Every dispatch blocks. Velocity integration writes a staging buffer and
//! only the last stage commits positions and velocities, so a step that
//! fails at any stage leaves both exactly as they were.

use glam::Vec3;
use turgor_gpu::{ComputeContext, ComputeKernel, DeviceBuffer, KernelArg};
use turgor_mesh::{EdgeMode, ObjMesh, Topology};
use turgor_types::{Diagnostic, TurgorError, TurgorResult};

use crate::config::{BodyConfig, BodyKind};
use crate::graph::{ConstraintGraph, ConstraintGraphBuilder};
use crate::kernels::{
    to_device, to_vec3, APPLY_PRESSURE, APPLY_PRESSURE_ARGS, CALC_FORCES, CALC_FORCES_ARGS,
    CALC_VOLUMES, CALC_VOLUMES_ARGS, INTEGRATE_POSITION, INTEGRATE_POSITION_ARGS,
    INTEGRATE_VELOCITY, INTEGRATE_VELOCITY_ARGS,
};

/// Outcome of one successful step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Zero-based index of the step that just completed.
    pub step: u64,
    /// Volume measured at the start of the step (volume bodies).
    pub volume: Option<f32>,
    /// Pressure applied during the step (volume bodies).
    pub pressure: Option<f32>,
}

/// Volume measurement and pressure state of a volume-preserving body.
pub struct VolumeCapability<'ctx> {
    faces: DeviceBuffer<'ctx, [i32; 4]>,
    face_volumes: DeviceBuffer<'ctx, f32>,
    corners: DeviceBuffer<'ctx, [i32; 2]>,
    cornered: DeviceBuffer<'ctx, i32>,
    max_cornered: i32,
    calc_volumes: ComputeKernel<'ctx>,
    apply_pressure: ComputeKernel<'ctx>,
    pressure_gain: f32,
    inflation_rate: f32,
    rest_volume: f32,
    current_volume: f32,
    inflation: f32,
    pressure: f32,
}

impl<'ctx> VolumeCapability<'ctx> {
    fn new(
        ctx: &'ctx ComputeContext,
        graph: &ConstraintGraph,
        faces: &[[u32; 3]],
        config: &BodyConfig,
    ) -> TurgorResult<Self> {
        let device_faces: Vec<[i32; 4]> = faces
            .iter()
            .map(|&[a, b, c]| [a as i32, b as i32, c as i32, 0])
            .collect();
        Ok(Self {
            faces: DeviceBuffer::from_slice(ctx, &device_faces)?,
            face_volumes: DeviceBuffer::new(ctx, faces.len())?,
            corners: DeviceBuffer::from_slice(ctx, &graph.corners)?,
            cornered: DeviceBuffer::from_slice(ctx, &graph.cornered)?,
            max_cornered: graph.max_cornered as i32,
            calc_volumes: ComputeKernel::new(ctx, CALC_VOLUMES, CALC_VOLUMES_ARGS)?,
            apply_pressure: ComputeKernel::new(ctx, APPLY_PRESSURE, APPLY_PRESSURE_ARGS)?,
            pressure_gain: config.pressure_gain,
            inflation_rate: config.inflation_rate,
            rest_volume: 0.0,
            current_volume: 0.0,
            inflation: 1.0,
            pressure: 0.0,
        })
    }

    /// Dispatches `calc_volumes` and sums the per-face terms on the host.
    /// Does not touch the stored volume state.
    fn measure(&self, positions: &DeviceBuffer<'ctx, [f32; 4]>) -> TurgorResult<f32> {
        self.calc_volumes.execute(
            self.faces.len(),
            &[positions.arg(), self.faces.arg(), self.face_volumes.arg()],
        )?;
        let sum: f64 = self.face_volumes.read()?.iter().map(|&v| v as f64).sum();
        Ok(sum as f32)
    }

    /// Target volume for the current inflation.
    pub fn target_volume(&self) -> f32 {
        self.rest_volume * self.inflation
    }

    /// Pressure driving `measured` toward the target volume.
    fn pressure_for(&self, measured: f32) -> f32 {
        self.pressure_gain * (self.target_volume() - measured)
    }

    fn apply(
        &self,
        positions: &DeviceBuffer<'ctx, [f32; 4]>,
        forces: &DeviceBuffer<'ctx, [f32; 4]>,
        pressure: f32,
    ) -> TurgorResult<()> {
        self.apply_pressure.execute(
            positions.len(),
            &[
                positions.arg(),
                self.corners.arg(),
                self.cornered.arg(),
                forces.arg(),
                KernelArg::Int(self.max_cornered),
                KernelArg::Float(pressure),
            ],
        )
    }

    /// Volume captured at construction.
    pub fn rest_volume(&self) -> f32 {
        self.rest_volume
    }

    /// Volume measured by the last completed step or explicit measurement.
    pub fn current_volume(&self) -> f32 {
        self.current_volume
    }

    /// Multiplier applied to the rest volume to form the target.
    pub fn inflation(&self) -> f32 {
        self.inflation
    }

    /// Pressure applied by the last completed step.
    pub fn pressure(&self) -> f32 {
        self.pressure
    }
}

/// One mass-spring body on the device, optionally volume-preserving.
pub struct SimulationBody<'ctx> {
    kind: BodyKind,
    vertex_count: usize,
    edges: Vec<[u32; 2]>,
    faces: Vec<[u32; 3]>,
    diagnostics: Vec<Diagnostic>,
    inverse_mass: f32,
    max_degree: i32,
    steps_taken: u64,

    positions: DeviceBuffer<'ctx, [f32; 4]>,
    velocities: DeviceBuffer<'ctx, [f32; 4]>,
    staged_velocities: DeviceBuffer<'ctx, [f32; 4]>,
    forces: DeviceBuffer<'ctx, [f32; 4]>,
    inverse_masses: DeviceBuffer<'ctx, f32>,
    neighbors: DeviceBuffer<'ctx, i32>,
    springs: DeviceBuffer<'ctx, [f32; 2]>,
    degrees: DeviceBuffer<'ctx, i32>,

    calc_forces: ComputeKernel<'ctx>,
    integrate_velocity: ComputeKernel<'ctx>,
    integrate_position: ComputeKernel<'ctx>,

    volume: Option<VolumeCapability<'ctx>>,
}

impl<'ctx> SimulationBody<'ctx> {
    /// Builds a body from a mesh, deriving spring edges with `mode`.
    pub fn new(
        ctx: &'ctx ComputeContext,
        mesh: &ObjMesh,
        mode: EdgeMode,
        config: &BodyConfig,
    ) -> TurgorResult<Self> {
        mesh.validate()?;
        let topology = Topology::derive(mesh, mode);
        let mut body = Self::from_edges(
            ctx,
            &mesh.points,
            &topology.spring_edges(),
            &mesh.faces,
            config,
        )?;
        let mut diagnostics = topology.diagnostics;
        diagnostics.append(&mut body.diagnostics);
        body.diagnostics = diagnostics;
        Ok(body)
    }

    /// Builds a body from explicit spring edges. `faces` feed the corner
    /// buffer and volume measurement.
    pub fn from_edges(
        ctx: &'ctx ComputeContext,
        points: &[Vec3],
        edges: &[[u32; 2]],
        faces: &[[u32; 3]],
        config: &BodyConfig,
    ) -> TurgorResult<Self> {
        config.validate()?;
        if points.is_empty() {
            return Err(TurgorError::InvalidMesh("body has no vertices".into()));
        }
        if i32::try_from(points.len()).is_err() {
            return Err(TurgorError::InvalidMesh(format!(
                "{} vertices exceed the device index range",
                points.len()
            )));
        }

        let graph = ConstraintGraphBuilder::from_config(config).build(points, edges, faces)?;
        let n = points.len();
        let device_points: Vec<[f32; 4]> = points.iter().map(|&p| to_device(p)).collect();

        let volume = match config.kind {
            BodyKind::Surface => None,
            BodyKind::Volume => Some(VolumeCapability::new(ctx, &graph, faces, config)?),
        };

        let mut body = Self {
            kind: config.kind,
            vertex_count: n,
            edges: graph.edges.clone(),
            faces: faces.to_vec(),
            diagnostics: graph.diagnostics.clone(),
            inverse_mass: config.inverse_mass,
            max_degree: graph.max_degree as i32,
            steps_taken: 0,
            positions: DeviceBuffer::from_slice(ctx, &device_points)?,
            velocities: DeviceBuffer::new(ctx, n)?,
            staged_velocities: DeviceBuffer::new(ctx, n)?,
            forces: DeviceBuffer::new(ctx, n)?,
            inverse_masses: DeviceBuffer::from_slice(ctx, &vec![config.inverse_mass; n])?,
            neighbors: DeviceBuffer::from_slice(ctx, &graph.neighbors)?,
            springs: DeviceBuffer::from_slice(ctx, &graph.springs)?,
            degrees: DeviceBuffer::from_slice(ctx, &graph.degrees)?,
            calc_forces: ComputeKernel::new(ctx, CALC_FORCES, CALC_FORCES_ARGS)?,
            integrate_velocity: ComputeKernel::new(ctx, INTEGRATE_VELOCITY, INTEGRATE_VELOCITY_ARGS)?,
            integrate_position: ComputeKernel::new(ctx, INTEGRATE_POSITION, INTEGRATE_POSITION_ARGS)?,
            volume,
        };

        if let Some(volume) = body.volume.as_mut() {
            volume.rest_volume = volume.measure(&body.positions)?;
            volume.current_volume = volume.rest_volume;
            if volume.rest_volume <= 0.0 {
                tracing::warn!(
                    rest_volume = volume.rest_volume,
                    "volume body has non-positive rest volume; check face winding"
                );
            }
        }

        tracing::info!(
            kind = ?body.kind,
            vertices = n,
            edges = body.edges.len(),
            faces = body.faces.len(),
            dropped = body.diagnostics.len(),
            rest_volume = ?body.rest_volume(),
            "simulation body created"
        );
        Ok(body)
    }

    /// Advances one step of `dt` seconds.
    ///
    /// On error, positions, velocities and the volume state are unchanged.
    pub fn step(&mut self, dt: f32) -> TurgorResult<StepReport> {
        let n = self.vertex_count;

        self.calc_forces.execute(
            n,
            &[
                self.positions.arg(),
                self.neighbors.arg(),
                self.springs.arg(),
                self.degrees.arg(),
                self.forces.arg(),
                KernelArg::Int(self.max_degree),
            ],
        )?;

        let (volume, pressure) = match self.volume.as_ref() {
            Some(capability) => {
                let measured = capability.measure(&self.positions)?;
                let pressure = capability.pressure_for(measured);
                capability.apply(&self.positions, &self.forces, pressure)?;
                (Some(measured), Some(pressure))
            }
            None => (None, None),
        };

        self.integrate_velocity.execute(
            n,
            &[
                self.velocities.arg(),
                self.forces.arg(),
                self.inverse_masses.arg(),
                self.staged_velocities.arg(),
                KernelArg::Float(dt),
            ],
        )?;

        self.integrate_position.execute(
            n,
            &[
                self.positions.arg(),
                self.velocities.arg(),
                self.staged_velocities.arg(),
                KernelArg::Float(dt),
            ],
        )?;

        if let (Some(capability), Some(measured), Some(pressure)) =
            (self.volume.as_mut(), volume, pressure)
        {
            capability.current_volume = measured;
            capability.pressure = pressure;
        }

        let report = StepReport {
            step: self.steps_taken,
            volume,
            pressure,
        };
        self.steps_taken += 1;
        Ok(report)
    }

    /// Raises the volume target by `inflation_rate × dt`. No-op on
    /// surface bodies.
    pub fn inflate(&mut self, dt: f32) {
        if let Some(volume) = self.volume.as_mut() {
            volume.inflation += volume.inflation_rate * dt;
        }
    }

    /// Lowers the volume target by `inflation_rate × dt`, never below zero.
    /// No-op on surface bodies.
    pub fn deflate(&mut self, dt: f32) {
        if let Some(volume) = self.volume.as_mut() {
            volume.inflation = (volume.inflation - volume.inflation_rate * dt).max(0.0);
        }
    }

    /// Re-measures the current volume on the device. `None` for surface
    /// bodies.
    pub fn measure_volume(&mut self) -> TurgorResult<Option<f32>> {
        match self.volume.as_mut() {
            Some(capability) => {
                let measured = capability.measure(&self.positions)?;
                capability.current_volume = measured;
                Ok(Some(measured))
            }
            None => Ok(None),
        }
    }

    /// Overwrites positions and zeroes velocities. Rest lengths and the
    /// rest volume are kept.
    pub fn set_positions(&mut self, points: &[Vec3]) -> TurgorResult<()> {
        if points.len() != self.vertex_count {
            return Err(TurgorError::InvalidMesh(format!(
                "expected {} positions, got {}",
                self.vertex_count,
                points.len()
            )));
        }
        let device_points: Vec<[f32; 4]> = points.iter().map(|&p| to_device(p)).collect();
        self.positions.write(&device_points)?;
        self.velocities.write(&vec![[0.0; 4]; self.vertex_count])
    }

    pub fn positions(&self) -> TurgorResult<Vec<Vec3>> {
        Ok(self.positions.read()?.into_iter().map(to_vec3).collect())
    }

    pub fn velocities(&self) -> TurgorResult<Vec<Vec3>> {
        Ok(self.velocities.read()?.into_iter().map(to_vec3).collect())
    }

    /// `Σ ½ m |v|²` over vertices with finite mass.
    pub fn kinetic_energy(&self) -> TurgorResult<f32> {
        if self.inverse_mass <= 0.0 {
            return Ok(0.0);
        }
        let mass = 1.0 / self.inverse_mass;
        let sum: f64 = self
            .velocities
            .read()?
            .iter()
            .map(|&v| 0.5 * mass as f64 * to_vec3(v).length_squared() as f64)
            .sum();
        Ok(sum as f32)
    }

    /// Springs retained in the adjacency buffer.
    pub fn edges(&self) -> &[[u32; 2]] {
        &self.edges
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Number of steps completed.
    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    /// Topology and packing diagnostics raised while building.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn volume(&self) -> Option<&VolumeCapability<'ctx>> {
        self.volume.as_ref()
    }

    pub fn rest_volume(&self) -> Option<f32> {
        self.volume.as_ref().map(VolumeCapability::rest_volume)
    }

    /// Volume measured at the start of the last step (or at construction).
    pub fn current_volume(&self) -> Option<f32> {
        self.volume.as_ref().map(VolumeCapability::current_volume)
    }

    pub fn target_volume(&self) -> Option<f32> {
        self.volume.as_ref().map(VolumeCapability::target_volume)
    }

    pub fn inflation(&self) -> Option<f32> {
        self.volume.as_ref().map(VolumeCapability::inflation)
    }
}

impl std::fmt::Debug for SimulationBody<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationBody")
            .field("kind", &self.kind)
            .field("vertex_count", &self.vertex_count)
            .field("edges", &self.edges.len())
            .field("faces", &self.faces.len())
            .field("steps_taken", &self.steps_taken)
            .field("rest_volume", &self.rest_volume())
            .finish()
    }
}
