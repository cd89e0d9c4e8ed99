//! Host reference implementations of the body pipeline's entry points.
//!
//! Device layouts:
//!
//! | Buffer | Element | Length |
//! |---|---|---|
//! | positions, velocities, staged velocities, forces | `[f32; 4]` (xyz + pad) | vertices |
//! | inverse masses | `f32` | vertices |
//! | neighbors | `i32` | vertices × max_degree |
//! | springs | `[f32; 2]` (rest, stiffness) | vertices × max_degree |
//! | degrees, cornered | `i32` | vertices |
//! | corners | `[i32; 2]` | vertices × max_cornered |
//! | faces | `[i32; 4]` (abc + pad) | faces |
//! | face volumes | `f32` | faces |

use glam::Vec3;
use turgor_gpu::{ArgKind, DeviceStatus, KernelArgs, KernelFault, Program};
use turgor_mesh::volume::face_volume;
use turgor_types::constants::EPSILON;

use ArgKind::{Buffer, Float, Int};

pub const CALC_FORCES: &str = "calc_forces";
pub const CALC_VOLUMES: &str = "calc_volumes";
pub const APPLY_PRESSURE: &str = "apply_pressure";
pub const INTEGRATE_VELOCITY: &str = "integrate_velocity";
pub const INTEGRATE_POSITION: &str = "integrate_position";

/// positions, neighbors, springs, degrees, forces, max_degree
pub const CALC_FORCES_ARGS: &[ArgKind] = &[Buffer, Buffer, Buffer, Buffer, Buffer, Int];
/// positions, faces, face volumes
pub const CALC_VOLUMES_ARGS: &[ArgKind] = &[Buffer, Buffer, Buffer];
/// positions, corners, cornered, forces, max_cornered, pressure
pub const APPLY_PRESSURE_ARGS: &[ArgKind] = &[Buffer, Buffer, Buffer, Buffer, Int, Float];
/// velocities, forces, inverse masses, staged velocities, dt
pub const INTEGRATE_VELOCITY_ARGS: &[ArgKind] = &[Buffer, Buffer, Buffer, Buffer, Float];
/// positions, velocities, staged velocities, dt
pub const INTEGRATE_POSITION_ARGS: &[ArgKind] = &[Buffer, Buffer, Buffer, Float];

/// The program every body is built against.
pub fn reference_program() -> Program {
    Program::new()
        .with_entry(CALC_FORCES, calc_forces)
        .with_entry(CALC_VOLUMES, calc_volumes)
        .with_entry(APPLY_PRESSURE, apply_pressure)
        .with_entry(INTEGRATE_VELOCITY, integrate_velocity)
        .with_entry(INTEGRATE_POSITION, integrate_position)
}

#[inline]
pub fn to_vec3(p: [f32; 4]) -> Vec3 {
    Vec3::new(p[0], p[1], p[2])
}

#[inline]
pub fn to_device(v: Vec3) -> [f32; 4] {
    [v.x, v.y, v.z, 0.0]
}

fn require_len(work_items: usize, len: usize, buffer: &str) -> Result<(), KernelFault> {
    if work_items > len {
        return Err(KernelFault::new(
            DeviceStatus::InvalidWorkSize,
            format!("{work_items} work items over {buffer} of length {len}"),
        ));
    }
    Ok(())
}

fn stride(value: i32) -> Result<usize, KernelFault> {
    usize::try_from(value)
        .ok()
        .filter(|&s| s > 0)
        .ok_or_else(|| KernelFault::new(DeviceStatus::InvalidArgValue, format!("stride {value}")))
}

fn vertex(positions: &[[f32; 4]], index: i32) -> Result<Vec3, KernelFault> {
    usize::try_from(index)
        .ok()
        .and_then(|i| positions.get(i))
        .map(|&p| to_vec3(p))
        .ok_or_else(|| {
            KernelFault::new(
                DeviceStatus::InvalidValue,
                format!("vertex index {index} out of range"),
            )
        })
}

/// Hookean spring force per vertex, from its own adjacency slots.
/// Overwrites `forces`.
fn calc_forces(n: usize, args: &mut KernelArgs) -> Result<(), KernelFault> {
    let positions: Vec<[f32; 4]> = args.read(0)?;
    let neighbors: Vec<i32> = args.read(1)?;
    let springs: Vec<[f32; 2]> = args.read(2)?;
    let degrees: Vec<i32> = args.read(3)?;
    let mut forces: Vec<[f32; 4]> = args.read(4)?;
    let max_degree = stride(args.int(5)?)?;

    require_len(n, positions.len(), "positions")?;
    require_len(n, degrees.len(), "degrees")?;
    require_len(n, forces.len(), "forces")?;
    require_len(n * max_degree, neighbors.len(), "neighbors")?;
    require_len(n * max_degree, springs.len(), "springs")?;

    for i in 0..n {
        let pi = to_vec3(positions[i]);
        let degree = degrees[i].clamp(0, max_degree as i32) as usize;
        let mut f = Vec3::ZERO;
        for slot in i * max_degree..i * max_degree + degree {
            let d = vertex(&positions, neighbors[slot])? - pi;
            let len = d.length();
            if len < EPSILON {
                continue;
            }
            let [rest, stiffness] = springs[slot];
            f += d * (stiffness * (len - rest) / len);
        }
        forces[i] = to_device(f);
    }
    args.write(4, &forces)
}

/// Signed tetrahedral volume of every face against the origin.
fn calc_volumes(n: usize, args: &mut KernelArgs) -> Result<(), KernelFault> {
    let positions: Vec<[f32; 4]> = args.read(0)?;
    let faces: Vec<[i32; 4]> = args.read(1)?;
    let mut volumes: Vec<f32> = args.read(2)?;

    require_len(n, faces.len(), "faces")?;
    require_len(n, volumes.len(), "face volumes")?;

    for (face, volume) in faces.iter().zip(volumes.iter_mut()).take(n) {
        let a = vertex(&positions, face[0])?;
        let b = vertex(&positions, face[1])?;
        let c = vertex(&positions, face[2])?;
        *volume = face_volume(a, b, c);
    }
    args.write(2, &volumes)
}

/// Adds `pressure × (b − a) × (c − a) / 6` for every corner entry.
fn apply_pressure(n: usize, args: &mut KernelArgs) -> Result<(), KernelFault> {
    let positions: Vec<[f32; 4]> = args.read(0)?;
    let corners: Vec<[i32; 2]> = args.read(1)?;
    let cornered: Vec<i32> = args.read(2)?;
    let mut forces: Vec<[f32; 4]> = args.read(3)?;
    let max_cornered = stride(args.int(4)?)?;
    let pressure = args.float(5)?;

    require_len(n, positions.len(), "positions")?;
    require_len(n, cornered.len(), "cornered")?;
    require_len(n, forces.len(), "forces")?;
    require_len(n * max_cornered, corners.len(), "corners")?;

    for i in 0..n {
        let pa = to_vec3(positions[i]);
        let count = cornered[i].clamp(0, max_cornered as i32) as usize;
        let mut f = Vec3::ZERO;
        for &[b, c] in &corners[i * max_cornered..i * max_cornered + count] {
            let pb = vertex(&positions, b)?;
            let pc = vertex(&positions, c)?;
            f += (pb - pa).cross(pc - pa) * (pressure / 6.0);
        }
        forces[i] = to_device(to_vec3(forces[i]) + f);
    }
    args.write(3, &forces)
}

/// `v' = v + f × inverse_mass × dt`, written to the staging buffer.
fn integrate_velocity(n: usize, args: &mut KernelArgs) -> Result<(), KernelFault> {
    let velocities: Vec<[f32; 4]> = args.read(0)?;
    let forces: Vec<[f32; 4]> = args.read(1)?;
    let inverse_masses: Vec<f32> = args.read(2)?;
    let mut staged: Vec<[f32; 4]> = args.read(3)?;
    let dt = args.float(4)?;

    require_len(n, velocities.len(), "velocities")?;
    require_len(n, forces.len(), "forces")?;
    require_len(n, inverse_masses.len(), "inverse masses")?;
    require_len(n, staged.len(), "staged velocities")?;

    for i in 0..n {
        let v = to_vec3(velocities[i]) + to_vec3(forces[i]) * (inverse_masses[i] * dt);
        staged[i] = to_device(v);
    }
    args.write(3, &staged)
}

/// `p += v' × dt`, then commits `v = v'`.
fn integrate_position(n: usize, args: &mut KernelArgs) -> Result<(), KernelFault> {
    let mut positions: Vec<[f32; 4]> = args.read(0)?;
    let mut velocities: Vec<[f32; 4]> = args.read(1)?;
    let staged: Vec<[f32; 4]> = args.read(2)?;
    let dt = args.float(3)?;

    require_len(n, positions.len(), "positions")?;
    require_len(n, velocities.len(), "velocities")?;
    require_len(n, staged.len(), "staged velocities")?;

    for i in 0..n {
        let v = to_vec3(staged[i]);
        positions[i] = to_device(to_vec3(positions[i]) + v * dt);
        velocities[i] = staged[i];
    }
    args.write(0, &positions)?;
    args.write(1, &velocities)
}
