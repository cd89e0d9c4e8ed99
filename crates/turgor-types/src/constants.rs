//! Simulation defaults.

/// Default neighbor capacity per vertex in the adjacency buffer.
pub const DEFAULT_MAX_DEGREE: usize = 64;

/// Default corner-entry capacity per vertex in the corner buffer.
pub const DEFAULT_MAX_CORNERED: usize = 16;

/// Default simulation timestep (seconds).
pub const DEFAULT_DT: f32 = 0.001;

/// Spring stiffness used for surface-only bodies.
pub const SURFACE_STIFFNESS: f32 = 2000.0;

/// Spring stiffness used for volume-preserving bodies.
pub const VOLUME_STIFFNESS: f32 = 5000.0;

/// Per-vertex inverse mass for surface-only bodies.
pub const SURFACE_INVERSE_MASS: f32 = 5.0;

/// Per-vertex inverse mass for volume-preserving bodies.
pub const VOLUME_INVERSE_MASS: f32 = 10.0;

/// Gain converting a volume deficit into pressure.
pub const DEFAULT_PRESSURE_GAIN: f32 = 2000.0;

/// Epsilon below which an edge is treated as zero-length.
pub const EPSILON: f32 = 1.0e-7;
