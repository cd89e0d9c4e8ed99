//! # turgor-solver
//!
//! Constraint packing, the device-resident body pipeline and the run loop.
//!
//! ## Key Types
//!
//! - [`ConstraintGraphBuilder`] — Fixed-capacity adjacency and corner buffers
//! - [`SimulationBody`] — Per-step dispatch pipeline, optionally volume-preserving
//! - [`Runner`] — Drives N steps, isolates failed steps, reports [`RunMetrics`]
//! - [`SimulationConfig`] / [`BodyConfig`] — TOML-loadable parameters
//! - [`kernels::reference_program`] — Host implementations of the entry points

pub mod body;
pub mod config;
pub mod graph;
pub mod kernels;
pub mod runner;

pub use body::{SimulationBody, StepReport, VolumeCapability};
pub use config::{BodyConfig, BodyKind, SimulationConfig, TopologyConfig};
pub use graph::{ConstraintGraph, ConstraintGraphBuilder};
pub use kernels::reference_program;
pub use runner::{RunMetrics, Runner};
