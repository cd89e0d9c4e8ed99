//! # turgor-gpu
//!
//! Compute offload layer for the Turgor soft-body simulator.
//!
//! Provides a [`ComputeBackend`] trait, an explicit [`ComputeContext`] that
//! owns the live backend, and owned wrappers over device resources:
//! - [`DeviceBuffer`] / [`MappedView`] — typed memory with exclusive mapping
//! - [`ComputeKernel`] — a named entry point with a checked signature
//!
//! [`CpuBackend`] runs a host-side [`Program`] and is always available.

pub mod backend;
pub mod buffer;
pub mod context;
pub mod cpu;
pub mod kernel;
pub mod status;

pub use backend::{ArgKind, ComputeBackend, KernelArg, KernelHandle, MemoryHandle};
pub use buffer::{DeviceBuffer, MappedView};
pub use context::ComputeContext;
pub use cpu::{CpuBackend, KernelArgs, KernelFn, Program};
pub use kernel::ComputeKernel;
pub use status::{DeviceStatus, KernelFault};
