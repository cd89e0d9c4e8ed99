//! Compute backend trait.
//!
//! The [`ComputeBackend`] trait is the seam between the simulation core and
//! whatever device runs the compute program. The core only ever talks to it
//! through [`ComputeContext`](crate::context::ComputeContext), and only
//! through the owned wrappers [`DeviceBuffer`](crate::buffer::DeviceBuffer)
//! and [`ComputeKernel`](crate::kernel::ComputeKernel), which pair every
//! create with a release.
//!
//! # Implementations
//! - [`CpuBackend`](crate::cpu::CpuBackend) — sequential host execution of a
//!   [`Program`](crate::cpu::Program) (always available)

use turgor_types::TurgorResult;

/// Opaque handle to one block of device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryHandle(pub u64);

/// Opaque handle to a kernel object created from the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelHandle(pub u64);

/// One positional kernel argument.
///
/// Scalars are copied by value at bind time; buffers are passed by
/// reference and the device mutates their memory in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelArg {
    Int(i32),
    Float(f32),
    Buffer(MemoryHandle),
}

/// Declared type of a kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Int,
    Float,
    Buffer,
}

impl KernelArg {
    /// The tag of this argument.
    pub fn kind(&self) -> ArgKind {
        match self {
            KernelArg::Int(_) => ArgKind::Int,
            KernelArg::Float(_) => ArgKind::Float,
            KernelArg::Buffer(_) => ArgKind::Buffer,
        }
    }
}

impl From<i32> for KernelArg {
    fn from(value: i32) -> Self {
        KernelArg::Int(value)
    }
}

impl From<f32> for KernelArg {
    fn from(value: f32) -> Self {
        KernelArg::Float(value)
    }
}

/// Trait for compute backends.
///
/// Every method takes `&self`: a backend is driven from a single control
/// thread and keeps its mutable state behind interior mutability.
/// Dispatches are synchronous from the caller's point of view once
/// [`finish`](Self::finish) returns.
pub trait ComputeBackend {
    /// Bring up the device and build the program. Called once, by
    /// [`ComputeContext::new`](crate::context::ComputeContext::new).
    fn init(&mut self) -> TurgorResult<()>;

    /// Returns the backend name (e.g., "cpu_reference").
    fn name(&self) -> &str;

    /// Returns true if the backend runs on an accelerator.
    fn is_gpu(&self) -> bool;

    /// Allocate `byte_len` bytes of device memory.
    fn allocate(&self, byte_len: usize) -> TurgorResult<MemoryHandle>;

    /// Release device memory, unmapping it first if it is still mapped.
    fn release(&self, memory: MemoryHandle);

    /// Map memory for host access, blocking until pending device work on
    /// it has completed. Returns a host copy of the contents.
    ///
    /// Fails if the memory is already mapped.
    fn map(&self, memory: MemoryHandle) -> TurgorResult<Vec<u8>>;

    /// Publish host contents back to the device and end the mapping.
    fn unmap(&self, memory: MemoryHandle, contents: &[u8]) -> TurgorResult<()>;

    /// Resolve a named entry point of the compiled program.
    fn create_kernel(&self, name: &str) -> TurgorResult<KernelHandle>;

    /// Release a kernel object.
    fn release_kernel(&self, kernel: KernelHandle);

    /// Bind `args` positionally and enqueue a dispatch over `work_items`.
    fn enqueue(&self, kernel: KernelHandle, work_items: usize, args: &[KernelArg])
        -> TurgorResult<()>;

    /// Block until all enqueued work has completed.
    fn finish(&self) -> TurgorResult<()>;
}
