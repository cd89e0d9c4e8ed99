//! Typed device memory with exclusive host mapping.
//!
//! [`DeviceBuffer`] owns one fixed-size allocation of `len` elements of a
//! `bytemuck::Pod` type. Host access goes through [`DeviceBuffer::map`],
//! which hands out a [`MappedView`] borrowing the buffer mutably; a second
//! view cannot coexist with the first. The view unmaps when dropped.

use std::marker::PhantomData;
use std::mem::size_of;
use std::ops::{Deref, DerefMut};

use bytemuck::Pod;
use turgor_types::{TurgorError, TurgorResult};

use crate::backend::{KernelArg, MemoryHandle};
use crate::context::ComputeContext;

/// A block of device memory holding `len` elements of `T`.
pub struct DeviceBuffer<'ctx, T: Pod> {
    ctx: &'ctx ComputeContext,
    memory: MemoryHandle,
    len: usize,
    _marker: PhantomData<T>,
}

impl<'ctx, T: Pod> DeviceBuffer<'ctx, T> {
    /// Allocates `len` zeroed elements.
    pub fn new(ctx: &'ctx ComputeContext, len: usize) -> TurgorResult<Self> {
        if size_of::<T>() == 0 {
            return Err(TurgorError::InvalidConfig(
                "device buffers cannot hold zero-sized elements".into(),
            ));
        }
        let memory = ctx.backend().allocate(len * size_of::<T>())?;
        let mut buffer = Self {
            ctx,
            memory,
            len,
            _marker: PhantomData,
        };
        let mut view = buffer.map()?;
        view.fill(T::zeroed());
        view.unmap()?;
        Ok(buffer)
    }

    /// Allocates a buffer and fills it with `data`.
    pub fn from_slice(ctx: &'ctx ComputeContext, data: &[T]) -> TurgorResult<Self> {
        let mut buffer = Self::new(ctx, data.len())?;
        buffer.write(data)?;
        Ok(buffer)
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size in bytes.
    pub fn byte_len(&self) -> usize {
        self.len * size_of::<T>()
    }

    /// Backend handle of the underlying memory.
    pub fn handle(&self) -> MemoryHandle {
        self.memory
    }

    /// This buffer as a kernel argument.
    pub fn arg(&self) -> KernelArg {
        KernelArg::Buffer(self.memory)
    }

    /// Maps the buffer for host access.
    ///
    /// Blocks until device work on the buffer has completed.
    pub fn map(&mut self) -> TurgorResult<MappedView<'_, 'ctx, T>> {
        let bytes = self.ctx.backend().map(self.memory)?;
        Ok(MappedView {
            data: decode(&bytes),
            buffer: self,
            mapped: true,
        })
    }

    /// Copies the contents out through a short-lived mapping.
    pub fn read(&self) -> TurgorResult<Vec<T>> {
        let backend = self.ctx.backend();
        let bytes = backend.map(self.memory)?;
        let out = decode(&bytes);
        backend.unmap(self.memory, &bytes)?;
        Ok(out)
    }

    /// Overwrites the contents. `data.len()` must equal `len()`.
    pub fn write(&mut self, data: &[T]) -> TurgorResult<()> {
        if data.len() != self.len {
            return Err(TurgorError::Map(format!(
                "write of {} elements into a buffer of {}",
                data.len(),
                self.len
            )));
        }
        let mut view = self.map()?;
        view.copy_from_slice(data);
        view.unmap()
    }
}

fn decode<T: Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

impl<T: Pod> std::fmt::Debug for DeviceBuffer<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("memory", &self.memory)
            .field("len", &self.len)
            .field("element_size", &size_of::<T>())
            .finish()
    }
}

impl<T: Pod> Drop for DeviceBuffer<'_, T> {
    fn drop(&mut self) {
        // Any view has already unmapped: it borrows `self` and drops first.
        self.ctx.backend().release(self.memory);
    }
}

/// Exclusive host view of a mapped [`DeviceBuffer`].
pub struct MappedView<'a, 'ctx, T: Pod> {
    buffer: &'a mut DeviceBuffer<'ctx, T>,
    data: Vec<T>,
    mapped: bool,
}

impl<T: Pod> MappedView<'_, '_, T> {
    /// Publishes host writes to the device and ends the mapping.
    pub fn unmap(mut self) -> TurgorResult<()> {
        self.release()
    }

    fn release(&mut self) -> TurgorResult<()> {
        if !self.mapped {
            return Ok(());
        }
        self.mapped = false;
        self.buffer
            .ctx
            .backend()
            .unmap(self.buffer.memory, bytemuck::cast_slice(self.data.as_slice()))
    }
}

impl<T: Pod> Deref for MappedView<'_, '_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T: Pod> DerefMut for MappedView<'_, '_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Pod> Drop for MappedView<'_, '_, T> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::error!(memory = self.buffer.memory.0, error = %e, "unmap on drop failed");
        }
    }
}
