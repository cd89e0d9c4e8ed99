//! Sequential host backend.
//!
//! [`CpuBackend`] executes a [`Program`] (a table of named host functions)
//! one dispatch at a time. Device memory is a set of byte vectors keyed by
//! [`MemoryHandle`]. Buffer arguments are staged into a [`KernelArgs`]
//! bundle before the entry point runs and written back only when it
//! returns `Ok`, so a faulting dispatch leaves every buffer untouched.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use bytemuck::Pod;
use turgor_types::{TurgorError, TurgorResult};

use crate::backend::{ComputeBackend, KernelArg, KernelHandle, MemoryHandle};
use crate::status::{DeviceStatus, KernelFault};

/// Host implementation of one entry point.
///
/// Receives the dispatch size and the bound arguments.
pub type KernelFn = fn(usize, &mut KernelArgs) -> Result<(), KernelFault>;

/// A compiled program: entry point name → host function.
#[derive(Debug, Clone, Default)]
pub struct Program {
    entries: BTreeMap<String, KernelFn>,
}

impl Program {
    /// Creates an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry point.
    pub fn with_entry(mut self, name: &str, entry: KernelFn) -> Self {
        self.insert(name, entry);
        self
    }

    /// Adds or replaces the entry point `name`.
    pub fn insert(&mut self, name: &str, entry: KernelFn) {
        self.entries.insert(name.to_string(), entry);
    }

    /// Looks up the entry point `name`.
    pub fn get(&self, name: &str) -> Option<KernelFn> {
        self.entries.get(name).copied()
    }

    /// Whether `name` is defined.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entry point names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entry points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the program defines no entry points.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
enum Bound {
    Int(i32),
    Float(f32),
    Buffer {
        memory: MemoryHandle,
        bytes: Vec<u8>,
        dirty: bool,
    },
}

/// Arguments bound to one dispatch, as seen by a [`KernelFn`].
#[derive(Debug)]
pub struct KernelArgs {
    bound: Vec<Bound>,
}

impl KernelArgs {
    /// Number of bound arguments.
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    /// Whether no arguments are bound.
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }

    /// Scalar integer argument at `index`.
    pub fn int(&self, index: usize) -> Result<i32, KernelFault> {
        match self.bound.get(index) {
            Some(Bound::Int(v)) => Ok(*v),
            _ => Err(arg_fault(index, "int")),
        }
    }

    /// Scalar float argument at `index`.
    pub fn float(&self, index: usize) -> Result<f32, KernelFault> {
        match self.bound.get(index) {
            Some(Bound::Float(v)) => Ok(*v),
            _ => Err(arg_fault(index, "float")),
        }
    }

    /// Copies the buffer argument at `index` out as a typed vector.
    ///
    /// Fails if the byte length is not a multiple of `size_of::<T>()`.
    pub fn read<T: Pod>(&self, index: usize) -> Result<Vec<T>, KernelFault> {
        let bytes = self.bytes(index)?;
        let size = std::mem::size_of::<T>();
        if size == 0 || bytes.len() % size != 0 {
            return Err(KernelFault::new(
                DeviceStatus::InvalidArgValue,
                format!(
                    "argument {index}: {} bytes is not a whole number of {size}-byte elements",
                    bytes.len()
                ),
            ));
        }
        Ok(bytes
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    /// Overwrites the buffer argument at `index`.
    ///
    /// `data` must cover the whole buffer.
    pub fn write<T: Pod>(&mut self, index: usize, data: &[T]) -> Result<(), KernelFault> {
        match self.bound.get_mut(index) {
            Some(Bound::Buffer { bytes, dirty, .. }) => {
                let src: &[u8] = bytemuck::cast_slice(data);
                if src.len() != bytes.len() {
                    return Err(KernelFault::new(
                        DeviceStatus::InvalidArgValue,
                        format!(
                            "argument {index}: wrote {} bytes into a {}-byte buffer",
                            src.len(),
                            bytes.len()
                        ),
                    ));
                }
                bytes.copy_from_slice(src);
                *dirty = true;
                Ok(())
            }
            _ => Err(arg_fault(index, "buffer")),
        }
    }

    fn bytes(&self, index: usize) -> Result<&[u8], KernelFault> {
        match self.bound.get(index) {
            Some(Bound::Buffer { bytes, .. }) => Ok(bytes),
            _ => Err(arg_fault(index, "buffer")),
        }
    }
}

fn arg_fault(index: usize, expected: &str) -> KernelFault {
    KernelFault::new(
        DeviceStatus::InvalidArgIndex,
        format!("argument {index} is not a bound {expected}"),
    )
}

#[derive(Debug)]
struct Allocation {
    bytes: Vec<u8>,
    mapped: bool,
}

/// Sequential host execution of a [`Program`].
#[derive(Debug)]
pub struct CpuBackend {
    program: Program,
    initialized: bool,
    memory: RefCell<HashMap<MemoryHandle, Allocation>>,
    kernels: RefCell<HashMap<KernelHandle, String>>,
    next_id: Cell<u64>,
    dispatches: Cell<u64>,
}

impl CpuBackend {
    /// Creates a backend that runs `program`. Fails at `init` if it is empty.
    pub fn new(program: Program) -> Self {
        Self {
            program,
            initialized: false,
            memory: RefCell::new(HashMap::new()),
            kernels: RefCell::new(HashMap::new()),
            next_id: Cell::new(1),
            dispatches: Cell::new(0),
        }
    }

    /// Number of dispatches that ran to completion.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.get()
    }

    /// Number of live allocations.
    pub fn allocation_count(&self) -> usize {
        self.memory.borrow().len()
    }

    /// Number of live kernel objects.
    pub fn kernel_count(&self) -> usize {
        self.kernels.borrow().len()
    }

    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn bind(&self, args: &[KernelArg]) -> Result<KernelArgs, KernelFault> {
        let memory = self.memory.borrow();
        let mut bound = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            bound.push(match *arg {
                KernelArg::Int(v) => Bound::Int(v),
                KernelArg::Float(v) => Bound::Float(v),
                KernelArg::Buffer(handle) => {
                    let alloc = memory.get(&handle).ok_or_else(|| {
                        KernelFault::new(
                            DeviceStatus::InvalidMemObject,
                            format!("argument {index}: unknown buffer {}", handle.0),
                        )
                    })?;
                    if alloc.mapped {
                        return Err(KernelFault::new(
                            DeviceStatus::InvalidMemObject,
                            format!("argument {index}: buffer {} is mapped", handle.0),
                        ));
                    }
                    Bound::Buffer {
                        memory: handle,
                        bytes: alloc.bytes.clone(),
                        dirty: false,
                    }
                }
            });
        }
        Ok(KernelArgs { bound })
    }
}

impl ComputeBackend for CpuBackend {
    fn init(&mut self) -> TurgorResult<()> {
        if self.program.is_empty() {
            return Err(TurgorError::BackendFatal(
                "program has no entry points".into(),
            ));
        }
        self.initialized = true;
        tracing::debug!(entries = self.program.len(), "cpu backend initialized");
        Ok(())
    }

    fn name(&self) -> &str {
        "cpu_reference"
    }

    fn is_gpu(&self) -> bool {
        false
    }

    fn allocate(&self, byte_len: usize) -> TurgorResult<MemoryHandle> {
        if !self.initialized {
            return Err(TurgorError::BackendFatal("backend not initialized".into()));
        }
        let handle = MemoryHandle(self.next_id());
        self.memory.borrow_mut().insert(
            handle,
            Allocation {
                bytes: vec![0; byte_len],
                mapped: false,
            },
        );
        Ok(handle)
    }

    fn release(&self, memory: MemoryHandle) {
        self.memory.borrow_mut().remove(&memory);
    }

    fn map(&self, memory: MemoryHandle) -> TurgorResult<Vec<u8>> {
        let mut allocations = self.memory.borrow_mut();
        let alloc = allocations
            .get_mut(&memory)
            .ok_or_else(|| TurgorError::Map(DeviceStatus::InvalidMemObject.decode("unknown buffer")))?;
        if alloc.mapped {
            return Err(TurgorError::Map(
                DeviceStatus::MapFailure.decode("buffer is already mapped"),
            ));
        }
        alloc.mapped = true;
        Ok(alloc.bytes.clone())
    }

    fn unmap(&self, memory: MemoryHandle, contents: &[u8]) -> TurgorResult<()> {
        let mut allocations = self.memory.borrow_mut();
        let alloc = allocations
            .get_mut(&memory)
            .ok_or_else(|| TurgorError::Map(DeviceStatus::InvalidMemObject.decode("unknown buffer")))?;
        if !alloc.mapped {
            return Err(TurgorError::Map(
                DeviceStatus::InvalidValue.decode("buffer is not mapped"),
            ));
        }
        if contents.len() != alloc.bytes.len() {
            return Err(TurgorError::Map(DeviceStatus::InvalidValue.decode(&format!(
                "unmap of {} bytes into a {}-byte buffer",
                contents.len(),
                alloc.bytes.len()
            ))));
        }
        alloc.bytes.copy_from_slice(contents);
        alloc.mapped = false;
        Ok(())
    }

    fn create_kernel(&self, name: &str) -> TurgorResult<KernelHandle> {
        if !self.program.contains(name) {
            return Err(TurgorError::KernelNotFound(name.to_string()));
        }
        let handle = KernelHandle(self.next_id());
        self.kernels.borrow_mut().insert(handle, name.to_string());
        Ok(handle)
    }

    fn release_kernel(&self, kernel: KernelHandle) {
        self.kernels.borrow_mut().remove(&kernel);
    }

    fn enqueue(
        &self,
        kernel: KernelHandle,
        work_items: usize,
        args: &[KernelArg],
    ) -> TurgorResult<()> {
        let name = self.kernels.borrow().get(&kernel).cloned().ok_or_else(|| {
            TurgorError::Dispatch {
                kernel: format!("#{}", kernel.0),
                diagnostic: DeviceStatus::InvalidKernel.decode("kernel was released"),
            }
        })?;
        let dispatch_error = |fault: KernelFault| TurgorError::Dispatch {
            kernel: name.clone(),
            diagnostic: fault.decode(),
        };

        let entry = self.program.get(&name).ok_or_else(|| {
            dispatch_error(KernelFault::new(
                DeviceStatus::InvalidKernelName,
                "entry point missing from program",
            ))
        })?;
        let mut bound = self.bind(args).map_err(dispatch_error)?;
        entry(work_items, &mut bound).map_err(dispatch_error)?;

        let mut memory = self.memory.borrow_mut();
        for arg in bound.bound {
            if let Bound::Buffer {
                memory: handle,
                bytes,
                dirty: true,
            } = arg
            {
                if let Some(alloc) = memory.get_mut(&handle) {
                    alloc.bytes = bytes;
                }
            }
        }
        self.dispatches.set(self.dispatches.get() + 1);
        Ok(())
    }

    fn finish(&self) -> TurgorResult<()> {
        Ok(())
    }
}
