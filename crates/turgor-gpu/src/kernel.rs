//! Named entry points with a declared argument signature.

use turgor_types::{TurgorError, TurgorResult};

use crate::backend::{ArgKind, KernelArg, KernelHandle};
use crate::context::ComputeContext;
use crate::status::DeviceStatus;

/// One entry point of the compute program, bound at construction.
pub struct ComputeKernel<'ctx> {
    ctx: &'ctx ComputeContext,
    handle: KernelHandle,
    name: String,
    signature: Vec<ArgKind>,
}

impl<'ctx> ComputeKernel<'ctx> {
    /// Resolves `name` in the context's program.
    ///
    /// Fails with `KernelNotFound` if there is no such entry point.
    pub fn new(ctx: &'ctx ComputeContext, name: &str, signature: &[ArgKind]) -> TurgorResult<Self> {
        let handle = ctx.backend().create_kernel(name)?;
        tracing::debug!(kernel = name, arity = signature.len(), "kernel created");
        Ok(Self {
            ctx,
            handle,
            name: name.to_string(),
            signature: signature.to_vec(),
        })
    }

    /// Entry point name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared argument kinds, in binding order.
    pub fn signature(&self) -> &[ArgKind] {
        &self.signature
    }

    /// Dispatches over `work_items` and blocks until completion.
    ///
    /// Arguments are checked against the declared signature before
    /// anything is enqueued.
    pub fn execute(&self, work_items: usize, args: &[KernelArg]) -> TurgorResult<()> {
        self.check_args(args)?;
        self.ctx.backend().enqueue(self.handle, work_items, args)?;
        self.ctx.backend().finish().map_err(|e| TurgorError::Dispatch {
            kernel: self.name.clone(),
            diagnostic: DeviceStatus::ExecutionFailure.decode(&e.to_string()),
        })
    }

    fn check_args(&self, args: &[KernelArg]) -> TurgorResult<()> {
        if args.len() != self.signature.len() {
            return Err(self.mismatch(
                DeviceStatus::InvalidKernelArgs,
                format!("expected {} arguments, got {}", self.signature.len(), args.len()),
            ));
        }
        for (index, (arg, expected)) in args.iter().zip(&self.signature).enumerate() {
            if arg.kind() != *expected {
                return Err(self.mismatch(
                    DeviceStatus::InvalidArgValue,
                    format!("argument {index}: expected {expected:?}, got {:?}", arg.kind()),
                ));
            }
        }
        Ok(())
    }

    fn mismatch(&self, status: DeviceStatus, detail: String) -> TurgorError {
        TurgorError::Dispatch {
            kernel: self.name.clone(),
            diagnostic: status.decode(&detail),
        }
    }
}

impl std::fmt::Debug for ComputeKernel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeKernel")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

impl Drop for ComputeKernel<'_> {
    fn drop(&mut self) {
        self.ctx.backend().release_kernel(self.handle);
    }
}
