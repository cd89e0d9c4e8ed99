//! Explicit compute context.
//!
//! A [`ComputeContext`] owns the backend. Buffers and kernels borrow it, so
//! it must be created first and outlives everything built from it. Only one
//! context may be live per control thread.

use std::cell::Cell;

use turgor_types::{TurgorError, TurgorResult};

use crate::backend::ComputeBackend;

thread_local! {
    static CONTEXT_LIVE: Cell<bool> = const { Cell::new(false) };
}

/// The live compute backend for this thread.
pub struct ComputeContext {
    backend: Box<dyn ComputeBackend>,
}

impl ComputeContext {
    /// Initializes `backend` and wraps it.
    ///
    /// Fails with `BackendFatal` if another context is live on this thread
    /// or the backend cannot be initialized.
    pub fn new(backend: impl ComputeBackend + 'static) -> TurgorResult<Self> {
        if CONTEXT_LIVE.with(Cell::get) {
            return Err(TurgorError::BackendFatal(
                "a compute context is already live on this thread".into(),
            ));
        }
        let mut backend: Box<dyn ComputeBackend> = Box::new(backend);
        backend.init()?;
        CONTEXT_LIVE.with(|live| live.set(true));
        tracing::info!(backend = backend.name(), gpu = backend.is_gpu(), "compute context created");
        Ok(Self { backend })
    }

    /// The initialized backend.
    pub fn backend(&self) -> &dyn ComputeBackend {
        self.backend.as_ref()
    }

    /// Backend name, for logs and reports.
    pub fn name(&self) -> &str {
        self.backend.name()
    }

    /// Blocks until all enqueued work has completed.
    pub fn finish(&self) -> TurgorResult<()> {
        self.backend.finish()
    }
}

impl std::fmt::Debug for ComputeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputeContext")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Drop for ComputeContext {
    fn drop(&mut self) {
        if let Err(e) = self.backend.finish() {
            tracing::error!(error = %e, "finish failed while dropping compute context");
        }
        CONTEXT_LIVE.with(|live| live.set(false));
    }
}
