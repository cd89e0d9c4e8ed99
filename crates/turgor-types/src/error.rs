//! Error types for the Turgor engine.
//!
//! All crates return `TurgorResult<T>` from fallible operations.
//! Best-effort topology problems are *not* errors; they are reported as
//! [`Diagnostic`](crate::Diagnostic) values and the build continues.

use thiserror::Error;

/// Unified error type for the Turgor engine.
#[derive(Debug, Error)]
pub enum TurgorError {
    /// Mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The compute backend could not be brought up (context, queue,
    /// program build). Unrecoverable.
    #[error("Compute backend failure: {0}")]
    BackendFatal(String),

    /// The compiled program has no entry point with this name.
    #[error("Kernel entry point not found: {0}")]
    KernelNotFound(String),

    /// Mapping or unmapping device memory failed.
    #[error("Buffer mapping failed: {0}")]
    Map(String),

    /// A kernel dispatch was rejected or failed on the device.
    #[error("Dispatch of '{kernel}' failed: {diagnostic}")]
    Dispatch {
        /// Entry point name.
        kernel: String,
        /// Decoded device status and detail.
        diagnostic: String,
    },
}

impl TurgorError {
    /// Returns true for errors raised while setting up the backend,
    /// which the process cannot recover from.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TurgorError::BackendFatal(_) | TurgorError::KernelNotFound(_)
        )
    }
}

/// Convenience alias for `Result<T, TurgorError>`.
pub type TurgorResult<T> = Result<T, TurgorError>;
