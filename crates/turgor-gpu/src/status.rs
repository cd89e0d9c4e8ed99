//! Device status codes and their decoded descriptions.
//!
//! Backends report dispatch and mapping failures as a [`DeviceStatus`]
//! plus free-form detail; [`DeviceStatus::decode`] turns that pair into
//! the diagnostic string carried by `TurgorError::Dispatch`.

use std::fmt;

/// Failure classes a backend can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    OutOfResources,
    MapFailure,
    InvalidValue,
    InvalidMemObject,
    InvalidKernelName,
    InvalidKernel,
    InvalidArgIndex,
    InvalidArgValue,
    InvalidKernelArgs,
    InvalidWorkSize,
    ExecutionFailure,
}

impl DeviceStatus {
    /// Numeric status code.
    pub fn code(self) -> i32 {
        match self {
            DeviceStatus::OutOfResources => -5,
            DeviceStatus::MapFailure => -12,
            DeviceStatus::InvalidValue => -30,
            DeviceStatus::InvalidMemObject => -38,
            DeviceStatus::InvalidKernelName => -46,
            DeviceStatus::InvalidKernel => -48,
            DeviceStatus::InvalidArgIndex => -49,
            DeviceStatus::InvalidArgValue => -50,
            DeviceStatus::InvalidKernelArgs => -52,
            DeviceStatus::InvalidWorkSize => -63,
            DeviceStatus::ExecutionFailure => -9999,
        }
    }

    /// Symbolic name.
    pub fn name(self) -> &'static str {
        match self {
            DeviceStatus::OutOfResources => "OUT_OF_RESOURCES",
            DeviceStatus::MapFailure => "MAP_FAILURE",
            DeviceStatus::InvalidValue => "INVALID_VALUE",
            DeviceStatus::InvalidMemObject => "INVALID_MEM_OBJECT",
            DeviceStatus::InvalidKernelName => "INVALID_KERNEL_NAME",
            DeviceStatus::InvalidKernel => "INVALID_KERNEL",
            DeviceStatus::InvalidArgIndex => "INVALID_ARG_INDEX",
            DeviceStatus::InvalidArgValue => "INVALID_ARG_VALUE",
            DeviceStatus::InvalidKernelArgs => "INVALID_KERNEL_ARGS",
            DeviceStatus::InvalidWorkSize => "INVALID_GLOBAL_WORK_SIZE",
            DeviceStatus::ExecutionFailure => "EXEC_STATUS_ERROR",
        }
    }

    /// Looks a status up by numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        [
            DeviceStatus::OutOfResources,
            DeviceStatus::MapFailure,
            DeviceStatus::InvalidValue,
            DeviceStatus::InvalidMemObject,
            DeviceStatus::InvalidKernelName,
            DeviceStatus::InvalidKernel,
            DeviceStatus::InvalidArgIndex,
            DeviceStatus::InvalidArgValue,
            DeviceStatus::InvalidKernelArgs,
            DeviceStatus::InvalidWorkSize,
            DeviceStatus::ExecutionFailure,
        ]
        .into_iter()
        .find(|s| s.code() == code)
    }

    /// `NAME (code): detail`
    pub fn decode(self, detail: &str) -> String {
        format!("{} ({}): {}", self.name(), self.code(), detail)
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// A failure raised by a kernel body or during argument binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelFault {
    pub status: DeviceStatus,
    pub detail: String,
}

impl KernelFault {
    /// Fault with `status` and a free-form detail message.
    pub fn new(status: DeviceStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// Decoded `NAME (code): detail` string.
    pub fn decode(&self) -> String {
        self.status.decode(&self.detail)
    }
}

impl fmt::Display for KernelFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decode())
    }
}
