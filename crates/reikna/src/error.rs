//! Common error types for reikna.

use thiserror::Error;

/// Errors that can occur when running a matrix-vector product.
#[derive(Debug, Error)]
pub enum ReiknaError {
    /// No compute adapter could be found on this system.
    #[error("no compatible compute adapter found: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    /// The adapter was found but a device could not be created on it.
    #[error("failed to create device on adapter: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    /// Caller-supplied buffer lengths do not match the stated dimensions.
    #[error("dimension mismatch: {0}")]
    InvalidDimensions(String),

    /// The weight matrix does not fit in a single storage binding.
    #[error("buffer of {requested} bytes exceeds the device binding limit of {limit} bytes")]
    BufferTooLarge { requested: u64, limit: u64 },

    /// The device failed while executing or synchronizing a launch.
    #[error("gpu readback failed: {0}")]
    Readback(String),
}

/// Result type for reikna operations.
pub type Result<T> = std::result::Result<T, ReiknaError>;
