//! GPU-accelerated matrix-vector multiplication.
//!
//! This crate provides one operation: `xout = W @ x` for a dense row-major
//! `W` of shape `[d, n]` and a vector `x` of length `n`, executed on a
//! compute accelerator through WebGPU. It is intended as a drop-in
//! replacement for a CPU-side matvec inside a larger numerical pipeline
//! (e.g. a transformer forward pass).
//!
//! # Quick Start
//!
//! ```ignore
//! use reikna::multiply_matrix_vector;
//!
//! // Blocking one-shot API; uses a cached process-wide device session.
//! let mut xout = vec![0.0f32; d];
//! multiply_matrix_vector(&mut xout, &x, &w, n, d)?;
//! ```
//!
//! # Explicit session
//!
//! For repeated calls or a non-default launch strategy:
//!
//! ```ignore
//! use reikna::{GpuMatVec, MatVecStrategy, WgpuContext};
//!
//! let context = WgpuContext::new().await?;
//! let matvec = GpuMatVec::with_strategy(&context, MatVecStrategy::PerRow);
//!
//! let mut xout = vec![0.0f32; d];
//! matvec.compute(&mut xout, &x, &w, n, d).await?;
//! ```
//!
//! The convenience function caches a lazily-initialized global context and
//! kernel, so shaders are compiled once per process rather than per call.

pub mod cpu;
pub mod error;
pub mod gpu;

pub use error::{ReiknaError, Result};
pub use gpu::context::{GpuConfig, WgpuContext};
pub use gpu::kernel::Kernel;
pub use gpu::primitives::matvec::{GpuMatVec, MatVecStrategy, TILE_WIDTH};
pub use gpu::tensor::GpuTensor;

use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;

/// Global device session for the convenience function.
/// Lazily initialized on first use, persists for the process lifetime.
static GLOBAL_CONTEXT: OnceLock<Arc<WgpuContext>> = OnceLock::new();

/// Kernel (compiled pipelines) bound to the global session.
static GLOBAL_KERNEL: OnceLock<GpuMatVec> = OnceLock::new();

/// Serializes first-time initialization of the global session.
static INIT_LOCK: Mutex<()> = Mutex::const_new(());

/// Get or initialize the process-wide device session.
///
/// Thread-safe: concurrent first calls are serialized and the session is
/// created exactly once. Subsequent calls return the cached session.
///
/// # Errors
///
/// Returns an error if no compute adapter is available or device creation
/// fails.
pub async fn global_context() -> Result<Arc<WgpuContext>> {
    // Fast path: already initialized.
    if let Some(context) = GLOBAL_CONTEXT.get() {
        return Ok(context.clone());
    }

    let _lock = INIT_LOCK.lock().await;

    // Double-check after acquiring the lock.
    if let Some(context) = GLOBAL_CONTEXT.get() {
        return Ok(context.clone());
    }

    let context = WgpuContext::new().await?;
    let _ = GLOBAL_CONTEXT.set(context.clone());
    Ok(context)
}

/// One-shot matrix-vector multiplication on the GPU.
///
/// Computes `xout[i] = sum_j w[i*n + j] * x[j]` for every `i` in `0..d`,
/// where `w` is row-major with `d` rows of `n` columns. Blocks the calling
/// thread until the result has been synchronized back into `xout`.
///
/// Uses the cached global session and the default (tiled) strategy. For
/// explicit session or strategy control use [`GpuMatVec`] directly.
///
/// # Errors
///
/// Returns [`ReiknaError::InvalidDimensions`] before any device work if the
/// slice lengths do not match `n`/`d`, and environment or device errors if
/// no accelerator is usable. On error `xout` is left untouched.
pub fn multiply_matrix_vector(
    xout: &mut [f32],
    x: &[f32],
    w: &[f32],
    n: usize,
    d: usize,
) -> Result<()> {
    gpu::primitives::matvec::validate_dims(xout, x, w, n, d)?;

    pollster::block_on(async {
        let context = global_context().await?;
        let kernel = GLOBAL_KERNEL.get_or_init(|| GpuMatVec::new(&context));
        kernel.compute(xout, x, w, n, d).await
    })
}
