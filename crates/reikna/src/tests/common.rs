// Allow this module to be used by other tests, but not compiled into the final library.
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;

use crate::gpu::tensor::GpuTensor;
use crate::WgpuContext;

/// Creates a context for tests, or skips when no adapter is present.
pub async fn try_test_context() -> Option<Arc<WgpuContext>> {
    match WgpuContext::new().await {
        Ok(context) => Some(context),
        Err(e) => {
            println!("wgpu not available, skipping test: {}", e);
            None
        }
    }
}

pub async fn read_gpu_tensor_to_vec(tensor: &GpuTensor) -> Result<(Vec<f32>, Vec<usize>)> {
    let data = tensor.read_to_vec().await?;
    Ok((data, tensor.shape().to_vec()))
}

/// Compares CPU and GPU results with a tolerance.
pub fn assert_all_close(a: &[f32], b: &[f32], tolerance: f32) {
    assert_eq!(a.len(), b.len(), "length mismatch: {} vs {}", a.len(), b.len());
    let max_diff = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0f32, f32::max);
    assert!(
        max_diff < tolerance,
        "arrays not close, max difference: {}",
        max_diff
    );
}
