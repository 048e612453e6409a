use std::fmt;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferDescriptor, BufferUsages};

use crate::error::{ReiknaError, Result};
use crate::gpu::context::WgpuContext;

/// A GPU-backed f32 tensor bundling a storage buffer with its shape.
///
/// Holds reference-counted pointers to the buffer and context, making it
/// cheap to clone. Buffers are released when the last handle drops.
pub struct GpuTensor {
    buffer: Arc<Buffer>,
    shape: Vec<usize>,
    context: Arc<WgpuContext>,
}

impl Clone for GpuTensor {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            shape: self.shape.clone(),
            context: self.context.clone(),
        }
    }
}

impl fmt::Debug for GpuTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuTensor")
            .field("shape", &self.shape)
            .field("buffer_size", &self.buffer.size())
            .finish_non_exhaustive()
    }
}

impl GpuTensor {
    /// Uploads a host slice into a read-only storage buffer.
    pub fn from_slice(
        context: &Arc<WgpuContext>,
        data: &[f32],
        shape: &[usize],
        label: &str,
    ) -> Self {
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "buffer length does not match shape dimensions"
        );
        log::trace!(
            "uploading tensor '{}': shape={:?} ({} bytes)",
            label,
            shape,
            data.len() * std::mem::size_of::<f32>()
        );

        let buffer = context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: BufferUsages::STORAGE | BufferUsages::COPY_DST | BufferUsages::COPY_SRC,
            });

        Self {
            buffer: Arc::new(buffer),
            shape: shape.to_vec(),
            context: context.clone(),
        }
    }

    /// Allocates a write-only output buffer. Contents are undefined until a
    /// kernel writes them.
    pub fn uninitialized(context: &Arc<WgpuContext>, shape: &[usize], label: &str) -> Self {
        let size = (shape.iter().product::<usize>() * std::mem::size_of::<f32>()) as u64;
        let buffer = context.device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer: Arc::new(buffer),
            shape: shape.to_vec(),
            context: context.clone(),
        }
    }

    /// Reads the buffer back to the CPU. Blocks until the device has
    /// finished all submitted work touching this buffer.
    pub async fn read_to_vec(&self) -> Result<Vec<f32>> {
        let device = &self.context.device;
        let queue = &self.context.queue;
        let buffer_size = self.buffer.size();

        let staging_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("Staging Readback Buffer"),
            size: buffer_size,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging_buffer, 0, buffer_size);
        queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |v| {
            let _ = sender.send(v);
        });

        device
            .poll(wgpu::PollType::wait())
            .map_err(|e| ReiknaError::Readback(format!("device poll failed: {:?}", e)))?;

        match receiver.receive().await {
            Some(Ok(())) => {}
            Some(Err(e)) => {
                return Err(ReiknaError::Readback(format!("buffer map failed: {:?}", e)));
            }
            None => return Err(ReiknaError::Readback("readback channel closed".to_string())),
        }

        let data = buffer_slice.get_mapped_range();
        let result: Vec<f32> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging_buffer.unmap();

        Ok(result)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
    pub fn context(&self) -> &Arc<WgpuContext> {
        &self.context
    }
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn try_context() -> Option<Arc<WgpuContext>> {
        match WgpuContext::new().await {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                println!("wgpu not available, skipping test: {}", e);
                None
            }
        }
    }

    #[tokio::test]
    async fn test_tensor_creation() {
        let Some(ctx) = try_context().await else {
            return;
        };
        let tensor = GpuTensor::uninitialized(&ctx, &[2, 3], "test");

        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor.rank(), 2);
        assert_eq!(tensor.num_elements(), 6);
    }

    #[tokio::test]
    async fn test_roundtrip_cpu_gpu() {
        let Some(ctx) = try_context().await else {
            return;
        };
        let original: Vec<f32> = (0..24).map(|i| i as f32).collect();

        let tensor = GpuTensor::from_slice(&ctx, &original, &[4, 6], "roundtrip");
        let result = tensor.read_to_vec().await.unwrap();

        assert_eq!(result, original);
    }

    #[tokio::test]
    #[should_panic(expected = "buffer length does not match")]
    async fn test_shape_mismatch_panics() {
        let Some(ctx) = try_context().await else {
            // No device to exercise the assert against; fail the same way.
            panic!("buffer length does not match shape dimensions");
        };
        GpuTensor::from_slice(&ctx, &[1.0, 2.0, 3.0], &[2, 2], "bad shape");
    }
}
