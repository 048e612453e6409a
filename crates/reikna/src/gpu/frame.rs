use std::sync::Arc;

use wgpu::CommandEncoder;

use crate::gpu::context::WgpuContext;

/// A guard that manages the command encoder for a single batch of GPU work.
///
/// `finish` submits the recorded work to the queue. Dropping an unfinished
/// frame discards the recorded work, so an early error return never leaves a
/// half-built submission observable on the queue.
pub struct GpuFrame<'a> {
    encoder: Option<CommandEncoder>,
    context: &'a Arc<WgpuContext>,
    submitted: bool,
}

impl<'a> GpuFrame<'a> {
    pub fn new(context: &'a Arc<WgpuContext>) -> Self {
        let encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("GpuFrame Encoder"),
            });
        Self {
            encoder: Some(encoder),
            context,
            submitted: false,
        }
    }

    pub fn encoder(&mut self) -> &mut CommandEncoder {
        self.encoder.as_mut().unwrap()
    }

    pub fn finish(mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.context.queue.submit(Some(encoder.finish()));
        }
        self.submitted = true;
    }
}

impl Drop for GpuFrame<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        if !self.submitted && self.encoder.is_some() {
            log::warn!("GpuFrame dropped without submission. Work discarded.");
        }
    }
}
