//! Matrix-vector multiplication with strategy dispatch.
//!
//! Computes `xout = W @ x` for a row-major `W` of shape `[d, n]` and a
//! vector `x` of length `n`. Two launch strategies share one bind-group
//! layout and one uniform struct:
//!
//! - **PerRow**: one invocation per output row, no shared-memory staging.
//!   Always correct; every row re-reads `x` from global memory.
//! - **Tiled** (default): workgroups of [`TILE_WIDTH`] invocations stage
//!   slices of `x` into workgroup memory behind a two-barrier protocol,
//!   amortizing global reads of `x` across the rows of the group.
//!
//! The strategy is fixed when the kernel is constructed; it changes launch
//! geometry and shader structure, so it is not a per-call decision.
//!
//! # Example
//!
//! ```ignore
//! use reikna::{GpuMatVec, WgpuContext};
//!
//! let context = WgpuContext::new().await?;
//! let matvec = GpuMatVec::new(&context);
//!
//! let mut xout = vec![0.0f32; d];
//! matvec.compute(&mut xout, &x, &w, n, d).await?;
//! ```

use std::sync::Arc;

use wgpu::{BindGroupLayout, CommandEncoder, ComputePipeline};

use crate::error::{ReiknaError, Result};
use crate::gpu::context::WgpuContext;
use crate::gpu::frame::GpuFrame;
use crate::gpu::kernel::Kernel;
use crate::gpu::tensor::GpuTensor;

/// Invocations per workgroup, and floats per shared tile, for the tiled
/// strategy. Must match TILE_WIDTH in matvec_tiled.wgsl.
pub const TILE_WIDTH: u32 = 256;

/// Workgroup width for the per-row strategy. Purely a dispatch granularity;
/// the shader uses no shared memory.
const ROW_WORKGROUP_SIZE: u32 = 64;

/// Uniform parameters passed to both matvec shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct MatVecUniforms {
    /// Columns of W, length of x.
    n: u32,
    /// Rows of W, length of xout.
    d: u32,
    _pad0: u32,
    _pad1: u32,
}

/// Launch strategy for the matrix-vector product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatVecStrategy {
    /// One invocation per output row.
    PerRow,
    /// Workgroups share a staged tile of the input vector.
    #[default]
    Tiled,
}

/// GPU kernel for matrix-vector multiplication.
pub struct GpuMatVec {
    pipeline_per_row: ComputePipeline,
    pipeline_tiled: ComputePipeline,
    bind_group_layout: BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    strategy: MatVecStrategy,
    context: Arc<WgpuContext>,
}

impl GpuMatVec {
    /// Creates a matvec kernel with the default (tiled) strategy.
    pub fn new(context: &Arc<WgpuContext>) -> Self {
        Self::with_strategy(context, MatVecStrategy::default())
    }

    /// Creates a matvec kernel with an explicit strategy.
    ///
    /// Both pipelines are compiled up front; the strategy only selects which
    /// one is dispatched.
    pub fn with_strategy(context: &Arc<WgpuContext>, strategy: MatVecStrategy) -> Self {
        let device = &context.device;

        let bind_group_layout = create_bind_group_layout(device);

        let shader_per_row =
            device.create_shader_module(wgpu::include_wgsl!("./matvec_per_row.wgsl"));
        let pipeline_per_row = create_pipeline(
            device,
            &bind_group_layout,
            &shader_per_row,
            "MatVec PerRow",
        );

        let shader_tiled = device.create_shader_module(wgpu::include_wgsl!("./matvec_tiled.wgsl"));
        let pipeline_tiled =
            create_pipeline(device, &bind_group_layout, &shader_tiled, "MatVec Tiled");

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("MatVec Uniforms"),
            size: std::mem::size_of::<MatVecUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            pipeline_per_row,
            pipeline_tiled,
            bind_group_layout,
            uniform_buffer,
            strategy,
            context: context.clone(),
        }
    }

    pub fn strategy(&self) -> MatVecStrategy {
        self.strategy
    }

    /// Computes `xout[i] = sum_j w[i*n + j] * x[j]` for every `i` in `0..d`.
    ///
    /// Stages the host slices into device buffers, submits one launch and
    /// blocks until the device has synchronized the result back into `xout`.
    /// On any error `xout` is left untouched.
    pub async fn compute(
        &self,
        xout: &mut [f32],
        x: &[f32],
        w: &[f32],
        n: usize,
        d: usize,
    ) -> Result<()> {
        validate_dims(xout, x, w, n, d)?;

        // Zero-sized wgpu buffers cannot be bound; both shapes degenerate to
        // host-side answers.
        if d == 0 {
            return Ok(());
        }
        if n == 0 {
            xout.fill(0.0);
            return Ok(());
        }

        let w_bytes = (d * n * std::mem::size_of::<f32>()) as u64;
        let limit = u64::from(self.context.memory_info.max_storage_buffer_binding_size);
        if w_bytes > limit {
            return Err(ReiknaError::BufferTooLarge {
                requested: w_bytes,
                limit,
            });
        }

        let x_gpu = GpuTensor::from_slice(&self.context, x, &[n], "matvec_x");
        let w_gpu = GpuTensor::from_slice(&self.context, w, &[d, n], "matvec_w");
        let out_gpu = GpuTensor::uninitialized(&self.context, &[d], "matvec_xout");

        let mut frame = GpuFrame::new(&self.context);
        self.encode(frame.encoder(), &[&x_gpu, &w_gpu], &out_gpu);
        frame.finish();

        let result = out_gpu.read_to_vec().await?;
        xout.copy_from_slice(&result);
        Ok(())
    }
}

impl Kernel for GpuMatVec {
    /// Encodes the matrix-vector product to the command encoder.
    ///
    /// `inputs` is `[x, w]` with x of shape `[n]` and w of shape `[d, n]`;
    /// `output` has shape `[d]`.
    ///
    /// # Panics
    ///
    /// Panics if tensor ranks or shapes are inconsistent.
    fn encode(&self, encoder: &mut CommandEncoder, inputs: &[&GpuTensor], output: &GpuTensor) {
        let x = inputs[0];
        let w = inputs[1];

        assert_eq!(x.rank(), 1, "input vector must be a 1D tensor");
        assert_eq!(w.rank(), 2, "weight matrix must be a 2D tensor");
        assert_eq!(output.rank(), 1, "output vector must be a 1D tensor");

        let d = w.shape()[0];
        let n = w.shape()[1];
        assert_eq!(x.shape()[0], n, "x length must match W columns");
        assert_eq!(output.shape()[0], d, "xout length must match W rows");

        let uniforms = MatVecUniforms {
            n: n as u32,
            d: d as u32,
            _pad0: 0,
            _pad1: 0,
        };
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let bind_group = self
            .context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("MatVec Bind Group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.uniform_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: x.buffer().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: w.buffer().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: output.buffer().as_entire_binding(),
                    },
                ],
            });

        let (pipeline, group_width) = match self.strategy {
            MatVecStrategy::PerRow => (&self.pipeline_per_row, ROW_WORKGROUP_SIZE),
            MatVecStrategy::Tiled => (&self.pipeline_tiled, TILE_WIDTH),
        };
        let workgroups = (d as u32 + group_width - 1) / group_width;
        log::debug!(
            "dispatching matvec [{}x{}] via {:?}: {} workgroups of {}",
            d,
            n,
            self.strategy,
            workgroups,
            group_width
        );

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("matvec pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(workgroups, 1, 1);
    }
}

pub(crate) fn validate_dims(
    xout: &[f32],
    x: &[f32],
    w: &[f32],
    n: usize,
    d: usize,
) -> Result<()> {
    if x.len() != n {
        return Err(ReiknaError::InvalidDimensions(format!(
            "input vector has {} elements, expected n={}",
            x.len(),
            n
        )));
    }
    if w.len() != n * d {
        return Err(ReiknaError::InvalidDimensions(format!(
            "weight matrix has {} elements, expected d*n={}*{}={}",
            w.len(),
            d,
            n,
            n * d
        )));
    }
    if xout.len() != d {
        return Err(ReiknaError::InvalidDimensions(format!(
            "output vector has {} elements, expected d={}",
            xout.len(),
            d
        )));
    }
    Ok(())
}

// --- Helpers ---

fn create_bind_group_layout(device: &wgpu::Device) -> BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("MatVec Shared Layout"),
        entries: &[
            // Uniforms
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Input vector x (ReadOnly)
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Weight matrix W (ReadOnly)
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Output vector xout (ReadWrite)
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
    })
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &BindGroupLayout,
    module: &wgpu::ShaderModule,
    label: &str,
) -> ComputePipeline {
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{} Layout", label)),
        bind_group_layouts: &[layout],
        push_constant_ranges: &[],
    });

    device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(label),
        layout: Some(&pipeline_layout),
        module,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    })
}
