//! Device selection and queue lifecycle.

use std::sync::Arc;

use wgpu::{
    Adapter, DeviceDescriptor, Features, Instance, InstanceDescriptor, PowerPreference,
    RequestAdapterOptions,
};

use crate::error::Result;

/// Snapshot of the adapter limits that bound a single launch.
#[derive(Debug, Clone)]
pub struct GpuMemoryInfo {
    pub max_buffer_size: u64,
    pub max_storage_buffer_binding_size: u32,
}

/// WebGPU device context. Owns the queue shared by every kernel launch.
///
/// Created once per process through [`crate::global_context`], or explicitly
/// for callers that manage their own session.
pub struct WgpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter: Adapter,
    pub memory_info: GpuMemoryInfo,
}

impl WgpuContext {
    pub async fn new() -> Result<Arc<Self>> {
        Self::with_config(GpuConfig::default()).await
    }

    pub async fn with_config(config: GpuConfig) -> Result<Arc<Self>> {
        let instance = Instance::new(&InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            flags: wgpu::InstanceFlags::empty(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: config.power_preference,
                force_fallback_adapter: config.force_fallback_adapter,
                compatible_surface: None,
            })
            .await?;

        let adapter_info = adapter.get_info();
        log::info!(
            "using compute device: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );

        let adapter_limits = adapter.limits();
        log::debug!(
            "adapter limits: max_buffer={:.2}GB, max_binding={:.2}GB",
            adapter_limits.max_buffer_size as f64 / 1_073_741_824.0,
            adapter_limits.max_storage_buffer_binding_size as f64 / 1_073_741_824.0
        );

        let memory_info = GpuMemoryInfo {
            max_buffer_size: adapter_limits.max_buffer_size,
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
        };

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("reikna_matvec"),
                required_features: Features::empty(),
                required_limits: adapter_limits.clone(),
                ..Default::default()
            })
            .await?;

        Ok(Arc::new(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter,
            memory_info,
        }))
    }

    /// Name of the selected adapter.
    pub fn device_name(&self) -> String {
        self.adapter.get_info().name
    }
}

/// Device-selection policy for a context.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    /// Preference passed to adapter selection. GPU-class devices first.
    pub power_preference: PowerPreference,
    /// Accept the runtime's software fallback adapter.
    pub force_fallback_adapter: bool,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            power_preference: PowerPreference::HighPerformance,
            force_fallback_adapter: false,
        }
    }
}
