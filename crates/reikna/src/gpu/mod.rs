pub mod context;
pub mod frame;
pub mod kernel;
pub mod primitives;
pub mod tensor;

pub use context::{GpuConfig, WgpuContext};
pub use frame::GpuFrame;
pub use kernel::Kernel;
pub use tensor::GpuTensor;
