pub use burn::{
    backend::wgpu::{WgpuDevice, WgpuRuntime},
    tensor::backend::Backend,
};
pub use burn_jit as jit;

pub type Wgpu = jit::JitBackend<WgpuRuntime, f32, i32>;
