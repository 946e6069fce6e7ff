//! Rasterizing on the GPU with `burn-jit`.
//!
//! The kernel runs one workgroup of `T_x * T_y` invocations per tile and
//! stages the points in workgroup memory, the same way [`group`] does.

pub use super::*;
pub use crate::backend::jit::{FloatElement, IntElement, JitBackend, JitRuntime};
pub use burn_jit::{
    cubecl::KernelId,
    template::{KernelSource, SourceTemplate},
    tensor::JitTensor,
};

use burn::tensor::ops::{FloatTensorOps, IntTensorOps};
use burn_jit::{
    cubecl::{CubeCount, CubeDim},
    kernel::into_contiguous,
    template::SourceKernel,
};
use bytemuck::bytes_of;

#[derive(Clone, Copy, Debug, Default)]
pub struct Kernel;

#[derive(Clone, Debug)]
pub struct Inputs<R: JitRuntime, F: FloatElement, I: IntElement> {
    /// `[P, 4]`
    pub colors_rgb_3d: JitTensor<R, F>,
    /// `[P, 4]`
    pub conics: JitTensor<R, F>,
    /// `[P]`
    pub opacities_3d: JitTensor<R, F>,
    /// `[T]`
    pub point_indices: JitTensor<R, I>,
    /// `[P, 2]`
    pub positions_2d: JitTensor<R, F>,
    /// `[I_y / T_y, I_x / T_x, 2]`
    pub tile_point_ranges: JitTensor<R, I>,
}

#[derive(Clone, Debug)]
pub struct Outputs<R: JitRuntime, F: FloatElement, I: IntElement> {
    /// `[I_y, I_x, 4]`
    pub colors_rgba_2d: JitTensor<R, F>,
    /// `[I_y, I_x]`
    pub point_final_indices: JitTensor<R, I>,
}

impl KernelSource for Kernel {
    fn source(&self) -> SourceTemplate {
        SourceTemplate::new(include_str!("kernel.wgsl"))
    }

    fn id(&self) -> KernelId {
        KernelId::new::<Self>()
    }
}

/// Rasterizing the points to the image.
pub fn main<R: JitRuntime, F: FloatElement, I: IntElement>(
    arguments: Arguments,
    inputs: Inputs<R, F, I>,
) -> Outputs<R, F, I> {
    // Specifying the inputs

    let colors_rgb_3d = into_contiguous(inputs.colors_rgb_3d);
    let conics = into_contiguous(inputs.conics);
    let opacities_3d = into_contiguous(inputs.opacities_3d);
    let point_indices = into_contiguous(inputs.point_indices);
    let positions_2d = into_contiguous(inputs.positions_2d);
    let tile_point_ranges = into_contiguous(inputs.tile_point_ranges);

    // Specifying the parameters

    let client = &colors_rgb_3d.client;
    let device = &colors_rgb_3d.device;
    // I_x
    let image_size_x = arguments.image_size_x as usize;
    // I_y
    let image_size_y = arguments.image_size_y as usize;
    // I_x / T_x
    let tile_count_x = arguments.tile_count_x as usize;
    // I_y / T_y
    let tile_count_y = arguments.tile_count_y as usize;
    // P
    let point_count = positions_2d.shape.dims[0];

    debug_assert_eq!(colors_rgb_3d.shape.dims, [point_count, 4]);
    debug_assert_eq!(conics.shape.dims, [point_count, 4]);
    debug_assert_eq!(opacities_3d.shape.dims, [point_count]);
    debug_assert_eq!(positions_2d.shape.dims, [point_count, 2]);
    debug_assert_eq!(point_indices.shape.num_dims(), 1);
    debug_assert_eq!(
        tile_point_ranges.shape.dims,
        [tile_count_y, tile_count_x, 2]
    );
    debug_assert!(
        tile_count_x * TILE_SIZE_X as usize >= image_size_x,
        "tile_count_x should cover the image"
    );
    debug_assert!(
        tile_count_y * TILE_SIZE_Y as usize >= image_size_y,
        "tile_count_y should cover the image"
    );

    #[cfg(debug_assertions)]
    log::debug!(
        target: "gausplat_rasterizer::jit",
        "main > tile_count ({}), point_count ({point_count})",
        arguments.tile_count(),
    );

    // [I_y, I_x, 4]
    let colors_rgba_2d = JitBackend::<R, F, I>::float_empty(
        [image_size_y, image_size_x, 4].into(),
        device,
    );
    // [I_y, I_x]
    let point_final_indices = JitBackend::<R, F, I>::int_empty(
        [image_size_y, image_size_x].into(),
        device,
    );

    // Launching the kernel

    client.execute(
        Box::new(SourceKernel::new(
            Kernel,
            CubeDim {
                x: TILE_SIZE_X,
                y: TILE_SIZE_Y,
                z: 1,
            },
        )),
        CubeCount::Static(arguments.tile_count_x, arguments.tile_count_y, 1),
        vec![
            client.create(bytes_of(&arguments)).binding(),
            colors_rgb_3d.handle.binding(),
            conics.handle.binding(),
            opacities_3d.handle.binding(),
            point_indices.handle.binding(),
            positions_2d.handle.binding(),
            tile_point_ranges.handle.binding(),
            colors_rgba_2d.handle.to_owned().binding(),
            point_final_indices.handle.to_owned().binding(),
        ],
    );

    Outputs {
        colors_rgba_2d,
        point_final_indices,
    }
}
