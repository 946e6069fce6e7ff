//! Tile-based rasterization of projected Gaussian points.
//!
//! The points are composited front-to-back per pixel. Every tile of
//! `T_x * T_y` pixels is handled by one thread group, which streams the
//! tile's points through group-shared storage in batches of [`BATCH_SIZE`].

pub mod batch;
pub mod group;
pub mod jit;
pub mod pixel;
pub mod reference;

pub use crate::error::Error;
pub use batch::{Batch, BatchPoint};
pub use burn::config::Config;
pub use bytemuck::{Pod, Zeroable};
pub use pixel::{Contribution, Pixel, PixelOutput, PixelState};

/// `T_x`
pub const TILE_SIZE_X: u32 = 16;
/// `T_y`
pub const TILE_SIZE_Y: u32 = 16;
/// `B <- T_x * T_y`
pub const BATCH_SIZE: u32 = TILE_SIZE_X * TILE_SIZE_Y;

/// Uniform parameters of a dispatch.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Arguments {
    pub background_r: f32,
    pub background_g: f32,
    pub background_b: f32,

    /// `I_x`
    pub image_size_x: u32,
    /// `I_y`
    pub image_size_y: u32,

    /// `I_x / T_x`
    pub tile_count_x: u32,
    /// `I_y / T_y`
    pub tile_count_y: u32,
}

#[derive(Config, Debug)]
pub struct RasterizeOptions {
    #[config(default = "[0.0, 0.0, 0.0]")]
    /// The color behind every point.
    pub background_rgb: [f32; 3],

    #[config(default = "0")]
    /// The number of resident thread groups on the CPU.
    ///
    /// Each group is one `rayon` task.
    ///
    /// `0` selects the available parallelism.
    pub group_count: u32,
}

/// Inputs produced by the projection and binning stages.
#[derive(Clone, Copy, Debug)]
pub struct Inputs<'a> {
    /// `[P, 4]`, the alpha channel is unused.
    pub colors_rgb_3d: &'a [[f32; 4]],
    /// `[P, 4]`, laid out as `[[a, b], [b, c]]`.
    pub conics: &'a [[f32; 4]],
    /// `[P]`
    pub opacities_3d: &'a [f32],
    /// `[T]`
    pub point_indices: &'a [u32],
    /// `[P, 2]`
    pub positions_2d: &'a [[f32; 2]],
    /// `[I_y / T_y, I_x / T_x, 2]`
    pub tile_point_ranges: &'a [[u32; 2]],
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outputs {
    /// `[I_y, I_x, 4]`
    pub colors_rgba_2d: Vec<[f32; 4]>,
    /// `[I_y, I_x]`
    pub point_final_indices: Vec<u32>,
}

/// Rasterizing the points to a new image.
pub fn main(
    arguments: &Arguments,
    inputs: &Inputs,
    options: &RasterizeOptions,
) -> Result<Outputs, Error> {
    let mut outputs = Outputs::new(arguments.pixel_count());
    dispatch(arguments, inputs, options, &mut outputs)?;
    Ok(outputs)
}

/// Rasterizing the points into `outputs`.
///
/// The buffers may be longer than the image.
/// Slots beyond `I_y * I_x` are left untouched.
pub fn dispatch(
    arguments: &Arguments,
    inputs: &Inputs,
    options: &RasterizeOptions,
    outputs: &mut Outputs,
) -> Result<(), Error> {
    inputs.validate(arguments)?;
    outputs.validate(arguments)?;

    let group_count = options.group_count_resolved(arguments.tile_count());

    #[cfg(debug_assertions)]
    log::debug!(
        target: "gausplat_rasterizer::rasterize",
        "dispatch > tile_count ({}), group_count ({group_count})",
        arguments.tile_count(),
    );

    group::launch(arguments, inputs, group_count)
        .into_iter()
        .for_each(|output| outputs.write(output));

    Ok(())
}

impl Arguments {
    pub fn new(
        image_size_x: u32,
        image_size_y: u32,
        options: &RasterizeOptions,
    ) -> Self {
        let [background_r, background_g, background_b] =
            options.background_rgb;

        Self {
            background_r,
            background_g,
            background_b,
            image_size_x,
            image_size_y,
            tile_count_x: image_size_x.div_ceil(TILE_SIZE_X),
            tile_count_y: image_size_y.div_ceil(TILE_SIZE_Y),
        }
    }

    #[inline]
    pub const fn background_rgb(&self) -> [f32; 3] {
        [self.background_r, self.background_g, self.background_b]
    }

    /// `I_y * I_x`
    #[inline]
    pub const fn pixel_count(&self) -> usize {
        self.image_size_x as usize * self.image_size_y as usize
    }

    /// `(I_y / T_y) * (I_x / T_x)`
    #[inline]
    pub const fn tile_count(&self) -> usize {
        self.tile_count_x as usize * self.tile_count_y as usize
    }
}

impl RasterizeOptions {
    /// Returns the group count in `1..=tile_count`.
    pub fn group_count_resolved(
        &self,
        tile_count: usize,
    ) -> usize {
        let group_count = match self.group_count {
            0 => std::thread::available_parallelism()
                .map_or(1, |count| count.get()),
            count => count as usize,
        };
        group_count.min(tile_count).max(1)
    }
}

impl Default for RasterizeOptions {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Inputs<'_> {
    /// `P`
    #[inline]
    pub fn point_count(&self) -> usize {
        self.positions_2d.len()
    }

    /// Checking the contract of the upstream stages.
    pub fn validate(
        &self,
        arguments: &Arguments,
    ) -> Result<(), Error> {
        let point_count = self.point_count();
        let point_index_count = self.point_indices.len();

        expect_len("colors_rgb_3d.len()", self.colors_rgb_3d.len(), point_count)?;
        expect_len("conics.len()", self.conics.len(), point_count)?;
        expect_len("opacities_3d.len()", self.opacities_3d.len(), point_count)?;

        let tile_count_x_min = arguments.image_size_x.div_ceil(TILE_SIZE_X);
        if arguments.tile_count_x < tile_count_x_min {
            return Err(Error::Validation(
                format!("tile_count_x ({})", arguments.tile_count_x),
                format!("at least {tile_count_x_min}"),
            ));
        }
        let tile_count_y_min = arguments.image_size_y.div_ceil(TILE_SIZE_Y);
        if arguments.tile_count_y < tile_count_y_min {
            return Err(Error::Validation(
                format!("tile_count_y ({})", arguments.tile_count_y),
                format!("at least {tile_count_y_min}"),
            ));
        }
        expect_len(
            "tile_point_ranges.len()",
            self.tile_point_ranges.len(),
            arguments.tile_count(),
        )?;

        if let Some((tile_index, [start, end])) = self
            .tile_point_ranges
            .iter()
            .enumerate()
            .find(|(_, &[start, end])| {
                start < end && end as usize > point_index_count
            })
        {
            return Err(Error::Validation(
                format!("tile_point_ranges[{tile_index}] ({start}..{end})"),
                format!("within 0..{point_index_count}"),
            ));
        }

        if let Some((index, point_index)) = self
            .point_indices
            .iter()
            .enumerate()
            .find(|(_, &point_index)| point_index as usize >= point_count)
        {
            return Err(Error::Validation(
                format!("point_indices[{index}] ({point_index})"),
                format!("less than {point_count}"),
            ));
        }

        Ok(())
    }
}

impl Outputs {
    /// Zeroed buffers of `pixel_count` slots.
    pub fn new(pixel_count: usize) -> Self {
        Self {
            colors_rgba_2d: vec![[0.0; 4]; pixel_count],
            point_final_indices: vec![0; pixel_count],
        }
    }

    pub fn validate(
        &self,
        arguments: &Arguments,
    ) -> Result<(), Error> {
        let pixel_count = arguments.pixel_count();

        if self.colors_rgba_2d.len() < pixel_count {
            return Err(Error::Validation(
                format!("colors_rgba_2d.len() ({})", self.colors_rgba_2d.len()),
                format!("at least {pixel_count}"),
            ));
        }
        if self.point_final_indices.len() < pixel_count {
            return Err(Error::Validation(
                format!(
                    "point_final_indices.len() ({})",
                    self.point_final_indices.len()
                ),
                format!("at least {pixel_count}"),
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn write(
        &mut self,
        output: PixelOutput,
    ) {
        self.colors_rgba_2d[output.pixel_index] = output.color_rgba;
        self.point_final_indices[output.pixel_index] = output.final_index;
    }
}

fn expect_len(
    name: &str,
    output: usize,
    target: usize,
) -> Result<(), Error> {
    if output != target {
        return Err(Error::Validation(
            format!("{name} ({output})"),
            target.to_string(),
        ));
    }
    Ok(())
}
