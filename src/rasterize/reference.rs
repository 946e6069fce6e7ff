//! Evaluating every pixel directly from the global arrays.
//!
//! It shares the compositing of [`Pixel`] without the staging, so its outputs
//! are bit-identical to the ones of [`group`].

pub use super::*;

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

/// Rasterizing the points to a new image row by row.
pub fn main(
    arguments: &Arguments,
    inputs: &Inputs,
) -> Result<Outputs, Error> {
    inputs.validate(arguments)?;

    #[cfg(debug_assertions)]
    log::debug!(
        target: "gausplat_rasterizer::reference",
        "main > pixel_count ({})",
        arguments.pixel_count(),
    );

    let background_rgb = arguments.background_rgb();
    // I_x
    let image_size_x = arguments.image_size_x as usize;
    let mut outputs = Outputs::new(arguments.pixel_count());

    if outputs.colors_rgba_2d.is_empty() {
        return Ok(outputs);
    }

    outputs
        .colors_rgba_2d
        .par_chunks_mut(image_size_x)
        .zip(outputs.point_final_indices.par_chunks_mut(image_size_x))
        .enumerate()
        .for_each(|(pixel_y, (colors_rgba, final_indices))| {
            let pixel_y = pixel_y as u32;
            let tile_y = pixel_y / TILE_SIZE_Y;

            colors_rgba
                .iter_mut()
                .zip(final_indices)
                .enumerate()
                .for_each(|(pixel_x, (color_rgba, final_index))| {
                    let pixel_x = pixel_x as u32;
                    let tile_x = pixel_x / TILE_SIZE_X;
                    let tile_index =
                        (tile_y * arguments.tile_count_x + tile_x) as usize;
                    let [range_start, range_end] =
                        inputs.tile_point_ranges[tile_index];
                    let mut pixel =
                        Pixel::new(pixel_x, pixel_y, arguments, range_end);

                    for index in range_start..range_end {
                        let point_index = inputs.point_indices[index as usize];
                        let point = BatchPoint::load(inputs, point_index);
                        if pixel.composite(&point, index)
                            == Contribution::Saturated
                        {
                            break;
                        }
                    }

                    if let Some(output) = pixel.output(background_rgb) {
                        *color_rgba = output.color_rgba;
                        *final_index = output.final_index;
                    }
                });
        });

    Ok(outputs)
}
