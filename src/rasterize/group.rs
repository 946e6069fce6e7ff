//! Thread groups running the tiles on the CPU.
//!
//! A group caches one [`Batch`] for the [`BATCH_SIZE`] pixels of a tile.
//! A dispatch keeps `G` groups resident on `rayon`, and the group `g` runs the
//! tiles `g, g + G, g + 2G, ...` in order.
//!
//! Loading a whole batch before compositing any pixel stands for the two
//! group barriers of a GPU workgroup.

pub use super::*;

use rayon::iter::{IntoParallelIterator, ParallelIterator};

pub struct TileGroup<'a> {
    arguments: &'a Arguments,
    /// `G`
    group_count: usize,
    /// `g`
    group_index: usize,
    inputs: &'a Inputs<'a>,
}

/// Running every tile with `group_count` resident groups.
///
/// Returns the outputs of all in-bounds pixels.
pub fn launch(
    arguments: &Arguments,
    inputs: &Inputs,
    group_count: usize,
) -> Vec<PixelOutput> {
    #[cfg(debug_assertions)]
    log::debug!(
        target: "gausplat_rasterizer::rasterize",
        "launch > batch cache ({})",
        humansize::format_size(
            group_count * BATCH_SIZE as usize * size_of::<BatchPoint>(),
            humansize::BINARY.decimal_places(1),
        ),
    );

    (0..group_count)
        .into_par_iter()
        .flat_map_iter(|group_index| {
            TileGroup::new(arguments, inputs, group_index, group_count).run()
        })
        .collect()
}

impl<'a> TileGroup<'a> {
    pub fn new(
        arguments: &'a Arguments,
        inputs: &'a Inputs<'a>,
        group_index: usize,
        group_count: usize,
    ) -> Self {
        Self {
            arguments,
            group_count,
            group_index,
            inputs,
        }
    }

    /// The tiles of this group in the running order.
    pub fn tile_indices(&self) -> impl Iterator<Item = usize> {
        (self.group_index..self.arguments.tile_count())
            .step_by(self.group_count.max(1))
    }

    /// The pixels of the tile in lane order.
    pub fn pixels(
        &self,
        tile_index: usize,
    ) -> Vec<Pixel> {
        let arguments = self.arguments;
        let tile_x = tile_index as u32 % arguments.tile_count_x;
        let tile_y = tile_index as u32 / arguments.tile_count_x;
        let range_end = self.inputs.tile_point_ranges[tile_index][1];

        (0..BATCH_SIZE)
            .map(|lane| {
                Pixel::new(
                    tile_x * TILE_SIZE_X + lane % TILE_SIZE_X,
                    tile_y * TILE_SIZE_Y + lane / TILE_SIZE_X,
                    arguments,
                    range_end,
                )
            })
            .collect()
    }

    /// Running every tile of this group.
    pub fn run(&self) -> Vec<PixelOutput> {
        let background_rgb = self.arguments.background_rgb();
        let mut batch = Batch::with_capacity(BATCH_SIZE as usize);
        let mut outputs = Vec::new();

        for tile_index in self.tile_indices() {
            let [range_start, range_end] =
                self.inputs.tile_point_ranges[tile_index];
            let mut pixels = self.pixels(tile_index);

            let mut batch_start = range_start;
            while batch_start < range_end {
                // Leaving when every pixel of the tile is done
                let done_count =
                    pixels.iter().filter(|pixel| pixel.is_done()).count();
                if done_count == pixels.len() {
                    break;
                }

                let batch_size = (range_end - batch_start).min(BATCH_SIZE);
                batch.load(self.inputs, batch_start, batch_size);

                pixels
                    .iter_mut()
                    .filter(|pixel| !pixel.is_done())
                    .for_each(|pixel| {
                        for (index, point) in batch.iter() {
                            if pixel.composite(point, index)
                                == Contribution::Saturated
                            {
                                break;
                            }
                        }
                    });

                batch_start = batch_start.saturating_add(BATCH_SIZE);
            }

            outputs.extend(
                pixels.iter().filter_map(|pixel| pixel.output(background_rgb)),
            );
        }

        outputs
    }
}
