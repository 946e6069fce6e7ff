//! Staging the points of a tile in batches.

pub use super::*;

/// The fields of a point that a pixel reads while compositing.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchPoint {
    pub color_rgb: [f32; 3],
    /// `(a, b, c)` of `a * dx^2 + 2 * b * dx * dy + c * dy^2`
    pub conic: [f32; 3],
    pub opacity: f32,
    pub position_2d: [f32; 2],
}

/// The points of one batch, cached by a thread group.
///
/// Slot `lane` holds the point that lane `lane` loads on the GPU.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Batch {
    pub points: Vec<BatchPoint>,
    /// The index into the sorted point list of the first slot.
    pub start: u32,
}

impl BatchPoint {
    /// Loading the point from the global arrays.
    pub fn load(
        inputs: &Inputs,
        point_index: u32,
    ) -> Self {
        let index = point_index as usize;
        let [color_r, color_g, color_b, _] = inputs.colors_rgb_3d[index];
        let [conic_a, conic_b, _, conic_c] = inputs.conics[index];

        Self {
            color_rgb: [color_r, color_g, color_b],
            conic: [conic_a, conic_b, conic_c],
            opacity: inputs.opacities_3d[index],
            position_2d: inputs.positions_2d[index],
        }
    }
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            start: 0,
        }
    }

    /// Loading the sorted points `start..start + size` into the slots.
    pub fn load(
        &mut self,
        inputs: &Inputs,
        start: u32,
        size: u32,
    ) {
        self.start = start;
        self.points.clear();
        self.points.extend((0..size).map(|lane| {
            let point_index = inputs.point_indices[(start + lane) as usize];
            BatchPoint::load(inputs, point_index)
        }));
    }

    /// The points with their indices into the sorted point list.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &BatchPoint)> {
        (self.start..).zip(&self.points)
    }
}
