//! Compositing the points of a tile onto one pixel.

pub use super::*;

/// The maximum opacity of a point at a pixel.
pub const ALPHA_MAX: f32 = 0.999;
/// The opacity below which a point is skipped.
pub const ALPHA_MIN: f32 = 1.0 / 255.0;
/// The transmittance at or below which a pixel is saturated.
pub const TRANSMITTANCE_MIN: f32 = 1e-4;

/// Both `Saturated` and `OutOfBounds` are absorbing.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelState {
    Active,
    OutOfBounds,
    Saturated,
}

/// The effect of one point on a pixel.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Contribution {
    Blended,
    Saturated,
    Skipped,
}

/// The accumulator of one pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pixel {
    /// `(x + 0.5, y + 0.5)`
    pub center: [f32; 2],
    /// Premultiplied color.
    pub color_rgb: [f32; 3],
    /// The index into the sorted point list of the last blended point.
    ///
    /// It starts at the end of the tile's range.
    pub final_index: u32,
    /// `y * I_x + x`
    pub pixel_index: usize,
    pub state: PixelState,
    /// `T`
    pub transmittance: f32,
}

/// The single write of an in-bounds pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PixelOutput {
    pub color_rgba: [f32; 4],
    pub final_index: u32,
    pub pixel_index: usize,
}

impl Pixel {
    pub fn new(
        pixel_x: u32,
        pixel_y: u32,
        arguments: &Arguments,
        range_end: u32,
    ) -> Self {
        let is_inside = pixel_x < arguments.image_size_x
            && pixel_y < arguments.image_size_y;

        Self {
            center: [pixel_x as f32 + 0.5, pixel_y as f32 + 0.5],
            color_rgb: [0.0; 3],
            final_index: range_end,
            pixel_index: pixel_y as usize * arguments.image_size_x as usize
                + pixel_x as usize,
            state: if is_inside {
                PixelState::Active
            } else {
                PixelState::OutOfBounds
            },
            transmittance: 1.0,
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.state != PixelState::Active
    }

    /// Blending the point at `index` of the sorted list behind the pixel.
    pub fn composite(
        &mut self,
        point: &BatchPoint,
        index: u32,
    ) -> Contribution {
        debug_assert!(!self.is_done(), "A done pixel should not composite");

        let [conic_a, conic_b, conic_c] = point.conic;
        let delta_x = point.position_2d[0] - self.center[0];
        let delta_y = point.position_2d[1] - self.center[1];
        let sigma = 0.5
            * (conic_a * delta_x * delta_x + conic_c * delta_y * delta_y)
            + conic_b * delta_x * delta_y;
        let alpha = (point.opacity * (-sigma).exp()).min(ALPHA_MAX);

        if sigma < 0.0 || alpha < ALPHA_MIN {
            return Contribution::Skipped;
        }

        let transmittance_next = self.transmittance * (1.0 - alpha);
        if transmittance_next <= TRANSMITTANCE_MIN {
            self.state = PixelState::Saturated;
            return Contribution::Saturated;
        }

        let visibility = alpha * self.transmittance;
        self.color_rgb
            .iter_mut()
            .zip(point.color_rgb)
            .for_each(|(color, point_color)| *color += point_color * visibility);
        self.transmittance = transmittance_next;
        self.final_index = index;

        Contribution::Blended
    }

    /// Returns `None` if the pixel is out of the image.
    pub fn output(
        &self,
        background_rgb: [f32; 3],
    ) -> Option<PixelOutput> {
        if self.state == PixelState::OutOfBounds {
            return None;
        }

        let t = self.transmittance;
        let [r, g, b] = self.color_rgb;
        let [background_r, background_g, background_b] = background_rgb;

        Some(PixelOutput {
            color_rgba: [
                r + t * background_r,
                g + t * background_g,
                b + t * background_b,
                1.0 - t,
            ],
            final_index: self.final_index,
            pixel_index: self.pixel_index,
        })
    }
}
