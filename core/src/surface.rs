use ndarray::Array2;

use crate::*;

/// Read access to the alpha channel of a rendered cover.
pub trait AlphaSource {
    /// `(width, height)` in canvas units.
    fn size(&self) -> (u32, u32);

    /// Alpha at `(x, y)`; coordinates are always in bounds.
    fn alpha_at(&self, x: u32, y: u32) -> u8;
}

/// A cover that can be scratched.
pub trait CoverSurface: AlphaSource {
    /// Clears every pixel within `radius` of `center` (destination-out).
    fn erase_circle(&mut self, center: Point, radius: f64);
}

/// In-memory alpha plane, indexed `[x, y]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AlphaMask {
    alpha: Array2<u8>,
}

impl AlphaMask {
    pub fn opaque(width: u32, height: u32) -> Self {
        Self {
            alpha: Array2::from_elem((width, height).to_nd_index(), u8::MAX),
        }
    }

    /// Clears an axis-aligned rectangle, clamped to the mask.
    pub fn clear_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let (mask_width, mask_height) = self.size();
        for px in x.min(mask_width)..x.saturating_add(width).min(mask_width) {
            for py in y.min(mask_height)..y.saturating_add(height).min(mask_height) {
                self.alpha[(px, py).to_nd_index()] = 0;
            }
        }
    }

    pub fn cleared_pixels(&self) -> usize {
        self.alpha.iter().filter(|&&alpha| alpha == 0).count()
    }
}

impl AlphaSource for AlphaMask {
    fn size(&self) -> (u32, u32) {
        let (width, height) = self.alpha.dim();
        (width as u32, height as u32)
    }

    fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.alpha[(x, y).to_nd_index()]
    }
}

impl CoverSurface for AlphaMask {
    fn erase_circle(&mut self, center: Point, radius: f64) {
        let (width, height) = self.size();
        if width == 0 || height == 0 || radius <= 0.0 {
            return;
        }

        let clamp = |value: f64, max: u32| value.max(0.0).min(f64::from(max)) as u32;
        let x_start = clamp((center.x - radius).floor(), width);
        let x_end = clamp((center.x + radius).ceil(), width);
        let y_start = clamp((center.y - radius).floor(), height);
        let y_end = clamp((center.y + radius).ceil(), height);
        let radius_squared = radius * radius;

        for x in x_start..x_end {
            for y in y_start..y_end {
                let pixel_center = Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if pixel_center.distance_squared(center) <= radius_squared {
                    self.alpha[(x, y).to_nd_index()] = 0;
                }
            }
        }
    }
}

/// Borrowed RGBA pixel buffer, as returned by a canvas `getImageData` call.
#[derive(Copy, Clone, Debug)]
pub struct RgbaView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> RgbaView<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if width == 0 || height == 0 || data.len() < expected {
            return Err(ScratchError::InvalidSurfaceSize(width, height));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }
}

impl AlphaSource for RgbaView<'_> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn alpha_at(&self, x: u32, y: u32) -> u8 {
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        self.data[offset + 3]
    }
}
