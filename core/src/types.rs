use serde::{Deserialize, Serialize};

/// Cells per side of the symbol grid.
pub const GRID_SIDE: u8 = 3;

/// Total cells on a card.
pub const CELL_COUNT: usize = (GRID_SIDE as usize) * (GRID_SIDE as usize);

/// Row-major index of a grid cell, `0` is the top-left corner.
pub type CellIndex = u8;

/// Grid position `(column, row)`.
pub type Cell2 = (u8, u8);

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for (u32, u32) {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0 as usize, self.1 as usize]
    }
}

pub const fn cell_index((col, row): Cell2) -> CellIndex {
    row * GRID_SIDE + col
}

pub const fn cell_coords(index: CellIndex) -> Cell2 {
    (index % GRID_SIDE, index / GRID_SIDE)
}

/// Iterates every cell index in row-major order.
pub fn all_cells() -> impl Iterator<Item = CellIndex> {
    0..CELL_COUNT as CellIndex
}

/// A position on the cover, in canvas backing-store units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Maps client coordinates (CSS pixels) onto the canvas backing store, which
/// may be scaled by the device pixel ratio or by layout.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CanvasScale {
    left: f64,
    top: f64,
    scale_x: f64,
    scale_y: f64,
}

impl CanvasScale {
    pub fn new(
        (left, top): (f64, f64),
        (css_width, css_height): (f64, f64),
        (canvas_width, canvas_height): (u32, u32),
    ) -> Self {
        let ratio = |backing: u32, css: f64| {
            if css > 0.0 {
                f64::from(backing) / css
            } else {
                1.0
            }
        };
        Self {
            left,
            top,
            scale_x: ratio(canvas_width, css_width),
            scale_y: ratio(canvas_height, css_height),
        }
    }

    pub fn to_canvas(&self, client_x: f64, client_y: f64) -> Point {
        Point::new(
            (client_x - self.left) * self.scale_x,
            (client_y - self.top) * self.scale_y,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_index_and_coords_agree() {
        for index in all_cells() {
            assert_eq!(cell_index(cell_coords(index)), index);
        }
        assert_eq!(cell_coords(5), (2, 1));
        assert_eq!(cell_index((0, 2)), 6);
    }

    #[test]
    fn canvas_scale_accounts_for_pixel_ratio_and_offset() {
        let scale = CanvasScale::new((10.0, 20.0), (150.0, 150.0), (300, 300));

        assert_eq!(scale.to_canvas(10.0, 20.0), Point::new(0.0, 0.0));
        assert_eq!(scale.to_canvas(85.0, 95.0), Point::new(150.0, 150.0));
    }

    #[test]
    fn canvas_scale_falls_back_to_identity_for_unlaid_canvas() {
        let scale = CanvasScale::new((0.0, 0.0), (0.0, 0.0), (300, 300));

        assert_eq!(scale.to_canvas(42.0, 7.0), Point::new(42.0, 7.0));
    }
}
