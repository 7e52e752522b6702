use crate::vector::{Vec2f, Vec2i};

/// Canvas-local grid. Origin is the canvas top-left corner; grid coordinates
/// are integer units of `unit_px` pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    unit_px: i32,
}

impl Grid {
    pub const DEFAULT_UNIT_PX: i32 = 10;

    pub fn new(unit_px: i32) -> Self {
        Self { unit_px }
    }

    pub fn unit_px(&self) -> i32 {
        self.unit_px
    }

    /// Exact conversion, no rounding. A non-positive unit maps 1:1.
    pub fn to_pixels(&self, grid: Vec2i) -> Vec2f {
        if self.unit_px <= 0 {
            return grid.convert(|v| v as f32);
        }
        (grid * self.unit_px).convert(|v| v as f32)
    }

    /// Succeeds only when both components lie exactly on a grid line.
    pub fn pixels_to_grid(&self, px: Vec2f) -> Option<Vec2i> {
        if self.unit_px <= 0 {
            return None;
        }

        let unit = self.unit_px as f32;
        let exact = |v: f32| {
            let cells = v / unit;
            (cells.fract() == 0.0 && cells.is_finite()).then_some(cells as i32)
        };

        Some(Vec2i::new(exact(px.x())?, exact(px.y())?))
    }

    /// Rounds to the nearest grid point.
    pub fn snap(&self, px: Vec2f) -> Vec2i {
        if self.unit_px <= 0 {
            return px.convert(|v| v.round() as i32);
        }

        let unit = self.unit_px as f32;
        px.convert(|v| (v / unit).round() as i32)
    }

    /// Pixel size of an extent given in grid units.
    pub fn extent_to_pixels(&self, width: i32, height: i32) -> Vec2f {
        self.to_pixels(Vec2i::new(width, height))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(Self::DEFAULT_UNIT_PX)
    }
}
