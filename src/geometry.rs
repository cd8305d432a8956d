use glam::DVec2;

/// A point or displacement in continuous world space
pub type Vector = DVec2;

/// Axis-aligned rectangle of world space covered by a tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min: Vector,
    pub max: Vector,
}

impl Extent {
    pub fn new(min: Vector, max: Vector) -> Self {
        Extent { min, max }
    }

    /// Translate both corners by `-offset`
    pub fn sub(&self, offset: Vector) -> Self {
        Extent::new(self.min - offset, self.max - offset)
    }

    /// Scale both corners uniformly about the origin
    pub fn scale(&self, factor: f64) -> Self {
        Extent::new(self.min * factor, self.max * factor)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// World coordinate of a raster position inside a `tile_size` square grid
    ///
    /// Both axes are stepped by the horizontal span. Tile extents are always
    /// square, so this matches stepping y by `height()`.
    ///
    /// # Arguments
    /// * `px` - Column of the pixel (0..tile_size)
    /// * `py` - Row of the pixel (0..tile_size)
    /// * `tile_size` - Number of pixels along each side of the raster
    pub fn pixel_to_world(&self, px: u32, py: u32, tile_size: u32) -> Vector {
        let span = self.width();
        Vector::new(
            self.min.x + span * px as f64 / tile_size as f64,
            self.min.y + span * py as f64 / tile_size as f64,
        )
    }
}
