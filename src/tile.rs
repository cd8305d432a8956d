use crate::geometry::{Extent, Vector};
use thiserror::Error;

/// Deepest zoom level accepted from requests
///
/// The cap is intentional: `2^z` tiles per side must fit in `u32`, and at
/// zoom 30 a tile's edge is still an exact power of two in `f64`.
pub const MAX_ZOOM: u32 = 30;

/// Errors produced while turning a request into a tile coordinate
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TileCoordError {
    #[error("path {0:?} does not match /{{z}}/{{x}}/{{y}}.png")]
    MalformedPath(String),

    #[error("extracting {axis}: {value:?} is not a valid number")]
    InvalidNumber { axis: char, value: String },

    /// Zoom above `MAX_ZOOM`; these tiles are refused rather than widened to `u64`
    #[error("zoom level {0} exceeds the maximum of {MAX_ZOOM}")]
    ZoomTooDeep(u32),

    #[error("invalid tile coordinates {z}/{x}/{y}: column and row must be below {size}")]
    OutOfRange { z: u32, x: u32, y: u32, size: u32 },
}

/// A validated position in the tile pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    z: u32,
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Validate a zoom/column/row triple
    pub fn new(z: u32, x: u32, y: u32) -> Result<Self, TileCoordError> {
        if z > MAX_ZOOM {
            return Err(TileCoordError::ZoomTooDeep(z));
        }
        let size = 1u32 << z;
        if x >= size || y >= size {
            return Err(TileCoordError::OutOfRange { z, x, y, size });
        }
        Ok(TileCoord { z, x, y })
    }

    /// Parse a request path of the form `/{z}/{x}/{y}.png`
    pub fn from_path(path: &str) -> Result<Self, TileCoordError> {
        let malformed = || TileCoordError::MalformedPath(path.to_string());

        let inner = path
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix(".png"))
            .ok_or_else(malformed)?;

        let parts: Vec<&str> = inner.split('/').collect();
        let [z, x, y] = parts.as_slice() else {
            return Err(malformed());
        };
        if [z, x, y]
            .iter()
            .any(|part| part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(malformed());
        }

        TileCoord::new(parse_component('z', z)?, parse_component('x', x)?, parse_component('y', y)?)
    }

    pub fn z(&self) -> u32 {
        self.z
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    /// Number of tiles along each axis at this zoom level
    pub fn grid_size(&self) -> u32 {
        1 << self.z
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

fn parse_component(axis: char, value: &str) -> Result<u32, TileCoordError> {
    value.parse().map_err(|_| TileCoordError::InvalidNumber {
        axis,
        value: value.to_string(),
    })
}

/// Compute the world-space rectangle covered by a tile
///
/// Column and row are normalised to the unit square, recentred on the
/// origin and scaled by 4, so zoom 0 covers `[-2, 2] x [-2, 2]`.
pub fn tile_extent(coord: TileCoord) -> Extent {
    let size = coord.grid_size() as f64;
    let unit = Extent::new(
        Vector::new(coord.x as f64 / size, coord.y as f64 / size),
        Vector::new((coord.x + 1) as f64 / size, (coord.y + 1) as f64 / size),
    );

    unit.sub(Vector::new(0.5, 0.5)).scale(4.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_zero_covers_world() {
        let extent = tile_extent(TileCoord::new(0, 0, 0).unwrap());
        assert_eq!(extent.min, Vector::new(-2.0, -2.0));
        assert_eq!(extent.max, Vector::new(2.0, 2.0));
    }

    #[test]
    fn test_extent_size_halves_per_zoom() {
        for z in 0..=12 {
            let size = 1u32 << z;
            let expected = 4.0 / size as f64;
            for &(x, y) in &[(0, 0), (size - 1, 0), (size / 2, size - 1), (size - 1, size - 1)] {
                let extent = tile_extent(TileCoord::new(z, x, y).unwrap());
                assert!(extent.min.x < extent.max.x, "min.x should be below max.x at {}/{}/{}", z, x, y);
                assert!(extent.min.y < extent.max.y, "min.y should be below max.y at {}/{}/{}", z, x, y);
                assert!((extent.width() - expected).abs() < 1e-12, "width at zoom {} was {}", z, extent.width());
                assert!((extent.height() - expected).abs() < 1e-12, "height at zoom {} was {}", z, extent.height());
            }
        }
    }

    #[test]
    fn test_neighbours_share_edges_exactly() {
        let left = tile_extent(TileCoord::new(7, 40, 99).unwrap());
        let right = tile_extent(TileCoord::new(7, 41, 99).unwrap());
        let below = tile_extent(TileCoord::new(7, 40, 100).unwrap());

        assert_eq!(left.max.x, right.min.x);
        assert_eq!(left.max.y, below.min.y);
    }

    #[test]
    fn test_extents_are_square() {
        for &(z, x, y) in &[(0, 0, 0), (3, 5, 2), (11, 2047, 13), (MAX_ZOOM, 7, (1 << MAX_ZOOM) - 1)] {
            let extent = tile_extent(TileCoord::new(z, x, y).unwrap());
            assert_eq!(extent.width(), extent.height(), "tile {}/{}/{} should be square", z, x, y);
        }
    }

    #[test]
    fn test_from_path_accepts_valid_tiles() {
        assert_eq!(TileCoord::from_path("/0/0/0.png"), TileCoord::new(0, 0, 0));
        let coord = TileCoord::from_path("/5/31/7.png").unwrap();
        assert_eq!((coord.z(), coord.x(), coord.y()), (5, 31, 7));
        assert_eq!(coord.to_string(), "5/31/7");
    }

    #[test]
    fn test_from_path_rejects_out_of_range() {
        assert_eq!(
            TileCoord::from_path("/3/8/8.png"),
            Err(TileCoordError::OutOfRange { z: 3, x: 8, y: 8, size: 8 })
        );
        assert!(TileCoord::from_path("/3/7/8.png").is_err());
        assert!(TileCoord::from_path("/0/1/0.png").is_err());
        assert!(TileCoord::from_path("/3/7/7.png").is_ok());
    }

    #[test]
    fn test_from_path_rejects_malformed() {
        for path in [
            "",
            "/",
            "/1/2.png",
            "/1/2/3/4.png",
            "/1/2/3.jpg",
            "1/2/3.png",
            "/a/0/0.png",
            "/-1/0/0.png",
            "/+1/0/0.png",
            "/1//0.png",
            "/1/0/0.png?x=1",
        ] {
            assert!(
                matches!(TileCoord::from_path(path), Err(TileCoordError::MalformedPath(_))),
                "path {:?} should be malformed",
                path
            );
        }
    }

    #[test]
    fn test_from_path_rejects_huge_numbers() {
        assert_eq!(
            TileCoord::from_path("/99999999999/0/0.png"),
            Err(TileCoordError::InvalidNumber { axis: 'z', value: "99999999999".to_string() })
        );
        assert_eq!(TileCoord::from_path("/31/0/0.png"), Err(TileCoordError::ZoomTooDeep(31)));
    }

    #[test]
    fn test_zoom_cap_keeps_extents_exact() {
        let deepest = TileCoord::new(MAX_ZOOM, (1 << MAX_ZOOM) - 1, 0).unwrap();
        assert_eq!(deepest.grid_size(), 1 << MAX_ZOOM);
        let extent = tile_extent(deepest);
        assert_eq!(extent.width(), 4.0 / (1u64 << MAX_ZOOM) as f64);
        assert_eq!(extent.max.x, 2.0);
        assert_eq!(TileCoord::new(MAX_ZOOM + 1, 0, 0), Err(TileCoordError::ZoomTooDeep(MAX_ZOOM + 1)));
    }
}
