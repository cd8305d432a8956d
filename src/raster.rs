//! Tile rasterization: elevation sampled per pixel, coloured, packed into RGBA8

use crate::elevation::{ElevationField, FieldKind};
use crate::palette::{Color, Palette, PaletteError};
use crate::tile::{TileCoord, tile_extent};
use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use rayon::prelude::*;
use std::io::Cursor;

/// Width and height of every rendered tile in pixels
pub const TILE_SIZE: u32 = 256;

/// Row-major grid of colours with the origin at the top left
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    size: u32,
    pixels: Vec<Color>,
}

impl PixelBuffer {
    /// Create a square buffer filled with transparent black
    pub fn new(size: u32) -> Self {
        PixelBuffer {
            size,
            pixels: vec![Color::default(); (size * size) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.size
    }

    pub fn height(&self) -> u32 {
        self.size
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Color> {
        if x < self.size && y < self.size {
            Some(self.pixels[(y * self.size + x) as usize])
        } else {
            None
        }
    }

    /// Pixels viewed as tightly packed RGBA bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Encode the buffer as a PNG image
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let image = RgbaImage::from_raw(self.size, self.size, self.as_bytes().to_vec())
            .context("pixel buffer does not match its dimensions")?;

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .context("encoding tile as PNG")?;
        Ok(png.into_inner())
    }
}

/// Renders tiles from an immutable elevation field and palette
///
/// Built once at startup and shared by reference between requests.
#[derive(Clone)]
pub struct TileRenderer {
    field: ElevationField,
    palette: Palette,
}

impl TileRenderer {
    pub fn new(seed: u32, kind: FieldKind, palette: Palette) -> Self {
        TileRenderer {
            field: ElevationField::new(seed, kind),
            palette,
        }
    }

    pub fn field(&self) -> &ElevationField {
        &self.field
    }

    /// Render the full tile at `coord`
    ///
    /// Rows are evaluated in parallel; every pixel depends only on its own
    /// world coordinate, so the output is identical to a sequential pass.
    pub fn render(&self, coord: TileCoord) -> Result<PixelBuffer, PaletteError> {
        let extent = tile_extent(coord);
        let mut buffer = PixelBuffer::new(TILE_SIZE);

        buffer
            .pixels
            .par_chunks_mut(TILE_SIZE as usize)
            .enumerate()
            .try_for_each(|(py, row)| -> Result<(), PaletteError> {
                for (px, pixel) in row.iter_mut().enumerate() {
                    let c = extent.pixel_to_world(px as u32, py as u32, TILE_SIZE);
                    let value = self.field.sample(c, coord.z());
                    *pixel = self.palette.colourise(value)?;
                }
                Ok(())
            })?;

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::colourise_by_value;

    fn renderer() -> TileRenderer {
        TileRenderer::new(0, FieldKind::Torus, Palette::Biome)
    }

    #[test]
    fn test_pixel_buffer_bounds() {
        let buffer = PixelBuffer::new(4);
        assert_eq!(buffer.get(3, 3), Some(Color::default()));
        assert_eq!(buffer.get(4, 0), None);
        assert_eq!(buffer.get(0, 4), None);
        assert_eq!(buffer.as_bytes().len(), 64);
    }

    #[test]
    fn test_pixels_are_row_major() {
        let tile = renderer().render(TileCoord::new(1, 0, 0).unwrap()).unwrap();
        let bytes = tile.as_bytes();
        let (px, py) = (7u32, 3u32);
        let offset = ((py * TILE_SIZE + px) * 4) as usize;
        let colour = tile.get(px, py).unwrap();
        assert_eq!(&bytes[offset..offset + 4], &[colour.r, colour.g, colour.b, colour.a]);
    }

    #[test]
    fn test_render_fills_whole_tile() {
        let tile = renderer().render(TileCoord::new(2, 1, 3).unwrap()).unwrap();
        assert_eq!(tile.width(), TILE_SIZE);
        assert_eq!(tile.height(), TILE_SIZE);
        assert_eq!(tile.as_bytes().len(), (TILE_SIZE * TILE_SIZE * 4) as usize);
        assert!(tile.pixels.iter().all(|pixel| pixel.a == 255), "every pixel should be opaque");
    }

    #[test]
    fn test_render_is_deterministic() {
        let coord = TileCoord::new(3, 5, 2).unwrap();
        let first = renderer().render(coord).unwrap();
        let second = renderer().render(coord).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_world_tile_corners_match_field() {
        let renderer = renderer();
        let coord = TileCoord::new(0, 0, 0).unwrap();
        let tile = renderer.render(coord).unwrap();
        let extent = tile_extent(coord);

        let last = TILE_SIZE - 1;
        for &(px, py) in &[(0, 0), (last, 0), (0, last), (last, last)] {
            let c = extent.pixel_to_world(px, py, TILE_SIZE);
            let expected = colourise_by_value(renderer.field().sample(c, 0));
            assert_eq!(tile.get(px, py), Some(expected), "corner ({}, {})", px, py);
        }
    }

    #[test]
    fn test_world_tile_golden_corners() {
        let tile = renderer().render(TileCoord::new(0, 0, 0).unwrap()).unwrap();
        let last = TILE_SIZE - 1;
        assert_eq!(tile.get(0, 0), Some(Color::rgb(88, 118, 59)));
        assert_eq!(tile.get(last, 0), Some(Color::rgb(82, 110, 55)));
        assert_eq!(tile.get(0, last), Some(Color::rgb(91, 122, 61)));
        assert_eq!(tile.get(last, last), Some(Color::rgb(84, 112, 56)));
    }

    #[test]
    fn test_rows_use_vertical_position() {
        let coord = TileCoord::new(4, 3, 9).unwrap();
        let extent = tile_extent(coord);
        for py in [0, 17, 255] {
            let c = extent.pixel_to_world(0, py, TILE_SIZE);
            let by_height = extent.min.y + extent.height() * py as f64 / TILE_SIZE as f64;
            assert_eq!(c.y, by_height);
        }
    }

    #[test]
    fn test_seed_changes_terrain() {
        let coord = TileCoord::new(1, 0, 1).unwrap();
        let first = TileRenderer::new(1, FieldKind::Torus, Palette::Biome).render(coord).unwrap();
        let second = TileRenderer::new(2, FieldKind::Torus, Palette::Biome).render(coord).unwrap();
        assert_ne!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_sphere_and_hue_variants_render() {
        let coord = TileCoord::new(1, 1, 0).unwrap();
        let tile = TileRenderer::new(0, FieldKind::Sphere, Palette::Hue).render(coord).unwrap();
        assert_eq!(tile.as_bytes().len(), (TILE_SIZE * TILE_SIZE * 4) as usize);
    }

    #[test]
    fn test_encode_png_signature() {
        let png = renderer().render(TileCoord::new(0, 0, 0).unwrap()).unwrap().encode_png().unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (TILE_SIZE, TILE_SIZE));
    }
}
