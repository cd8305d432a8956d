use crate::geometry::Vector;
use crate::raster::TileRenderer;
use crate::tile::{TileCoord, tile_extent};
use anyhow::{Context, Result, ensure};
use mesh_tools::GltfBuilder;
use mesh_tools::Triangle;

/// Square grid of terrain heights sampled over one tile
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    size: usize,
    values: Vec<f32>,
}

impl HeightGrid {
    pub fn new(size: usize) -> Self {
        HeightGrid {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn width(&self) -> usize {
        self.size
    }

    pub fn height(&self) -> usize {
        self.size
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f32> {
        if x < self.size && y < self.size {
            Some(self.values[y * self.size + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        if x < self.size && y < self.size {
            self.values[y * self.size + x] = value;
        }
    }
}

/// Sample the elevation of a tile on a `resolution x resolution` grid
///
/// Samples include both edges of the tile, so neighbouring tiles exported
/// at the same zoom share their border vertices. Elevation below sea level
/// is flattened to zero.
///
/// # Arguments
/// * `renderer` - Renderer whose elevation field is sampled
/// * `coord` - Tile to sample
/// * `resolution` - Number of samples along each side (at least 2)
pub fn sample_tile_heights(renderer: &TileRenderer, coord: TileCoord, resolution: usize) -> Result<HeightGrid> {
    ensure!(resolution >= 2, "mesh resolution must be at least 2, got {}", resolution);

    let extent = tile_extent(coord);
    let step = 1.0 / (resolution - 1) as f64;
    let mut grid = HeightGrid::new(resolution);

    for y in 0..resolution {
        for x in 0..resolution {
            let c = extent.min + (extent.max - extent.min) * Vector::new(x as f64 * step, y as f64 * step);
            let value = renderer.field().sample(c, coord.z());
            grid.set(x, y, value.max(0.0) as f32);
        }
    }

    Ok(grid)
}

/// Exports the given height grid as a 3D mesh in GLB format
///
/// The mesh spans one unit horizontally, centred on the origin.
///
/// # Arguments
/// * `grid` - Height values, row-major from the tile's top-left corner
/// * `height_scale` - Height multiplier
/// * `output_path` - Path where the GLB file will be saved
pub fn export_heights_to_glb(grid: &HeightGrid, height_scale: f32, output_path: &str) -> Result<()> {
    ensure!(grid.width() >= 2, "mesh needs at least 2 samples per side, got {}", grid.width());

    let mut builder = GltfBuilder::new();

    let width = grid.width();
    let height = grid.height();
    let spacing = 1.0 / (width as f32 - 1.0);

    let mut positions = Vec::with_capacity(width * height);
    let mut normals = Vec::with_capacity(width * height);
    let mut texcoords = Vec::with_capacity(width * height);
    let mut indices = Vec::with_capacity((width - 1) * (height - 1) * 2);

    for y in 0..height {
        for x in 0..width {
            let z_val = grid.get(x, y).unwrap_or(0.0) * height_scale;

            let x_pos = x as f32 * spacing - 0.5;
            let y_pos = y as f32 * spacing - 0.5;
            positions.push(mesh_tools::compat::point3::new(x_pos, z_val, y_pos));

            let normal = calculate_normal(grid, x, y, spacing, height_scale);
            normals.push(mesh_tools::compat::vector3::new(normal.0, normal.1, normal.2));

            texcoords.push(mesh_tools::compat::vector2::new(
                x as f32 / (width as f32 - 1.0),
                y as f32 / (height as f32 - 1.0),
            ));
        }
    }

    for y in 0..(height - 1) {
        for x in 0..(width - 1) {
            let top_left = (y * width + x) as u32;
            let top_right = (y * width + x + 1) as u32;
            let bottom_left = ((y + 1) * width + x) as u32;
            let bottom_right = ((y + 1) * width + x + 1) as u32;

            indices.push(Triangle::new(top_left, bottom_left, top_right));
            indices.push(Triangle::new(top_right, bottom_left, bottom_right));
        }
    }

    let mesh_index = builder.create_simple_mesh(
        Some("TileTerrain".to_string()),
        &positions,
        &indices,
        Some(normals),
        Some(texcoords),
        None,
    );

    let node = builder.add_node(Some("Tile".to_string()), Some(mesh_index), None, None, None);
    builder.add_scene(Some("Main Scene".to_string()), Some(vec![node]));

    builder
        .export_glb(output_path)
        .with_context(|| format!("writing GLB mesh to {}", output_path))?;

    Ok(())
}

/// Surface normal at a grid point using central differences
///
/// Points on the border reuse their own height for the missing neighbour.
fn calculate_normal(grid: &HeightGrid, x: usize, y: usize, spacing: f32, height_scale: f32) -> (f32, f32, f32) {
    let centre = grid.get(x, y).unwrap_or(0.0);
    let height_at = |x: isize, y: isize| -> f32 {
        if x < 0 || y < 0 {
            return centre * height_scale;
        }
        grid.get(x as usize, y as usize).unwrap_or(centre) * height_scale
    };

    let x_i = x as isize;
    let y_i = y as isize;

    let dx = (height_at(x_i + 1, y_i) - height_at(x_i - 1, y_i)) / (2.0 * spacing);
    let dy = (height_at(x_i, y_i + 1) - height_at(x_i, y_i - 1)) / (2.0 * spacing);

    // Mesh is y-up, so the gradient lies in x/z
    let (nx, ny, nz) = (-dx, 1.0, -dy);
    let length = (nx * nx + ny * ny + nz * nz).sqrt();
    (nx / length, ny / length, nz / length)
}
