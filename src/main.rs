mod elevation;
mod export;
mod geometry;
mod palette;
mod raster;
mod server;
mod tile;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use elevation::FieldKind;
use export::{export_heights_to_glb, sample_tile_heights};
use log::info;
use palette::Palette;
use raster::TileRenderer;
use std::path::PathBuf;
use tile::TileCoord;

/// Procedural planet surface served as slippy-map tiles
#[derive(Parser, Debug)]
#[command(name = "planet-tiles", version)]
struct Args {
    /// Seed for the noise permutation table
    #[arg(long, global = true, default_value_t = 0)]
    seed: u32,

    /// Projection of world space into noise space
    #[arg(long, global = true, value_enum, default_value_t = FieldKind::Torus)]
    field: FieldKind,

    /// Colour scheme applied to elevation
    #[arg(long, global = true, value_enum, default_value_t = Palette::Biome)]
    palette: Palette,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve tiles over HTTP at /{z}/{x}/{y}.png
    Serve {
        /// Address to listen for tile requests on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen_addr: String,
    },
    /// Render one tile to a PNG file
    Render {
        z: u32,
        x: u32,
        y: u32,
        #[arg(short, long, default_value = "tile.png")]
        output: PathBuf,
    },
    /// Export one tile's elevation as a GLB heightfield mesh
    Mesh {
        z: u32,
        x: u32,
        y: u32,
        #[arg(short, long, default_value = "tile.glb")]
        output: PathBuf,
        /// Samples along each side of the tile
        #[arg(long, default_value_t = 128)]
        resolution: usize,
        /// Height multiplier relative to the tile's width
        #[arg(long, default_value_t = 0.1)]
        height_scale: f32,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let renderer = TileRenderer::new(args.seed, args.field, args.palette);
    info!(
        "Planet seed {} with {:?} field and {:?} palette",
        args.seed,
        renderer.field().kind(),
        args.palette
    );

    match args.command {
        Command::Serve { listen_addr } => server::serve(&listen_addr, renderer),
        Command::Render { z, x, y, output } => {
            let coord = TileCoord::new(z, x, y)?;
            let tile = renderer.render(coord)?;
            let png = tile.encode_png()?;
            std::fs::write(&output, png).with_context(|| format!("writing {}", output.display()))?;
            info!("Rendered {}x{} tile {} to {}", tile.width(), tile.height(), coord, output.display());
            Ok(())
        }
        Command::Mesh { z, x, y, output, resolution, height_scale } => {
            let coord = TileCoord::new(z, x, y)?;
            let grid = sample_tile_heights(&renderer, coord, resolution)?;
            let path = output.to_str().context("output path is not valid UTF-8")?;
            export_heights_to_glb(&grid, height_scale, path)?;
            info!("Exported {}x{} mesh of tile {} to {}", grid.width(), grid.height(), coord, path);
            Ok(())
        }
    }
}
