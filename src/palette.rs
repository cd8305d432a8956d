//! Elevation to colour mapping
//!
//! The biome palette is a set of ordered bands, each an affine function of
//! the elevation. Channels are not clamped before conversion to 8 bits.

use bytemuck::{Pod, Zeroable};
use clap::ValueEnum;
use thiserror::Error;

/// An opaque-by-default RGBA8 colour, laid out to match raw pixel bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b, a: 0xff }
    }

    /// Build a colour from fractional channels
    ///
    /// Each channel is multiplied by 255 and truncated toward zero. Results
    /// outside 0..=255 keep their low 8 bits, the same as an integer
    /// conversion of the truncated value.
    pub fn from_fractions(r: f64, g: f64, b: f64) -> Self {
        Color::rgb(to_channel(r), to_channel(g), to_channel(b))
    }
}

fn to_channel(fraction: f64) -> u8 {
    (fraction * 255.0) as i64 as u8
}

/// Errors from the HSL conversion helpers
#[derive(Debug, Error, PartialEq)]
pub enum PaletteError {
    #[error("hue must be from 0 to 360, got {0}")]
    Hue(f64),

    #[error("saturation must be between 0 and 1, got {0}")]
    Saturation(f64),

    #[error("lightness must be between 0 and 1, got {0}")]
    Lightness(f64),

    #[error("converted channel {0} left the unit range")]
    Channel(f64),
}

/// Colour scheme applied to elevation values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    /// Water, sand, vegetation, rock and snow bands
    #[default]
    Biome,
    /// Elevation spread around the colour wheel
    Hue,
}

impl Palette {
    pub fn colourise(&self, value: f64) -> Result<Color, PaletteError> {
        match self {
            Palette::Biome => Ok(colourise_by_value(value)),
            Palette::Hue => colourise_by_hue(value),
        }
    }
}

// ============================================================================
// Biome bands
// ============================================================================

/// Map an elevation value to a terrain colour
///
/// # Arguments
/// * `value` - Elevation, typically within -1.0..1.4
///
/// # Returns
/// * `Color` - Opaque colour of the band the value falls in
pub fn colourise_by_value(value: f64) -> Color {
    let (r, g, b) = if value < -0.1 {
        // Deep water
        (0.0, 0.0, 0.4)
    } else if value < 0.2 {
        // Shallow water
        (0.1 + value, 0.1 + value, 0.5 + value)
    } else if value < 0.201 {
        // Sand
        let t = 0.202 - value;
        (500.0 * t, 500.0 * t, 250.0 * t)
    } else if value < 0.40 {
        // Grassland
        let t = 0.60 - value;
        (1.2 * t, 1.6 * t, 0.8 * t)
    } else if value < 0.60 {
        // Greenery
        let t = 0.90 - value;
        (0.2 * t, 0.8 * t, 0.1 * t)
    } else if value < 0.90 {
        // Mountains, rising from 0.10
        let diff = 0.90 - 0.10;
        let t = value - 0.10;
        (0.8 / diff * t, 0.7 / diff * t, 0.6 / diff * t)
    } else if value < 1.2 {
        // Pale snow
        (0.8 * value, 0.8 * value, 0.8 * value)
    } else {
        // White snow
        (1.0, 1.0, 1.0)
    };

    Color::from_fractions(r, g, b)
}

// ============================================================================
// Hue wheel
// ============================================================================

/// Spread elevation around the hue wheel at fixed saturation and lightness
pub fn colourise_by_hue(value: f64) -> Result<Color, PaletteError> {
    let hue = (value * 215.0 + 360.0).rem_euclid(360.0);
    hsl_to_rgb(hue, 0.5, 0.5)
}

/// Convert an HSL triple to an opaque colour
///
/// # Arguments
/// * `hue` - Degrees, 0..=360
/// * `saturation` - 0..=1
/// * `lightness` - 0..=1
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Result<Color, PaletteError> {
    if !(0.0..=360.0).contains(&hue) {
        return Err(PaletteError::Hue(hue));
    }
    if !(0.0..=1.0).contains(&saturation) {
        return Err(PaletteError::Saturation(saturation));
    }
    if !(0.0..=1.0).contains(&lightness) {
        return Err(PaletteError::Lightness(lightness));
    }

    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());

    let (r, g, b) = if sector <= 1.0 {
        (chroma, x, 0.0)
    } else if sector <= 2.0 {
        (x, chroma, 0.0)
    } else if sector <= 3.0 {
        (0.0, chroma, x)
    } else if sector <= 4.0 {
        (0.0, x, chroma)
    } else if sector <= 5.0 {
        (x, 0.0, chroma)
    } else {
        (chroma, 0.0, x)
    };

    let m = lightness - 0.5 * chroma;
    let (r, g, b) = (r + m, g + m, b + m);
    for channel in [r, g, b] {
        if !(0.0..=1.0).contains(&channel) {
            return Err(PaletteError::Channel(channel));
        }
    }

    Ok(Color::from_fractions(r, g, b))
}
