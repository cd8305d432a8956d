//! Seamless elevation field for the planet surface
//!
//! World coordinates run from -2.0 to +2.0 at zoom level 0. Each axis is
//! wrapped around its own circle and the resulting point on a torus in 4D
//! is fed to gradient noise, so the field repeats exactly every 4 world
//! units horizontally and vertically.

use crate::geometry::Vector;
use clap::ValueEnum;
use noise::{NoiseFn, OpenSimplex};
use std::f64::consts::PI;

/// Octaves added on top of the zoom level when refining the torus field
pub const REFINEMENT_OCTAVES: u32 = 16;

/// How world coordinates are projected into noise space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FieldKind {
    /// Both axes wrapped onto independent circles (4D noise), multi-octave
    #[default]
    Torus,
    /// Only the x axis wrapped onto a circle (3D noise), single octave
    Sphere,
}

/// Elevation sampler built once per process and shared between renders
#[derive(Clone)]
pub struct ElevationField {
    noise: OpenSimplex,
    kind: FieldKind,
}

impl ElevationField {
    pub fn new(seed: u32, kind: FieldKind) -> Self {
        ElevationField {
            noise: OpenSimplex::new(seed),
            kind,
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Sample the elevation at a world coordinate
    ///
    /// # Arguments
    /// * `c` - World-space point
    /// * `zoom` - Zoom level of the tile being rendered, controls octave count
    ///
    /// # Panics
    /// If `c` is not finite.
    pub fn sample(&self, c: Vector, zoom: u32) -> f64 {
        assert!(c.is_finite(), "elevation sampled at non-finite point {c}");

        match self.kind {
            FieldKind::Torus => self.sample_torus(c, zoom),
            FieldKind::Sphere => self.sample_sphere(c),
        }
    }

    fn sample_torus(&self, c: Vector, zoom: u32) -> f64 {
        let mut value = self.noise.get(torus_point(c, 1.0));

        let mut scale = 1.0;
        for _ in 0..octave_count(zoom) {
            scale *= 2.0;
            value += self.noise.get(torus_point(c, scale)) / scale;
        }

        value
    }

    fn sample_sphere(&self, c: Vector) -> f64 {
        let angle = c.x / 2.0 * PI;
        self.noise.get([angle.cos(), c.y / 2.0, angle.sin()])
    }
}

/// Number of refinement octaves layered over the base octave at a zoom level
pub fn octave_count(zoom: u32) -> u32 {
    zoom + REFINEMENT_OCTAVES
}

/// Map a world coordinate onto the 4D torus at the given angular frequency
///
/// Returns `(cos x, cos y, sin x, sin y)`, the argument order the noise
/// function is always called with.
pub fn torus_point(c: Vector, scale: f64) -> [f64; 4] {
    let angle_x = c.x / 2.0 * scale * PI;
    let angle_y = c.y / 2.0 * scale * PI;

    [angle_x.cos(), angle_y.cos(), angle_x.sin(), angle_y.sin()]
}
