#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Sky and fog colouring per themed segment.
//!
//! Every segment has a palette. The atmosphere starts on the first palette
//! and blends toward the palette of the current segment a little every frame,
//! so crossing a boundary fades the sky rather than cutting it.

use glam::Vec3;
use serde::Deserialize;
use skyride_core::{smoothing_factor, FrameClock, SegmentIndex};

/// Colours and fog density for one segment.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct Palette {
    /// Background colour as `0xRRGGBB`.
    pub background: u32,
    /// Fog colour as `0xRRGGBB`.
    pub fog: u32,
    /// Exponential fog density.
    pub fog_density: f32,
}

impl Palette {
    /// Creates a palette from packed colours.
    #[must_use]
    pub const fn new(background: u32, fog: u32, fog_density: f32) -> Self {
        Self {
            background,
            fog,
            fog_density,
        }
    }
}

/// Palettes in segment order plus the blend rate.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Palettes indexed by segment; later segments reuse the last entry.
    pub palettes: Vec<Palette>,
    /// Per-frame blend toward the current palette.
    pub blend: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            palettes: vec![
                Palette::new(0x88bbdd, 0x99ccee, 0.003),
                Palette::new(0x2a4a3a, 0x1a3a2a, 0.004),
                Palette::new(0x8b7355, 0x9a8365, 0.003),
                Palette::new(0xaaddff, 0xbbddff, 0.002),
                Palette::new(0x1a0a00, 0x2a1500, 0.005),
                Palette::new(0x110000, 0x1a0505, 0.004),
            ],
            blend: 0.02,
        }
    }
}

/// Colours applied to the scene for a frame, in linear `[0, 1]` RGB.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmosphereState {
    /// Clear colour.
    pub background: Vec3,
    /// Fog colour.
    pub fog: Vec3,
    /// Exponential fog density.
    pub fog_density: f32,
}

impl From<Palette> for AtmosphereState {
    fn from(palette: Palette) -> Self {
        Self {
            background: unpack_rgb(palette.background),
            fog: unpack_rgb(palette.fog),
            fog_density: palette.fog_density,
        }
    }
}

/// Blends the scene atmosphere toward the current segment's palette.
#[derive(Debug)]
pub struct Atmosphere {
    config: Config,
    state: AtmosphereState,
}

impl Atmosphere {
    /// Creates the atmosphere showing the first palette.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let state = config
            .palettes
            .first()
            .copied()
            .map_or(
                AtmosphereState {
                    background: Vec3::ZERO,
                    fog: Vec3::ZERO,
                    fog_density: 0.0,
                },
                AtmosphereState::from,
            );
        Self { config, state }
    }

    /// Atmosphere after the latest update.
    #[must_use]
    pub const fn state(&self) -> AtmosphereState {
        self.state
    }

    /// Palette used for a segment, if any palette is configured.
    #[must_use]
    pub fn palette_for(&self, segment: SegmentIndex) -> Option<Palette> {
        self.config
            .palettes
            .get(segment.as_usize())
            .or_else(|| self.config.palettes.last())
            .copied()
    }

    /// Moves the atmosphere one frame toward the palette of `segment`.
    pub fn update(&mut self, segment: SegmentIndex, clock: FrameClock) -> AtmosphereState {
        let Some(palette) = self.palette_for(segment) else {
            return self.state;
        };
        let target = AtmosphereState::from(palette);
        let factor = smoothing_factor(self.config.blend, clock.delta());
        self.state = AtmosphereState {
            background: self.state.background.lerp(target.background, factor),
            fog: self.state.fog.lerp(target.fog, factor),
            fog_density: self.state.fog_density
                + (target.fog_density - self.state.fog_density) * factor,
        };
        self.state
    }
}

/// Converts `0xRRGGBB` into `[0, 1]` components.
#[must_use]
pub fn unpack_rgb(packed: u32) -> Vec3 {
    let channel = |shift: u32| ((packed >> shift) & 0xff) as f32 / 255.0;
    Vec3::new(channel(16), channel(8), channel(0))
}
