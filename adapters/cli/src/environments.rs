//! Procedurally decorated segment environments.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skyride_core::FrameClock;
use skyride_rendering::{Color, PropPresentation, PropShape};
use skyride_system_streaming::Environment;

/// Look of one themed segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Theme {
    pub(crate) title: &'static str,
    ground: u32,
    accents: [u32; 3],
    shapes: &'static [PropShape],
    prop_count: usize,
    clouds: usize,
}

/// Themes in traversal order; segments past the end reuse the last one.
pub(crate) const THEMES: [Theme; 6] = [
    Theme {
        title: "Harbor Village",
        ground: 0x4a7c59,
        accents: [0xc8553d, 0xf2d0a4, 0x8d6a9f],
        shapes: &[PropShape::Block, PropShape::Cone],
        prop_count: 40,
        clouds: 6,
    },
    Theme {
        title: "Hidden Cove",
        ground: 0x2e6f95,
        accents: [0xe0c879, 0x5a3e2b, 0x3d8361],
        shapes: &[PropShape::Column, PropShape::Ball],
        prop_count: 32,
        clouds: 4,
    },
    Theme {
        title: "Training Arena",
        ground: 0x9c8a6b,
        accents: [0xb33951, 0xe3d7ff, 0x54494b],
        shapes: &[PropShape::Column, PropShape::Block],
        prop_count: 36,
        clouds: 4,
    },
    Theme {
        title: "Cloud Kingdom",
        ground: 0xd8ecf8,
        accents: [0xffffff, 0xf7e7ce, 0xaed9e0],
        shapes: &[PropShape::Ball],
        prop_count: 20,
        clouds: 24,
    },
    Theme {
        title: "Volcanic Nest",
        ground: 0x2b1b17,
        accents: [0xff4500, 0x5c4033, 0xffa500],
        shapes: &[PropShape::Cone, PropShape::Ball],
        prop_count: 30,
        clouds: 0,
    },
    Theme {
        title: "Dragon's Lair",
        ground: 0x1a0f0f,
        accents: [0x7b2d26, 0xd4af37, 0x3b3b3b],
        shapes: &[PropShape::Column, PropShape::Cone],
        prop_count: 34,
        clouds: 0,
    },
];

/// Theme used for a segment.
pub(crate) fn theme_for(segment: usize) -> Theme {
    THEMES[segment.min(THEMES.len() - 1)]
}

/// Segment titles in traversal order for `count` segments.
pub(crate) fn titles(count: usize) -> Vec<String> {
    (0..count).map(|segment| theme_for(segment).title.to_owned()).collect()
}

const CLEAR_HALF_WIDTH: f32 = 80.0;
const SCENERY_HALF_WIDTH: f32 = 150.0;

/// Ground, scenery, and drifting clouds for one segment.
#[derive(Clone, Debug)]
pub(crate) struct ThemedEnvironment {
    theme: Theme,
    seed: u64,
    base_offset: f32,
    length: f32,
    anchors: Vec<PropPresentation>,
    props: Vec<PropPresentation>,
}

impl ThemedEnvironment {
    pub(crate) fn new(theme: Theme, seed: u64, base_offset: f32, length: f32) -> Self {
        Self {
            theme,
            seed,
            base_offset,
            length,
            anchors: Vec::new(),
            props: Vec::new(),
        }
    }

    /// Environments for `count` consecutive segments of `length` units each.
    pub(crate) fn sequence(count: u32, length: f32, seed: u64) -> Vec<Self> {
        (0..count)
            .map(|segment| {
                Self::new(
                    theme_for(segment as usize),
                    seed.wrapping_add(u64::from(segment)),
                    segment as f32 * length,
                    length,
                )
            })
            .collect()
    }

    pub(crate) fn props(&self) -> &[PropPresentation] {
        &self.props
    }

    fn scenery(&self, rng: &mut ChaCha8Rng) -> PropPresentation {
        let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let x = side * rng.gen_range(CLEAR_HALF_WIDTH..SCENERY_HALF_WIDTH);
        let z = -self.base_offset - rng.gen_range(0.0..self.length);
        let shape = self.theme.shapes[rng.gen_range(0..self.theme.shapes.len())];
        let footprint = rng.gen_range(3.0..9.0);
        let height = rng.gen_range(4.0..24.0);
        let accent = self.theme.accents[rng.gen_range(0..self.theme.accents.len())];
        PropPresentation {
            shape,
            position: Vec3::new(x, 0.0, z),
            size: Vec3::new(footprint, height, footprint),
            color: Color::from_hex(accent),
        }
    }

    fn cloud(&self, rng: &mut ChaCha8Rng) -> PropPresentation {
        let x = rng.gen_range(-SCENERY_HALF_WIDTH..SCENERY_HALF_WIDTH);
        let y = rng.gen_range(30.0..55.0);
        let z = -self.base_offset - rng.gen_range(0.0..self.length);
        PropPresentation {
            shape: PropShape::Ball,
            position: Vec3::new(x, y, z),
            size: Vec3::splat(rng.gen_range(6.0..14.0)),
            color: Color::new(1.0, 1.0, 1.0, 0.8),
        }
    }
}

impl Environment for ThemedEnvironment {
    fn populate(&mut self) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut anchors = Vec::with_capacity(1 + self.theme.prop_count + self.theme.clouds);
        anchors.push(PropPresentation {
            shape: PropShape::Block,
            position: Vec3::new(0.0, -1.0, -self.base_offset - self.length * 0.5),
            size: Vec3::new(SCENERY_HALF_WIDTH * 2.0, 1.0, self.length),
            color: Color::from_hex(self.theme.ground),
        });
        for _ in 0..self.theme.prop_count {
            anchors.push(self.scenery(&mut rng));
        }
        for _ in 0..self.theme.clouds {
            anchors.push(self.cloud(&mut rng));
        }
        self.props = anchors.clone();
        self.anchors = anchors;
    }

    fn update(&mut self, clock: FrameClock, _local_progress: f32, is_current: bool) {
        if !is_current {
            return;
        }
        let elapsed = clock.elapsed();
        for (index, (prop, anchor)) in self.props.iter_mut().zip(&self.anchors).enumerate() {
            if anchor.position.y <= 0.0 {
                continue;
            }
            let phase = index as f32 * 0.7;
            prop.position.x = anchor.position.x + (elapsed * 0.2 + phase).sin() * 3.0;
            prop.position.y = anchor.position.y + (elapsed * 0.5 + phase).sin() * 1.5;
        }
    }

    fn dispose(&mut self) {
        self.anchors.clear();
        self.props.clear();
    }

    fn content_len(&self) -> usize {
        self.props.len()
    }
}
