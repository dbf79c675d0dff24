#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for Skyride adapters.

use std::time::Duration;

use anyhow::Result as AnyResult;
use glam::{Quat, Vec3};
use skyride_core::{PlayMode, SegmentIndex, REFERENCE_FRAME_RATE};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Creates an opaque color from a packed `0xRRGGBB` value.
    #[must_use]
    pub const fn from_hex(packed: u32) -> Self {
        Self::from_rgb_u8(
            ((packed >> 16) & 0xff) as u8,
            ((packed >> 8) & 0xff) as u8,
            (packed & 0xff) as u8,
        )
    }

    /// Creates an opaque color from `[0, 1]` RGB components.
    #[must_use]
    pub fn from_rgb(rgb: Vec3) -> Self {
        Self::new(rgb.x, rgb.y, rgb.z, 1.0)
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        self.lerp(Self::new(1.0, 1.0, 1.0, self.alpha), amount)
    }

    /// Blends toward `other` by `amount`, clamped to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);
        let mix = |from: f32, to: f32| from + (to - from) * amount;
        Self {
            red: mix(self.red, other.red),
            green: mix(self.green, other.green),
            blue: mix(self.blue, other.blue),
            alpha: mix(self.alpha, other.alpha),
        }
    }

    /// Returns the color with its alpha replaced.
    #[must_use]
    pub const fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }
}

/// Input snapshot gathered by adapters before updating the scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct FrameInput {
    /// Whether the viewer toggled pause on this frame.
    pub pause_toggle: bool,
    /// Whether the viewer asked to skip to the finale on this frame.
    pub skip_to_finale: bool,
    /// Whether the viewer requested a camera shake on this frame.
    pub shake: bool,
}

/// Time spent producing a frame before rendering, reported back to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSimulationBreakdown {
    /// Time spent ticking the journey.
    pub simulation: Duration,
    /// Time spent rebuilding the scene description.
    pub scene_population: Duration,
}

/// Viewpoint used to render the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneCamera {
    /// Eye position.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
}

impl SceneCamera {
    /// Creates a camera with the default 60 degree field of view.
    #[must_use]
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            fov_y: 60_f32.to_radians(),
        }
    }
}

/// Flying actor as it should be drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorPresentation {
    /// World position of the body.
    pub position: Vec3,
    /// Orientation with the forward axis along local -Z.
    pub orientation: Quat,
    /// Seconds of animation playback, drives the wing beat.
    pub animation_time: f32,
    /// Whether the procedural stand-in is shown instead of a loaded model.
    pub fallback: bool,
}

/// Primitive used to draw a decorative prop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropShape {
    /// Axis-aligned box.
    Block,
    /// Sphere with diameter equal to the largest size component.
    Ball,
    /// Upright cylinder.
    Column,
    /// Upright cone.
    Cone,
}

/// Decorative object owned by an environment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PropPresentation {
    /// Primitive to draw.
    pub shape: PropShape,
    /// Centre of the prop's base.
    pub position: Vec3,
    /// Width, height, and depth.
    pub size: Vec3,
    /// Surface color before fog.
    pub color: Color,
}

/// Content of one visible segment.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentPresentation {
    /// Segment the content belongs to.
    pub segment: SegmentIndex,
    /// Props to draw.
    pub props: Vec<PropPresentation>,
}

/// Gate spanning a segment boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GatePresentation {
    /// Centre of the ring.
    pub position: Vec3,
    /// Normal of the ring plane.
    pub facing: Vec3,
    /// Visual scale; shrinks once opened.
    pub scale: f32,
    /// Whether the gate has been passed.
    pub open: bool,
}

/// Hoop placed along the path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerPresentation {
    /// Centre of the hoop.
    pub position: Vec3,
    /// Normal of the hoop plane.
    pub facing: Vec3,
}

/// Background and distance fog.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AtmospherePresentation {
    /// Clear color.
    pub background: Color,
    /// Color distant geometry fades toward.
    pub fog: Color,
    /// Exponential-squared fog density.
    pub fog_density: f32,
}

impl AtmospherePresentation {
    /// Fraction of fog applied at `distance` from the eye.
    #[must_use]
    pub fn fog_amount(&self, distance: f32) -> f32 {
        let density = self.fog_density * distance;
        (1.0 - (-density * density).exp()).clamp(0.0, 1.0)
    }

    /// Shades `color` for geometry `distance` units from the eye.
    #[must_use]
    pub fn apply(&self, color: Color, distance: f32) -> Color {
        color.lerp(self.fog.with_alpha(color.alpha), self.fog_amount(distance))
    }
}

/// Tuning for celebratory particle bursts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurstConfig {
    /// Particles spawned per burst.
    pub particles_per_burst: usize,
    /// Seconds each particle lives.
    pub lifetime: f32,
    /// Downward acceleration.
    pub gravity: f32,
    /// Velocity retained per 60 Hz frame.
    pub drag: f32,
    /// Slowest launch speed.
    pub min_speed: f32,
    /// Fastest launch speed.
    pub max_speed: f32,
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            particles_per_burst: 60,
            lifetime: 3.5,
            gravity: 4.0,
            drag: 0.995,
            min_speed: 4.0,
            max_speed: 10.0,
        }
    }
}

/// Single spark of a burst.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// World position.
    pub position: Vec3,
    /// Velocity in units per second.
    pub velocity: Vec3,
    /// Seconds since the particle spawned.
    pub age: f32,
    /// Spark color.
    pub color: Color,
}

/// Integrates every live burst particle.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct BurstField {
    config: BurstConfig,
    particles: Vec<Particle>,
}

impl BurstField {
    const PALETTE: [u32; 5] = [0xffd700, 0xff6b6b, 0x4ecdc4, 0xffffff, 0xff9f43];

    /// Creates an empty field.
    #[must_use]
    pub fn new(config: BurstConfig) -> Self {
        Self {
            config,
            particles: Vec::new(),
        }
    }

    /// Live particles.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Number of live particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Reports whether no particles are alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Seconds a particle lives.
    #[must_use]
    pub const fn lifetime(&self) -> f32 {
        self.config.lifetime
    }

    /// Emits a burst of particles spread evenly over a sphere around `origin`.
    pub fn spawn(&mut self, origin: Vec3) {
        let count = self.config.particles_per_burst;
        let golden_angle = std::f32::consts::PI * (3.0 - 5_f32.sqrt());
        for index in 0..count {
            let height = 1.0 - 2.0 * (index as f32 + 0.5) / count as f32;
            let radius = (1.0 - height * height).max(0.0).sqrt();
            let theta = golden_angle * index as f32;
            let direction = Vec3::new(theta.cos() * radius, height, theta.sin() * radius);
            let blend = (index % 7) as f32 / 6.0;
            let speed =
                self.config.min_speed + (self.config.max_speed - self.config.min_speed) * blend;
            self.particles.push(Particle {
                position: origin,
                velocity: direction * speed,
                age: 0.0,
                color: Color::from_hex(Self::PALETTE[index % Self::PALETTE.len()]),
            });
        }
    }

    /// Advances every particle by `dt` seconds and drops expired ones.
    pub fn update(&mut self, dt: f32) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }
        let drag = self.config.drag.clamp(0.0, 1.0).powf(dt * REFERENCE_FRAME_RATE);
        for particle in &mut self.particles {
            particle.velocity.y -= self.config.gravity * dt;
            particle.velocity *= drag;
            particle.position += particle.velocity * dt;
            particle.age += dt;
        }
        let lifetime = self.config.lifetime;
        self.particles.retain(|particle| particle.age < lifetime);
    }

    /// Removes every particle.
    pub fn clear(&mut self) {
        self.particles.clear();
    }
}

/// Scene description consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Viewpoint.
    pub camera: SceneCamera,
    /// Actor, absent while its model loads.
    pub actor: Option<ActorPresentation>,
    /// Content of the segments attached to the scene.
    pub environments: Vec<EnvironmentPresentation>,
    /// Sampled points along the flight path.
    pub path_trace: Vec<Vec3>,
    /// Gates between segments.
    pub gates: Vec<GatePresentation>,
    /// Hoops along the path.
    pub markers: Vec<MarkerPresentation>,
    /// Sky and fog.
    pub atmosphere: AtmospherePresentation,
    /// Segment title currently displayed.
    pub announcement: Option<String>,
    /// Celebratory particles.
    pub bursts: BurstField,
    /// Normalized journey progress.
    pub progress: f32,
    /// Active play mode.
    pub play_mode: PlayMode,
}

impl Scene {
    /// Creates a scene with a camera and atmosphere and nothing else.
    #[must_use]
    pub fn new(camera: SceneCamera, atmosphere: AtmospherePresentation) -> Self {
        Self {
            camera,
            actor: None,
            environments: Vec::new(),
            path_trace: Vec::new(),
            gates: Vec::new(),
            markers: Vec::new(),
            atmosphere,
            announcement: None,
            bursts: BurstField::new(BurstConfig::default()),
            progress: 0.0,
            play_mode: PlayMode::Idle,
        }
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window.
    pub window_title: String,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(window_title: T, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            window_title: window_title.into(),
            scene,
        }
    }
}

/// Rendering backend capable of presenting Skyride scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until it is requested to exit.
    ///
    /// The provided `update_scene` closure receives the frame delta and the
    /// input captured by the adapter, and mutates the scene before it is
    /// rendered.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameSimulationBreakdown + 'static;
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn atmosphere() -> AtmospherePresentation {
        AtmospherePresentation {
            background: Color::from_hex(0x88bbdd),
            fog: Color::from_hex(0x99ccee),
            fog_density: 0.003,
        }
    }

    #[test]
    fn hex_colors_unpack_channels() {
        let color = Color::from_hex(0xff8000);
        assert_eq!(color, Color::from_rgb_u8(255, 128, 0));
        assert_eq!(color.alpha, 1.0);
    }

    #[test]
    fn lerp_clamps_its_amount() {
        let black = Color::from_hex(0x000000);
        let white = Color::from_hex(0xffffff);
        assert_eq!(black.lerp(white, 2.0), white);
        assert_eq!(black.lerp(white, -1.0), black);
        assert_eq!(black.lighten(0.5).red, 0.5);
    }

    #[test]
    fn fog_thickens_with_distance() {
        let atmosphere = atmosphere();
        assert_eq!(atmosphere.fog_amount(0.0), 0.0);
        let near = atmosphere.fog_amount(50.0);
        let far = atmosphere.fog_amount(500.0);
        assert!(near < far);
        assert!(far > 0.85);

        let shaded = atmosphere.apply(Color::from_hex(0xff0000), 10_000.0);
        assert!((shaded.blue - atmosphere.fog.blue).abs() < 1e-4);
    }

    #[test]
    fn bursts_expire_after_their_lifetime() {
        let mut field = BurstField::new(BurstConfig::default());
        field.spawn(Vec3::new(0.0, 10.0, 0.0));
        assert_eq!(field.len(), 60);

        for _ in 0..200 {
            field.update(DT);
        }
        assert_eq!(field.len(), 60, "particles live for 3.5 seconds");

        for _ in 0..20 {
            field.update(DT);
        }
        assert!(field.is_empty());
    }

    #[test]
    fn gravity_pulls_sparks_down() {
        let mut field = BurstField::new(BurstConfig::default());
        field.spawn(Vec3::ZERO);
        let initial: f32 = field.particles().iter().map(|particle| particle.velocity.y).sum();
        for _ in 0..60 {
            field.update(DT);
        }
        let later: f32 = field.particles().iter().map(|particle| particle.velocity.y).sum();
        assert!(later < initial);
        assert!(field.particles().iter().all(|particle| particle.position.is_finite()));
    }

    #[test]
    fn scene_starts_empty() {
        let camera = SceneCamera::new(Vec3::new(0.0, 10.0, 10.0), Vec3::ZERO);
        let scene = Scene::new(camera, atmosphere());
        assert!(scene.actor.is_none());
        assert!(scene.environments.is_empty());
        assert!(scene.bursts.is_empty());
        assert_eq!(scene.play_mode, PlayMode::Idle);
        assert!((scene.camera.fov_y - std::f32::consts::FRAC_PI_3).abs() < 1e-6);
    }
}
