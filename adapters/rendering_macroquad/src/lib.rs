#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Macroquad-backed rendering adapter for Skyride.
//!
//! Macroquad's optional audio stack depends on native ALSA development
//! libraries, which are unavailable in the containerised CI environment.
//! To keep `cargo test` usable everywhere we depend on macroquad without its
//! default `audio` feature.
//!
//! The world is drawn with macroquad's 3D primitives. Fog is applied on the
//! CPU by blending each primitive's colour toward the fog colour according to
//! its distance from the eye.

mod timing;

use std::{
    f32::consts::TAU,
    time::{Duration, Instant},
};

use anyhow::Result;
use glam::{Quat, Vec3};
use macroquad::{
    camera::{set_camera, set_default_camera, Camera3D},
    input::{is_key_pressed, KeyCode},
    math::Vec3 as MacroquadVec3,
    models::{draw_cube, draw_cylinder, draw_line_3d, draw_sphere},
    shapes::{draw_rectangle, draw_rectangle_lines},
    text::{draw_text, measure_text},
};
use skyride_core::PlayMode;
use skyride_rendering::{
    ActorPresentation, AtmospherePresentation, Color, FrameInput, FrameSimulationBreakdown,
    GatePresentation, Presentation, PropPresentation, PropShape, RenderingBackend, Scene,
};

use crate::timing::{FrameSample, FrameTimings};

/// Keyboard shortcuts pressed this frame, or `None` when the viewer quits.
fn poll_input() -> Option<FrameInput> {
    if is_key_pressed(KeyCode::Escape) || is_key_pressed(KeyCode::Q) {
        return None;
    }
    Some(FrameInput {
        pause_toggle: is_key_pressed(KeyCode::Space),
        skip_to_finale: is_key_pressed(KeyCode::F),
        shake: is_key_pressed(KeyCode::K),
    })
}

/// Rendering backend implemented on top of macroquad.
#[derive(Debug, Default)]
pub struct MacroquadBackend {
    swap_interval: Option<i32>,
    show_fps: bool,
}

impl MacroquadBackend {
    /// Returns a backend that requests the platform's default swap interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the backend to request a specific swap interval from the platform.
    #[must_use]
    pub fn with_swap_interval(mut self, swap_interval: Option<i32>) -> Self {
        self.swap_interval = swap_interval;
        self
    }

    /// Configures the backend to either synchronise presentation with the display refresh rate
    /// or render as fast as possible.
    #[must_use]
    pub fn with_vsync(self, enabled: bool) -> Self {
        let swap_interval = if enabled { Some(1) } else { Some(0) };
        self.with_swap_interval(swap_interval)
    }

    /// Configures whether the backend prints frame timing metrics once per second.
    #[must_use]
    pub fn with_show_fps(mut self, show: bool) -> Self {
        self.show_fps = show;
        self
    }
}

impl RenderingBackend for MacroquadBackend {
    fn run<F>(self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, FrameInput, &mut Scene) -> FrameSimulationBreakdown + 'static,
    {
        let Self {
            swap_interval,
            show_fps,
        } = self;

        let Presentation {
            window_title,
            scene,
        } = presentation;

        let mut config = macroquad::window::Conf {
            window_title,
            window_width: 1280,
            window_height: 720,
            ..macroquad::window::Conf::default()
        };
        if let Some(swap_interval) = swap_interval {
            config.platform.swap_interval = Some(swap_interval);
        }

        macroquad::Window::from_config(config, async move {
            let mut scene = scene;
            let mut timings = FrameTimings::default();

            while let Some(input) = poll_input() {
                let dt = macroquad::time::get_frame_time().max(0.0);
                let frame = Duration::from_secs_f32(dt);
                let simulated = update_scene(frame, input, &mut scene);

                let render_start = Instant::now();
                macroquad::window::clear_background(to_macroquad_color(
                    scene.atmosphere.background,
                ));
                draw_world(&scene);
                set_default_camera();
                draw_overlay(&scene);

                let summary = timings.record(FrameSample {
                    frame,
                    simulation: simulated.simulation,
                    scene: simulated.scene_population,
                    render: render_start.elapsed(),
                });
                if let Some(summary) = summary.filter(|_| show_fps) {
                    println!("{summary}");
                }

                macroquad::window::next_frame().await;
            }
        });

        Ok(())
    }
}

const GATE_RADIUS: f32 = 6.0;
const MARKER_RADIUS: f32 = 3.0;
const RING_SEGMENTS: usize = 24;
const PARTICLE_RADIUS: f32 = 0.25;

fn draw_world(scene: &Scene) {
    let eye = scene.camera.position;
    set_camera(&Camera3D {
        position: to_macroquad_vec3(eye),
        target: to_macroquad_vec3(scene.camera.target),
        up: MacroquadVec3::new(0.0, 1.0, 0.0),
        fovy: scene.camera.fov_y,
        ..Camera3D::default()
    });

    let atmosphere = &scene.atmosphere;
    let trace_color = Color::new(1.0, 1.0, 1.0, 0.35);
    for pair in scene.path_trace.windows(2) {
        let color = fogged(atmosphere, trace_color, eye, pair[0]);
        draw_line_3d(
            to_macroquad_vec3(pair[0]),
            to_macroquad_vec3(pair[1]),
            to_macroquad_color(color),
        );
    }

    for environment in &scene.environments {
        for prop in &environment.props {
            draw_prop(prop, atmosphere, eye);
        }
    }

    for marker in &scene.markers {
        let color = fogged(atmosphere, Color::from_hex(0xffd700), eye, marker.position);
        let ring = ring_points(marker.position, marker.facing, MARKER_RADIUS, RING_SEGMENTS);
        draw_ring(&ring, color);
    }

    for gate in &scene.gates {
        draw_gate(gate, atmosphere, eye);
    }

    if let Some(actor) = scene.actor {
        draw_actor(&actor, atmosphere, eye);
    }

    let lifetime = scene.bursts.lifetime();
    for particle in scene.bursts.particles() {
        let fade = if lifetime > 0.0 {
            1.0 - (particle.age / lifetime).clamp(0.0, 1.0)
        } else {
            0.0
        };
        draw_sphere(
            to_macroquad_vec3(particle.position),
            PARTICLE_RADIUS,
            None,
            to_macroquad_color(particle.color.with_alpha(fade)),
        );
    }
}

fn draw_prop(prop: &PropPresentation, atmosphere: &AtmospherePresentation, eye: Vec3) {
    let centre = prop.position + Vec3::new(0.0, prop.size.y * 0.5, 0.0);
    let color = to_macroquad_color(fogged(atmosphere, prop.color, eye, centre));
    let radius = prop.size.x.max(prop.size.z) * 0.5;
    match prop.shape {
        PropShape::Block => draw_cube(
            to_macroquad_vec3(centre),
            to_macroquad_vec3(prop.size),
            None,
            color,
        ),
        PropShape::Ball => draw_sphere(
            to_macroquad_vec3(centre),
            prop.size.max_element() * 0.5,
            None,
            color,
        ),
        PropShape::Column => draw_cylinder(
            to_macroquad_vec3(prop.position),
            radius,
            radius,
            prop.size.y,
            None,
            color,
        ),
        PropShape::Cone => draw_cylinder(
            to_macroquad_vec3(prop.position),
            0.0,
            radius,
            prop.size.y,
            None,
            color,
        ),
    }
}

fn draw_gate(gate: &GatePresentation, atmosphere: &AtmospherePresentation, eye: Vec3) {
    let base = if gate.open {
        Color::from_hex(0xffd700)
    } else {
        Color::from_hex(0xe8f4ff)
    };
    let color = fogged(atmosphere, base, eye, gate.position);
    let radius = GATE_RADIUS * gate.scale.max(0.0);
    draw_ring(&ring_points(gate.position, gate.facing, radius, RING_SEGMENTS), color);
    draw_ring(
        &ring_points(gate.position, gate.facing, radius * 0.92, RING_SEGMENTS),
        color.lighten(0.3),
    );
}

fn draw_ring(points: &[Vec3], color: Color) {
    let color = to_macroquad_color(color);
    for pair in points.windows(2) {
        draw_line_3d(to_macroquad_vec3(pair[0]), to_macroquad_vec3(pair[1]), color);
    }
}

/// Closed loop of `segments + 1` points around `centre` in the plane normal to `facing`.
fn ring_points(centre: Vec3, facing: Vec3, radius: f32, segments: usize) -> Vec<Vec3> {
    let normal = facing.try_normalize().unwrap_or(Vec3::Z);
    let helper = if normal.y.abs() < 0.99 { Vec3::Y } else { Vec3::X };
    let u = normal.cross(helper).normalize();
    let v = normal.cross(u);
    let segments = segments.max(3);
    (0..=segments)
        .map(|index| {
            let angle = TAU * index as f32 / segments as f32;
            centre + (u * angle.cos() + v * angle.sin()) * radius
        })
        .collect()
}

/// Body-relative spheres making up the stand-in actor, as `(offset, radius)`.
fn actor_parts(orientation: Quat, animation_time: f32) -> [(Vec3, f32); 6] {
    let flap = (animation_time * 6.0).sin() * 0.8;
    [
        (Vec3::ZERO, 1.0),
        (orientation * Vec3::new(0.0, 0.4, -1.6), 0.6),
        (orientation * Vec3::new(0.0, 0.2, 1.8), 0.35),
        (orientation * Vec3::new(0.0, 0.1, 2.6), 0.2),
        (orientation * Vec3::new(-2.4, flap, 0.2), 0.3),
        (orientation * Vec3::new(2.4, flap, 0.2), 0.3),
    ]
}

fn draw_actor(actor: &ActorPresentation, atmosphere: &AtmospherePresentation, eye: Vec3) {
    let base = if actor.fallback {
        Color::from_hex(0x6b8e5a)
    } else {
        Color::from_hex(0x8b2f2f)
    };
    let color = fogged(atmosphere, base, eye, actor.position);
    let wing = to_macroquad_color(color.lighten(0.25));
    let parts = actor_parts(actor.orientation, actor.animation_time);
    for (offset, radius) in parts {
        draw_sphere(
            to_macroquad_vec3(actor.position + offset),
            radius,
            None,
            to_macroquad_color(color),
        );
    }
    for (offset, _) in &parts[4..] {
        draw_line_3d(
            to_macroquad_vec3(actor.position),
            to_macroquad_vec3(actor.position + *offset),
            wing,
        );
    }
}

fn draw_overlay(scene: &Scene) {
    let width = macroquad::window::screen_width();
    let height = macroquad::window::screen_height();
    let white = macroquad::color::Color::new(1.0, 1.0, 1.0, 0.9);

    if let Some(title) = &scene.announcement {
        let font_size = 48.0;
        let measured = measure_text(title, None, font_size as u16, 1.0);
        let _ = draw_text(
            title,
            (width - measured.width) * 0.5,
            height * 0.2,
            font_size,
            white,
        );
    }

    let bar_width = width * 0.4;
    let bar_x = (width - bar_width) * 0.5;
    let bar_y = height - 32.0;
    draw_rectangle(
        bar_x,
        bar_y,
        progress_fill(scene.progress, bar_width),
        8.0,
        macroquad::color::Color::new(1.0, 0.84, 0.0, 0.9),
    );
    draw_rectangle_lines(bar_x, bar_y, bar_width, 8.0, 1.0, white);

    if let Some(status) = status_label(scene.play_mode) {
        let _ = draw_text(status, 16.0, 32.0, 28.0, white);
    }
    let _ = draw_text(
        "space: pause   f: skip   k: shake   q: quit",
        16.0,
        height - 12.0,
        18.0,
        macroquad::color::Color::new(1.0, 1.0, 1.0, 0.5),
    );
}

fn progress_fill(progress: f32, bar_width: f32) -> f32 {
    if progress.is_finite() {
        progress.clamp(0.0, 1.0) * bar_width
    } else {
        0.0
    }
}

const fn status_label(mode: PlayMode) -> Option<&'static str> {
    match mode {
        PlayMode::Idle => Some("READY"),
        PlayMode::Paused => Some("PAUSED"),
        PlayMode::Interlude => Some("INTERLUDE"),
        PlayMode::Finale | PlayMode::Handoff => Some("FINALE"),
        PlayMode::Flying => None,
    }
}

fn fogged(atmosphere: &AtmospherePresentation, color: Color, eye: Vec3, point: Vec3) -> Color {
    atmosphere.apply(color, eye.distance(point))
}

fn to_macroquad_vec3(vector: Vec3) -> MacroquadVec3 {
    MacroquadVec3::new(vector.x, vector.y, vector.z)
}

fn to_macroquad_color(color: Color) -> macroquad::color::Color {
    macroquad::color::Color::new(color.red, color.green, color.blue, color.alpha)
}
