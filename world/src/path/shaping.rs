//! Per-theme waypoint shaping.
//!
//! Each themed segment bends the path with its own oscillation pattern, a
//! pure function of the segment index and the local fraction `t` in `[0, 1]`.
//! Adding a theme means adding one arm to [`segment_offset`].

use std::f32::consts::PI;

use glam::Vec3;

use super::PathConfig;

/// Generates the full waypoint list: every segment followed by the tail.
pub(super) fn waypoints(config: &PathConfig) -> Vec<Vec3> {
    let subdivisions = config.subdivisions.max(1);
    let tail_samples = config.epilogue_samples;
    let capacity = (config.segment_count as usize) * (subdivisions as usize + 1)
        + tail_samples as usize;
    let mut points = Vec::with_capacity(capacity);

    for segment in 0..config.segment_count {
        let base_z = -(segment as f32) * config.segment_length;
        let base_x = drift(segment, config.lateral_drift);
        for step in 0..=subdivisions {
            let t = step as f32 / subdivisions as f32;
            let (lateral, vertical) = segment_offset(segment, t);
            points.push(Vec3::new(
                base_x + lateral,
                config.base_altitude + vertical,
                base_z - t * config.segment_length,
            ));
        }
    }

    points.extend(epilogue(config));
    points
}

/// Slow lateral wander that shifts each segment's centre line.
fn drift(segment: u32, amplitude: f32) -> f32 {
    (segment as f32 * 0.5).sin() * amplitude
}

/// Lateral and vertical offset of a segment at local fraction `t`.
fn segment_offset(segment: u32, t: f32) -> (f32, f32) {
    match segment {
        // gentle weave
        0 => ((t * PI).sin() * 15.0, (t * PI).sin() * 5.0),
        // S-curve swoop
        1 => ((t * PI * 2.0).sin() * 20.0, 3.0 + (t * PI).sin() * 5.0),
        // tight maneuvering
        2 => (
            (t * PI * 1.5).sin() * 25.0,
            5.0 + (t * PI * 2.0).sin() * 8.0,
        ),
        // high soaring
        3 => (
            (t * PI * 2.0).sin() * 30.0,
            15.0 + (t * PI).sin() * 12.0,
        ),
        // dive, then climb back out
        4 => {
            let vertical = if t < 0.4 {
                12.0 - t * 25.0
            } else {
                2.0 + (t - 0.4) * 20.0
            };
            ((t * PI).sin() * 15.0, vertical)
        }
        // wide final approach
        5 => (
            (t * PI * 2.5).sin() * 35.0,
            5.0 + (t * PI * 0.8).sin() * 15.0,
        ),
        _ => segment_offset(0, t),
    }
}

/// Eased tail that straightens out and climbs after the last segment.
fn epilogue(config: &PathConfig) -> impl Iterator<Item = Vec3> + '_ {
    let samples = config.epilogue_samples;
    let start_z = -config.main_length();
    let last_x = drift(config.segment_count.saturating_sub(1), config.lateral_drift);

    (1..=samples).map(move |step| {
        let t = step as f32 / samples as f32;
        let ease = 1.0 - (1.0 - t).powi(3);
        Vec3::new(
            last_x * (1.0 - ease * 0.8) + (t * PI * 0.3).sin() * 5.0,
            config.base_altitude + ease * config.epilogue_climb,
            start_z - t * config.epilogue_length,
        )
    })
}
