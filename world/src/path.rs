//! Parametric flight path threaded through the themed segments.
//!
//! Waypoints are generated once from per-segment shaping functions, spliced
//! into a single list, and interpolated with a Catmull-Rom spline. Sampling is
//! by normalized arc length so equal steps in `t` cover equal distances.

mod shaping;

use glam::Vec3;
use serde::Deserialize;
use skyride_core::PROGRESS_CAP;

const ARC_SAMPLES_PER_SPAN: usize = 64;
const TANGENT_PROBE: f32 = 1e-4;

/// Parameters controlling how the flight path is generated.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Number of themed segments laid end to end.
    pub segment_count: u32,
    /// Forward length of each themed segment in world units.
    pub segment_length: f32,
    /// Number of waypoint intervals generated per segment.
    pub subdivisions: u32,
    /// Altitude around which every segment oscillates.
    pub base_altitude: f32,
    /// Amplitude of the slow lateral drift between segments.
    pub lateral_drift: f32,
    /// Forward length of the eased tail that follows the last segment.
    pub epilogue_length: f32,
    /// Number of waypoints generated along the tail.
    pub epilogue_samples: u32,
    /// Altitude gained over the tail.
    pub epilogue_climb: f32,
    /// Catmull-Rom tension applied to waypoint tangents.
    pub tension: f32,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            segment_count: 6,
            segment_length: 120.0,
            subdivisions: 16,
            base_altitude: 8.0,
            lateral_drift: 40.0,
            epilogue_length: 300.0,
            epilogue_samples: 20,
            epilogue_climb: 20.0,
            tension: 0.1,
        }
    }
}

impl PathConfig {
    /// Forward length covered by the themed segments.
    #[must_use]
    pub fn main_length(&self) -> f32 {
        self.segment_count as f32 * self.segment_length
    }

    /// Share of the nominal path length that belongs to the themed segments.
    #[must_use]
    pub fn main_fraction(&self) -> f32 {
        let main = self.main_length();
        let total = main + self.epilogue_length.max(0.0);
        if total <= f32::EPSILON {
            1.0
        } else {
            main / total
        }
    }
}

/// Immutable spline through the generated waypoints.
#[derive(Clone, Debug)]
pub struct FlightPath {
    waypoints: Vec<Vec3>,
    tension: f32,
    arc_lengths: Vec<f32>,
}

impl FlightPath {
    /// Generates waypoints from the configuration and builds the spline once.
    #[must_use]
    pub fn build(config: &PathConfig) -> Self {
        Self::from_waypoints(shaping::waypoints(config), config.tension)
    }

    /// Builds a spline through caller-provided waypoints.
    ///
    /// Fewer than two waypoints are padded with a point one unit further along
    /// `-Z` so the curve always has a direction.
    #[must_use]
    pub fn from_waypoints(mut waypoints: Vec<Vec3>, tension: f32) -> Self {
        match waypoints.len() {
            0 => waypoints.extend([Vec3::ZERO, Vec3::NEG_Z]),
            1 => {
                let only = waypoints[0];
                waypoints.push(only + Vec3::NEG_Z);
            }
            _ => {}
        }

        let mut path = Self {
            waypoints,
            tension,
            arc_lengths: Vec::new(),
        };
        path.arc_lengths = path.measure_arc_lengths();
        path
    }

    /// Waypoints the spline passes through, in traversal order.
    #[must_use]
    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    /// Total arc length of the curve in world units.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.arc_lengths.last().copied().unwrap_or(0.0)
    }

    /// Position at the normalized arc-length parameter `t`.
    ///
    /// `t` is clamped to `[0, PROGRESS_CAP]`.
    #[must_use]
    pub fn position_at(&self, t: f32) -> Vec3 {
        self.spline_point(self.spline_parameter(clamp_parameter(t)))
    }

    /// Unit tangent at the normalized arc-length parameter `t`.
    ///
    /// `t` is clamped to `[0, PROGRESS_CAP]`.
    #[must_use]
    pub fn tangent_at(&self, t: f32) -> Vec3 {
        let u = self.spline_parameter(clamp_parameter(t));
        if let Some(tangent) = self.spline_derivative(u).try_normalize() {
            return tangent;
        }

        let ahead = self.spline_point((u + TANGENT_PROBE).min(1.0));
        let behind = self.spline_point((u - TANGENT_PROBE).max(0.0));
        (ahead - behind).try_normalize().unwrap_or(Vec3::NEG_Z)
    }

    /// Parameters of markers spaced `interval` world units apart.
    ///
    /// The first marker sits one interval from the start. Markers beyond
    /// `cutoff` are skipped to keep the end of the path uncluttered.
    #[must_use]
    pub fn marker_parameters(&self, interval: f32, cutoff: f32) -> Vec<f32> {
        let length = self.length();
        if interval <= 0.0 || length <= f32::EPSILON {
            return Vec::new();
        }

        let count = (length / interval).floor() as u32;
        (1..count)
            .map(|marker| marker as f32 * interval / length)
            .filter(|t| *t <= cutoff)
            .collect()
    }

    fn span_count(&self) -> usize {
        self.waypoints.len() - 1
    }

    fn measure_arc_lengths(&self) -> Vec<f32> {
        let samples = self.span_count() * ARC_SAMPLES_PER_SPAN;
        let mut lengths = Vec::with_capacity(samples + 1);
        let mut previous = self.spline_point(0.0);
        let mut total = 0.0;
        lengths.push(total);

        for sample in 1..=samples {
            let point = self.spline_point(sample as f32 / samples as f32);
            total += point.distance(previous);
            lengths.push(total);
            previous = point;
        }
        lengths
    }

    /// Maps a normalized arc length onto the uniform spline parameter.
    fn spline_parameter(&self, t: f32) -> f32 {
        let total = self.length();
        let last = self.arc_lengths.len().saturating_sub(1);
        if total <= f32::EPSILON || last == 0 {
            return t;
        }

        let target = t * total;
        let upper = self.arc_lengths.partition_point(|length| *length < target);
        if upper == 0 {
            return 0.0;
        }
        if upper > last {
            return 1.0;
        }

        let lower = upper - 1;
        let before = self.arc_lengths[lower];
        let span = self.arc_lengths[upper] - before;
        let fraction = if span > f32::EPSILON {
            (target - before) / span
        } else {
            0.0
        };
        (lower as f32 + fraction) / last as f32
    }

    fn spline_point(&self, u: f32) -> Vec3 {
        let ([p0, p1, p2, p3], local) = self.control_points(u);
        let v0 = (p2 - p0) * self.tension;
        let v1 = (p3 - p1) * self.tension;

        let t2 = local * local;
        let t3 = t2 * local;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + local;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        p1 * h00 + v0 * h10 + p2 * h01 + v1 * h11
    }

    fn spline_derivative(&self, u: f32) -> Vec3 {
        let ([p0, p1, p2, p3], local) = self.control_points(u);
        let v0 = (p2 - p0) * self.tension;
        let v1 = (p3 - p1) * self.tension;

        let t2 = local * local;
        let d00 = 6.0 * t2 - 6.0 * local;
        let d10 = 3.0 * t2 - 4.0 * local + 1.0;
        let d01 = -6.0 * t2 + 6.0 * local;
        let d11 = 3.0 * t2 - 2.0 * local;

        p1 * d00 + v0 * d10 + p2 * d01 + v1 * d11
    }

    /// Four control points around `u` plus the local span parameter.
    ///
    /// Phantom points beyond either end are reflected through the endpoint.
    fn control_points(&self, u: f32) -> ([Vec3; 4], f32) {
        let spans = self.span_count();
        let scaled = u.clamp(0.0, 1.0) * spans as f32;
        let mut index = scaled.floor() as usize;
        let mut local = scaled - index as f32;
        if index >= spans {
            index = spans - 1;
            local = 1.0;
        }

        let p1 = self.waypoints[index];
        let p2 = self.waypoints[index + 1];
        let p0 = if index == 0 {
            p1 * 2.0 - p2
        } else {
            self.waypoints[index - 1]
        };
        let p3 = match self.waypoints.get(index + 2) {
            Some(point) => *point,
            None => p2 * 2.0 - p1,
        };

        ([p0, p1, p2, p3], local)
    }
}

fn clamp_parameter(t: f32) -> f32 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, PROGRESS_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyride_core::SegmentLayout;

    fn straight_path() -> FlightPath {
        let points = (0..=10).map(|step| Vec3::new(0.0, 5.0, -10.0 * step as f32));
        FlightPath::from_waypoints(points.collect(), 0.1)
    }

    #[test]
    fn positions_are_continuous_across_segment_boundaries() {
        let config = PathConfig::default();
        let path = FlightPath::build(&config);
        let layout = SegmentLayout::new(config.segment_count, config.main_fraction());
        let epsilon = 1e-5;
        let bound = 4.0 * epsilon * path.length();

        for boundary in 1..config.segment_count {
            let raw = boundary as f32 / config.segment_count as f32;
            let scaled = layout.segment_start(skyride_core::SegmentIndex::new(boundary));
            for t in [raw, scaled] {
                let before = path.position_at(t - epsilon);
                let after = path.position_at(t + epsilon);
                assert!(
                    before.distance(after) <= bound,
                    "jump of {} at t={t}",
                    before.distance(after)
                );
            }
        }
    }

    #[test]
    fn equal_parameter_steps_cover_equal_distances() {
        let path = FlightPath::build(&PathConfig::default());
        let steps = 1000;
        let expected = path.length() / steps as f32;
        let mut travelled = 0.0;
        let mut previous = path.position_at(0.0);

        for step in 1..steps {
            let point = path.position_at(step as f32 / steps as f32);
            let distance = point.distance(previous);
            assert!(
                distance <= expected * 1.1,
                "step {step} covered {distance}, expected about {expected}"
            );
            travelled += distance;
            previous = point;
        }

        let covered = travelled / (path.length() * 0.999);
        assert!(covered > 0.97 && covered <= 1.001, "covered {covered}");
    }

    #[test]
    fn tangents_are_unit_length_and_point_forward() {
        let path = FlightPath::build(&PathConfig::default());
        let mut forward = 0.0;
        for step in 0..100 {
            let tangent = path.tangent_at(step as f32 / 100.0);
            assert!((tangent.length() - 1.0).abs() < 1e-4);
            forward += -tangent.z;
        }
        assert!(forward > 50.0, "path should head toward -Z overall");
    }

    #[test]
    fn sampling_clamps_out_of_range_parameters() {
        let path = straight_path();
        assert_eq!(path.position_at(1.5), path.position_at(PROGRESS_CAP));
        assert_eq!(path.position_at(-1.0), path.position_at(0.0));
        assert_eq!(path.position_at(f32::NAN), path.position_at(0.0));
    }

    #[test]
    fn straight_path_samples_linearly() {
        let path = straight_path();
        assert!((path.length() - 100.0).abs() < 1e-2);

        let middle = path.position_at(0.5);
        assert!(middle.distance(Vec3::new(0.0, 5.0, -50.0)) < 0.05, "{middle:?}");
        assert!(path.tangent_at(0.25).distance(Vec3::NEG_Z) < 1e-4);
    }

    #[test]
    fn markers_are_evenly_spaced_and_skip_the_tail() {
        let path = FlightPath::build(&PathConfig::default());
        let markers = path.marker_parameters(65.0, 0.95);
        let spacing = 65.0 / path.length();

        assert!(!markers.is_empty());
        assert!((markers[0] - spacing).abs() < 1e-6);
        for pair in markers.windows(2) {
            assert!((pair[1] - pair[0] - spacing).abs() < 1e-5);
        }
        assert!(markers.iter().all(|t| *t <= 0.95));
        assert!(path.marker_parameters(0.0, 0.95).is_empty());
    }

    #[test]
    fn build_is_deterministic() {
        let first = FlightPath::build(&PathConfig::default());
        let second = FlightPath::build(&PathConfig::default());
        assert_eq!(first.waypoints(), second.waypoints());
        assert_eq!(first.position_at(0.37), second.position_at(0.37));
    }

    #[test]
    fn degenerate_waypoint_lists_still_sample() {
        let path = FlightPath::from_waypoints(Vec::new(), 0.1);
        assert_eq!(path.waypoints().len(), 2);
        assert!(path.tangent_at(0.5).distance(Vec3::NEG_Z) < 1e-4);
    }
}
