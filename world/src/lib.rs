#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative journey state for Skyride.
//!
//! The world owns the flight path, the progress clock, gate and marker
//! layouts, and the cosmetic timers. It is only mutated through [`apply`],
//! which reports every observable change as an [`Event`].

pub mod clock;
pub mod path;
mod timers;

use std::time::Duration;

use glam::Vec3;
use serde::Deserialize;
use skyride_core::{
    smoothing_factor, Command, Event, FinaleCause, GateId, PlayMode, SegmentIndex, SegmentLayout,
};
use tracing::{debug, info};

use self::{
    clock::{ClockConfig, ProgressClock},
    path::{FlightPath, PathConfig},
    timers::{TimerAction, TimerQueue},
};

/// Placement rules for the hoop markers dotted along the path.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Arc-length spacing between markers in world units.
    pub interval: f32,
    /// Markers past this normalized parameter are omitted.
    pub cutoff: f32,
    /// Height of each marker above the path.
    pub lift: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            interval: 65.0,
            cutoff: 0.95,
            lift: 3.0,
        }
    }
}

/// Placement and animation of the gates between segments.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GateLayoutConfig {
    /// Height of each gate above the path.
    pub lift: f32,
    /// Largest progress threshold a gate may use.
    pub threshold_cap: f32,
    /// Scale an opened gate shrinks toward.
    pub collapsed_scale: f32,
    /// Fraction of the remaining shrink applied per 60 Hz frame.
    pub collapse_rate: f32,
}

impl Default for GateLayoutConfig {
    fn default() -> Self {
        Self {
            lift: 2.0,
            threshold_cap: 0.998,
            collapsed_scale: 0.01,
            collapse_rate: 0.05,
        }
    }
}

/// Durations of the cosmetic timers.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Seconds a segment title stays on screen.
    pub announcement_secs: f32,
    /// Seconds between reaching the finale and handing off control.
    pub handoff_delay_secs: f32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            announcement_secs: 4.0,
            handoff_delay_secs: 3.0,
        }
    }
}

/// Everything required to construct a [`World`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Shape of the flight path.
    pub path: PathConfig,
    /// Progress clock tuning.
    pub clock: ClockConfig,
    /// Hoop marker placement.
    pub markers: MarkerConfig,
    /// Gate placement and animation.
    pub gates: GateLayoutConfig,
    /// Cosmetic timer durations.
    pub timers: TimerConfig,
}

/// Marker spanning the boundary between two consecutive segments.
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    id: GateId,
    threshold: f32,
    position: Vec3,
    facing: Vec3,
    opened: bool,
    scale: f32,
}

impl Gate {
    /// Identifier of the gate.
    #[must_use]
    pub const fn id(&self) -> GateId {
        self.id
    }

    /// Progress at which the gate is passed.
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    /// World position of the gate's centre.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit direction the gate faces, along the path.
    #[must_use]
    pub const fn facing(&self) -> Vec3 {
        self.facing
    }

    /// Whether the gate has been opened.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.opened
    }

    /// Current visual scale; shrinks after opening.
    #[must_use]
    pub const fn scale(&self) -> f32 {
        self.scale
    }
}

/// Decorative hoop placed at a fixed arc-length interval.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Marker {
    parameter: f32,
    position: Vec3,
    facing: Vec3,
}

impl Marker {
    /// Normalized path parameter of the marker.
    #[must_use]
    pub const fn parameter(&self) -> f32 {
        self.parameter
    }

    /// World position of the marker.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit direction the marker faces.
    #[must_use]
    pub const fn facing(&self) -> Vec3 {
        self.facing
    }
}

/// Represents the authoritative journey state.
#[derive(Debug)]
pub struct World {
    path: FlightPath,
    layout: SegmentLayout,
    clock: ProgressClock,
    initial_target_speed: f32,
    elapsed: Duration,
    last_delta: f32,
    tick_index: u64,
    play_mode: PlayMode,
    current_segment: SegmentIndex,
    gates: Vec<Gate>,
    gate_config: GateLayoutConfig,
    markers: Vec<Marker>,
    announcement: Option<SegmentIndex>,
    timers: TimerQueue,
    timer_config: TimerConfig,
    finale: Option<FinaleCause>,
    path_end_reported: bool,
    shut_down: bool,
}

impl World {
    /// Creates a new world, building the path and its gate and marker layouts.
    #[must_use]
    pub fn new(config: &WorldConfig) -> Self {
        let path = FlightPath::build(&config.path);
        Self::with_path(path, config)
    }

    /// Creates a world around a prebuilt path.
    ///
    /// The segment layout still comes from `config.path`, which lets callers
    /// drive synthetic curves through the regular segment bookkeeping.
    #[must_use]
    pub fn with_path(path: FlightPath, config: &WorldConfig) -> Self {
        let layout = SegmentLayout::new(config.path.segment_count, config.path.main_fraction());
        let gates = layout_gates(&path, layout, &config.gates);
        let markers = layout_markers(&path, &config.markers);

        Self {
            path,
            layout,
            clock: ProgressClock::new(config.clock.smoothing),
            initial_target_speed: config.clock.initial_target_speed,
            elapsed: Duration::ZERO,
            last_delta: 0.0,
            tick_index: 0,
            play_mode: PlayMode::Idle,
            current_segment: SegmentIndex::new(0),
            gates,
            gate_config: config.gates.clone(),
            markers,
            announcement: None,
            timers: TimerQueue::default(),
            timer_config: config.timers.clone(),
            finale: None,
            path_end_reported: false,
            shut_down: false,
        }
    }

    fn set_play_mode(&mut self, mode: PlayMode, out_events: &mut Vec<Event>) {
        if self.play_mode == mode {
            return;
        }
        debug!(from = ?self.play_mode, to = ?mode, "play mode changed");
        self.play_mode = mode;
        out_events.push(Event::PlayModeChanged { mode });
    }

    fn advance_progress(&mut self, dt: f32, out_events: &mut Vec<Event>) {
        let step = self.clock.advance(dt);
        if step.to > step.from {
            out_events.push(Event::ProgressAdvanced {
                from: step.from,
                to: step.to,
            });
        }

        let reached = self.layout.segment_at(step.to);
        while self.current_segment < reached {
            self.current_segment = self.current_segment.next();
            debug!(segment = self.current_segment.get(), "entered segment");
            out_events.push(Event::SegmentEntered {
                segment: self.current_segment,
            });
        }

        if step.capped && !self.path_end_reported {
            self.path_end_reported = true;
            info!(tick = self.tick_index, "reached end of path");
            out_events.push(Event::PathEndReached);
        }
    }

    fn collapse_open_gates(&mut self, dt: f32) {
        let rate = smoothing_factor(self.gate_config.collapse_rate, dt);
        let target = self.gate_config.collapsed_scale;
        for gate in self.gates.iter_mut().filter(|gate| gate.opened) {
            gate.scale += (target - gate.scale) * rate;
        }
    }

    fn fire_due_timers(&mut self, out_events: &mut Vec<Event>) {
        for action in self.timers.drain_due(self.elapsed) {
            match action {
                TimerAction::ExpireAnnouncement { segment } => {
                    if self.announcement == Some(segment) {
                        self.announcement = None;
                    }
                    out_events.push(Event::AnnouncementExpired { segment });
                }
                TimerAction::Handoff => self.hand_off(out_events),
            }
        }
    }

    fn hand_off(&mut self, out_events: &mut Vec<Event>) {
        info!("handing control to external mode");
        self.set_play_mode(PlayMode::Handoff, out_events);
        out_events.push(Event::HandoffRequested);
    }

    fn schedule_in(&mut self, seconds: f32, action: TimerAction) {
        let delay = Duration::try_from_secs_f32(seconds.max(0.0)).unwrap_or(Duration::ZERO);
        self.timers.schedule(self.elapsed.saturating_add(delay), action);
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(&WorldConfig::default())
    }
}

fn layout_gates(path: &FlightPath, layout: SegmentLayout, config: &GateLayoutConfig) -> Vec<Gate> {
    (1..layout.segment_count())
        .map(|boundary| {
            let threshold = layout
                .segment_start(SegmentIndex::new(boundary))
                .min(config.threshold_cap);
            Gate {
                id: GateId::new(boundary - 1),
                threshold,
                position: path.position_at(threshold) + Vec3::Y * config.lift,
                facing: path.tangent_at(threshold),
                opened: false,
                scale: 1.0,
            }
        })
        .collect()
}

fn layout_markers(path: &FlightPath, config: &MarkerConfig) -> Vec<Marker> {
    path.marker_parameters(config.interval, config.cutoff)
        .into_iter()
        .map(|parameter| Marker {
            parameter,
            position: path.position_at(parameter) + Vec3::Y * config.lift,
            facing: path.tangent_at(parameter),
        })
        .collect()
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    if world.shut_down {
        return;
    }

    match command {
        Command::Begin => {
            if world.play_mode != PlayMode::Idle {
                return;
            }
            info!("journey started");
            world.clock.set_target_speed(world.initial_target_speed);
            out_events.push(Event::JourneyStarted);
            world.set_play_mode(PlayMode::Flying, out_events);
            out_events.push(Event::TargetSpeedChanged {
                speed: world.clock.target_speed(),
            });
        }
        Command::Tick { dt } => {
            let seconds = dt.as_secs_f32();
            world.tick_index = world.tick_index.saturating_add(1);
            world.elapsed = world.elapsed.saturating_add(dt);
            world.last_delta = seconds;
            out_events.push(Event::TimeAdvanced {
                dt,
                clock: query::clock(world),
            });

            if world.play_mode.advances_clock() {
                world.advance_progress(seconds, out_events);
            }
            world.collapse_open_gates(seconds);
            world.fire_due_timers(out_events);
        }
        Command::SetTargetSpeed { speed } => {
            world.clock.set_target_speed(speed);
            out_events.push(Event::TargetSpeedChanged {
                speed: world.clock.target_speed(),
            });
        }
        Command::Pause => {
            if world.play_mode == PlayMode::Flying {
                world.set_play_mode(PlayMode::Paused, out_events);
            }
        }
        Command::Resume => {
            if world.play_mode == PlayMode::Paused {
                world.set_play_mode(PlayMode::Flying, out_events);
            }
        }
        Command::BeginInterlude => {
            if world.play_mode == PlayMode::Flying {
                world.clock.set_target_speed(0.0);
                world.set_play_mode(PlayMode::Interlude, out_events);
                out_events.push(Event::TargetSpeedChanged { speed: 0.0 });
            }
        }
        Command::EndInterlude => {
            if world.play_mode == PlayMode::Interlude {
                world.set_play_mode(PlayMode::Flying, out_events);
            }
        }
        Command::OpenGate { gate } => {
            let Some(entry) = world.gates.iter_mut().find(|entry| entry.id == gate) else {
                return;
            };
            if entry.opened {
                return;
            }
            entry.opened = true;
            debug!(gate = gate.get(), "gate opened");
            out_events.push(Event::GateOpened {
                gate,
                position: entry.position,
            });
        }
        Command::AnnounceSegment { segment } => {
            if segment.get() >= world.layout.segment_count() {
                return;
            }
            world.announcement = Some(segment);
            world
                .timers
                .cancel_where(|action| matches!(action, TimerAction::ExpireAnnouncement { .. }));
            let duration = world.timer_config.announcement_secs;
            world.schedule_in(duration, TimerAction::ExpireAnnouncement { segment });
            out_events.push(Event::SegmentAnnounced { segment });
        }
        Command::RequestBurst { position } => {
            out_events.push(Event::BurstRequested { position });
        }
        Command::ShakeCamera { amount } => {
            out_events.push(Event::CameraShakeRequested {
                amount: amount.max(0.0),
            });
        }
        Command::TriggerFinale { cause } => {
            if world.finale.is_some() || world.play_mode == PlayMode::Idle {
                return;
            }
            info!(?cause, progress = world.clock.progress(), "finale triggered");
            world.finale = Some(cause);
            world.clock.halt();
            out_events.push(Event::FinaleTriggered { cause });
            match cause {
                FinaleCause::Reached => {
                    world.set_play_mode(PlayMode::Finale, out_events);
                    let delay = world.timer_config.handoff_delay_secs;
                    world.schedule_in(delay, TimerAction::Handoff);
                }
                FinaleCause::Skipped => world.hand_off(out_events),
            }
        }
        Command::Shutdown => {
            world.shut_down = true;
            world.timers.cancel_all();
            world.announcement = None;
            info!(tick = world.tick_index, "world shut down");
            out_events.push(Event::ShutDown);
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use skyride_core::{FinaleCause, FrameClock, PlayMode, SegmentIndex, SegmentLayout};

    use super::{path::FlightPath, Gate, Marker, World};

    /// Provides read-only access to the flight path.
    #[must_use]
    pub fn path(world: &World) -> &FlightPath {
        &world.path
    }

    /// Mapping from progress onto themed segments.
    #[must_use]
    pub fn layout(world: &World) -> SegmentLayout {
        world.layout
    }

    /// Current normalized progress.
    #[must_use]
    pub fn progress(world: &World) -> f32 {
        world.clock.progress()
    }

    /// Current progress speed.
    #[must_use]
    pub fn speed(world: &World) -> f32 {
        world.clock.speed()
    }

    /// Speed the clock is easing toward.
    #[must_use]
    pub fn target_speed(world: &World) -> f32 {
        world.clock.target_speed()
    }

    /// Progress rescaled so the themed segments span `[0, 1]`.
    #[must_use]
    pub fn segment_progress(world: &World) -> f32 {
        world.layout.segment_space(world.clock.progress())
    }

    /// Segment the actor is currently traversing.
    #[must_use]
    pub fn current_segment(world: &World) -> SegmentIndex {
        world.current_segment
    }

    /// Fraction of the current segment already traversed.
    #[must_use]
    pub fn local_progress(world: &World) -> f32 {
        world.layout.local_progress(world.clock.progress())
    }

    /// Active play mode.
    #[must_use]
    pub fn play_mode(world: &World) -> PlayMode {
        world.play_mode
    }

    /// Simulation clock as of the most recent tick.
    #[must_use]
    pub fn clock(world: &World) -> FrameClock {
        FrameClock::new(world.elapsed.as_secs_f32(), world.last_delta)
    }

    /// Number of ticks applied so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Gates in ascending threshold order.
    #[must_use]
    pub fn gates(world: &World) -> &[Gate] {
        &world.gates
    }

    /// Hoop markers in path order.
    #[must_use]
    pub fn markers(world: &World) -> &[Marker] {
        &world.markers
    }

    /// Segment whose title is currently displayed, if any.
    #[must_use]
    pub fn announcement(world: &World) -> Option<SegmentIndex> {
        world.announcement
    }

    /// Cause of the finale, once one has been triggered.
    #[must_use]
    pub fn finale(world: &World) -> Option<FinaleCause> {
        world.finale
    }

    /// Number of cosmetic timers still pending.
    #[must_use]
    pub fn pending_timers(world: &World) -> usize {
        world.timers.len()
    }

    /// Whether the world has stopped processing commands.
    #[must_use]
    pub fn is_shut_down(world: &World) -> bool {
        world.shut_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyride_core::REFERENCE_FRAME;

    fn started_world() -> (World, Vec<Event>) {
        let mut world = World::default();
        let mut events = Vec::new();
        apply(&mut world, Command::Begin, &mut events);
        (world, events)
    }

    fn tick(world: &mut World, frames: usize) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..frames {
            apply(world, Command::Tick { dt: REFERENCE_FRAME }, &mut events);
        }
        events
    }

    #[test]
    fn begin_starts_flying_once() {
        let (mut world, events) = started_world();
        assert_eq!(events.first(), Some(&Event::JourneyStarted));
        assert_eq!(query::play_mode(&world), PlayMode::Flying);
        assert!((query::target_speed(&world) - 0.012).abs() < 1e-6);

        let mut repeated = Vec::new();
        apply(&mut world, Command::Begin, &mut repeated);
        assert!(repeated.is_empty(), "begin should be one-shot");
    }

    #[test]
    fn idle_world_does_not_advance() {
        let mut world = World::default();
        let events = tick(&mut world, 120);
        assert_eq!(query::progress(&world), 0.0);
        assert!(events
            .iter()
            .all(|event| matches!(event, Event::TimeAdvanced { .. })));
    }

    #[test]
    fn pause_freezes_progress_and_keeps_speed() {
        let (mut world, _) = started_world();
        let _ = tick(&mut world, 120);
        let mut events = Vec::new();
        apply(&mut world, Command::Pause, &mut events);
        let progress = query::progress(&world);
        let speed = query::speed(&world);

        let _ = tick(&mut world, 60);
        assert_eq!(query::progress(&world), progress);
        assert_eq!(query::speed(&world), speed);

        apply(&mut world, Command::Resume, &mut events);
        let _ = tick(&mut world, 1);
        assert!(query::progress(&world) > progress);
        assert_eq!(
            events,
            vec![
                Event::PlayModeChanged {
                    mode: PlayMode::Paused
                },
                Event::PlayModeChanged {
                    mode: PlayMode::Flying
                },
            ]
        );
    }

    #[test]
    fn interlude_decelerates_to_zero() {
        let (mut world, _) = started_world();
        let _ = tick(&mut world, 240);
        let mut events = Vec::new();
        apply(&mut world, Command::BeginInterlude, &mut events);
        assert_eq!(query::target_speed(&world), 0.0);
        assert!(query::speed(&world) > 0.0, "speed eases rather than snapping");

        let _ = tick(&mut world, 2_000);
        assert!(query::speed(&world) < 1e-6);
    }

    #[test]
    fn entering_segments_emits_each_boundary_in_order() {
        let mut config = WorldConfig::default();
        config.clock.smoothing = 1.0;
        let mut world = World::new(&config);
        let mut events = Vec::new();
        apply(&mut world, Command::Begin, &mut events);
        apply(&mut world, Command::SetTargetSpeed { speed: 0.3 }, &mut events);
        events.clear();
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_secs(1),
            },
            &mut events,
        );

        let entered: Vec<u32> = events
            .iter()
            .filter_map(|event| match event {
                Event::SegmentEntered { segment } => Some(segment.get()),
                _ => None,
            })
            .collect();
        assert_eq!(entered, vec![1, 2]);
        assert_eq!(query::current_segment(&world), SegmentIndex::new(2));
    }

    #[test]
    fn gates_open_once_and_collapse() {
        let (mut world, _) = started_world();
        let gate = GateId::new(0);
        let mut events = Vec::new();
        apply(&mut world, Command::OpenGate { gate }, &mut events);
        apply(&mut world, Command::OpenGate { gate }, &mut events);
        assert_eq!(events.len(), 1, "second open should be ignored");

        let _ = tick(&mut world, 600);
        let scale = query::gates(&world)[0].scale();
        assert!(scale < 0.02, "gate scale was {scale}");
        assert_eq!(query::gates(&world)[1].scale(), 1.0);
    }

    #[test]
    fn gate_thresholds_sit_on_segment_boundaries() {
        let world = World::default();
        let gates = query::gates(&world);
        assert_eq!(gates.len(), 5);
        let main_fraction = 720.0 / 1020.0;
        for (index, gate) in gates.iter().enumerate() {
            let expected = (index as f32 + 1.0) / 6.0 * main_fraction;
            assert!((gate.threshold() - expected).abs() < 1e-6);
        }
        assert!(!query::markers(&world).is_empty());
    }

    #[test]
    fn announcements_expire_after_their_timer() {
        let (mut world, _) = started_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AnnounceSegment {
                segment: SegmentIndex::new(1),
            },
            &mut events,
        );
        assert_eq!(query::announcement(&world), Some(SegmentIndex::new(1)));

        let early = tick(&mut world, 230);
        assert!(!early
            .iter()
            .any(|event| matches!(event, Event::AnnouncementExpired { .. })));

        let late = tick(&mut world, 20);
        assert!(late.contains(&Event::AnnouncementExpired {
            segment: SegmentIndex::new(1)
        }));
        assert_eq!(query::announcement(&world), None);
    }

    #[test]
    fn reached_finale_hands_off_after_delay() {
        let (mut world, _) = started_world();
        let _ = tick(&mut world, 60);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::TriggerFinale {
                cause: FinaleCause::Reached,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::TriggerFinale {
                cause: FinaleCause::Skipped,
            },
            &mut events,
        );
        assert_eq!(query::play_mode(&world), PlayMode::Finale);
        assert_eq!(query::speed(&world), 0.0);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, Event::FinaleTriggered { .. }))
                .count(),
            1
        );

        let later = tick(&mut world, 200);
        assert!(later.contains(&Event::HandoffRequested));
        assert_eq!(query::play_mode(&world), PlayMode::Handoff);
    }

    #[test]
    fn skipped_finale_hands_off_immediately() {
        let (mut world, _) = started_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::TriggerFinale {
                cause: FinaleCause::Skipped,
            },
            &mut events,
        );
        assert!(events.contains(&Event::HandoffRequested));
        assert_eq!(query::play_mode(&world), PlayMode::Handoff);
        assert_eq!(query::pending_timers(&world), 0);
    }

    #[test]
    fn shutdown_cancels_timers_and_ignores_further_commands() {
        let (mut world, _) = started_world();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::AnnounceSegment {
                segment: SegmentIndex::new(0),
            },
            &mut events,
        );
        assert_eq!(query::pending_timers(&world), 1);

        apply(&mut world, Command::Shutdown, &mut events);
        apply(&mut world, Command::Shutdown, &mut events);
        assert_eq!(query::pending_timers(&world), 0);
        assert!(query::is_shut_down(&world));
        assert_eq!(
            events
                .iter()
                .filter(|event| **event == Event::ShutDown)
                .count(),
            1,
            "repeated shutdown must not emit additional events"
        );

        let after = tick(&mut world, 600);
        assert!(after.is_empty());
        assert_eq!(query::tick_index(&world), 0);
    }
}
