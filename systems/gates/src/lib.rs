#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! One-shot gates that fire as progress crosses segment boundaries.
//!
//! Every gate is armed at construction and fires exactly once, on the frame
//! where progress moves from below its threshold to at or above it. Firing
//! opens the gate marker, announces the next segment, and requests a
//! celebratory burst. Once all gates have fired and progress nears the end of
//! the themed segments, the manager raises the finale.

use glam::Vec3;
use serde::Deserialize;
use skyride_core::{Command, Event, FinaleCause, GateId, SegmentIndex, SegmentLayout};
use skyride_world::Gate;
use tracing::info;

/// Configuration parameters required to construct the gate manager.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    finale_fraction: f32,
}

impl Config {
    /// Creates a configuration that raises the finale at `finale_fraction` of
    /// the themed portion of the path.
    #[must_use]
    pub const fn new(finale_fraction: f32) -> Self {
        Self { finale_fraction }
    }

    /// Share of the themed portion after which the finale is raised.
    #[must_use]
    pub const fn finale_fraction(&self) -> f32 {
        self.finale_fraction
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(0.98)
    }
}

/// Lifecycle of a single gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GateState {
    /// Waiting for progress to reach the threshold.
    Armed,
    /// Fired; never re-arms.
    Fired,
}

#[derive(Clone, Copy, Debug)]
struct GateTrigger {
    gate: GateId,
    threshold: f32,
    position: Vec3,
    state: GateState,
}

/// Pure system that turns threshold crossings into gate commands.
#[derive(Debug)]
pub struct GateManager {
    triggers: Vec<GateTrigger>,
    finale_threshold: f32,
    finale_raised: bool,
}

impl GateManager {
    /// Arms one trigger per gate in the world's layout.
    #[must_use]
    pub fn new(config: Config, gates: &[Gate], layout: SegmentLayout) -> Self {
        let mut triggers: Vec<GateTrigger> = gates
            .iter()
            .map(|gate| GateTrigger {
                gate: gate.id(),
                threshold: gate.threshold(),
                position: gate.position(),
                state: GateState::Armed,
            })
            .collect();
        triggers.sort_by(|left, right| left.threshold.total_cmp(&right.threshold));

        Self {
            triggers,
            finale_threshold: layout.main_fraction() * config.finale_fraction,
            finale_raised: false,
        }
    }

    /// Progress at which the finale is raised once every gate has fired.
    #[must_use]
    pub const fn finale_threshold(&self) -> f32 {
        self.finale_threshold
    }

    /// State of the requested gate, or `None` when unknown.
    #[must_use]
    pub fn state(&self, gate: GateId) -> Option<GateState> {
        self.triggers
            .iter()
            .find(|trigger| trigger.gate == gate)
            .map(|trigger| trigger.state)
    }

    /// Number of gates that have fired.
    #[must_use]
    pub fn fired_count(&self) -> usize {
        self.triggers
            .iter()
            .filter(|trigger| trigger.state == GateState::Fired)
            .count()
    }

    /// Whether the finale has been raised or observed.
    #[must_use]
    pub const fn finale_raised(&self) -> bool {
        self.finale_raised
    }

    /// Consumes world events and emits gate, announcement, and finale commands.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::JourneyStarted => out.push(Command::AnnounceSegment {
                    segment: SegmentIndex::new(0),
                }),
                Event::ProgressAdvanced { from, to } => {
                    self.fire_crossed(*from, *to, out);
                    self.raise_finale(*to, out);
                }
                Event::FinaleTriggered { .. } => self.finale_raised = true,
                _ => {}
            }
        }
    }

    fn fire_crossed(&mut self, from: f32, to: f32, out: &mut Vec<Command>) {
        for trigger in &mut self.triggers {
            if trigger.state != GateState::Armed {
                continue;
            }
            if from < trigger.threshold && trigger.threshold <= to {
                trigger.state = GateState::Fired;
                info!(
                    gate = trigger.gate.get(),
                    threshold = trigger.threshold,
                    "gate fired"
                );
                out.push(Command::OpenGate { gate: trigger.gate });
                out.push(Command::AnnounceSegment {
                    segment: trigger.gate.opens_segment(),
                });
                out.push(Command::RequestBurst {
                    position: trigger.position,
                });
            }
        }
    }

    fn raise_finale(&mut self, progress: f32, out: &mut Vec<Command>) {
        if self.finale_raised || progress < self.finale_threshold {
            return;
        }
        if self
            .triggers
            .iter()
            .any(|trigger| trigger.state == GateState::Armed)
        {
            return;
        }
        self.finale_raised = true;
        out.push(Command::TriggerFinale {
            cause: FinaleCause::Reached,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyride_world::{query, World};

    #[test]
    fn finale_threshold_scales_main_fraction() {
        let world = World::default();
        let manager = GateManager::new(
            Config::default(),
            query::gates(&world),
            query::layout(&world),
        );
        let expected = 720.0 / 1020.0 * 0.98;
        assert!((manager.finale_threshold() - expected).abs() < 1e-6);
        assert_eq!(manager.fired_count(), 0);
    }

    #[test]
    fn journey_start_announces_first_segment() {
        let world = World::default();
        let mut manager =
            GateManager::new(Config::default(), query::gates(&world), query::layout(&world));
        let mut out = Vec::new();
        manager.handle(&[Event::JourneyStarted], &mut out);
        assert_eq!(
            out,
            vec![Command::AnnounceSegment {
                segment: SegmentIndex::new(0)
            }]
        );
    }
}
