#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Frame-by-frame orchestration of a Skyride journey.
//!
//! A [`Journey`] owns the authoritative world and every system. Each call to
//! [`Journey::tick`] applies queued external commands, advances the world,
//! pumps systems until they stop producing commands, and then refreshes the
//! streaming window, actor pose, camera, and atmosphere. Adapters read the
//! resulting [`FrameReport`] and never touch the world directly.

pub mod config;

use std::{
    mem,
    sync::mpsc::{Receiver, TryRecvError},
    time::Duration,
};

use skyride_core::{Command, Event, FinaleCause, FrameClock, PlayMode, SegmentIndex};
use skyride_system_atmosphere::{Atmosphere, AtmosphereState};
use skyride_system_camera::{CameraController, CameraTransform};
use skyride_system_gates::GateManager;
use skyride_system_pacing::Pacing;
use skyride_system_pose::{ActorModel, ActorPose, ActorPoseSolver, AssetSlot};
use skyride_system_streaming::{AttachedSet, Environment, EnvironmentRegistry};
use skyride_world::{self as world, query, World};
use tracing::{debug, info};

pub use config::{ConfigError, JourneyConfig};

/// Outcome of loading the actor model off-thread.
pub type ActorAssetResult = Result<ActorModel, String>;

/// Everything an adapter needs to present one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Simulation clock after the tick.
    pub clock: FrameClock,
    /// Normalized progress after the tick.
    pub progress: f32,
    /// Segment the actor is traversing.
    pub segment: SegmentIndex,
    /// Active play mode.
    pub play_mode: PlayMode,
    /// Actor pose, absent while the model is still loading.
    pub actor: Option<ActorPose>,
    /// Camera placement.
    pub camera: CameraTransform,
    /// Sky and fog colouring.
    pub atmosphere: AtmosphereState,
    /// Every event the world emitted during the tick, in order.
    pub events: Vec<Event>,
}

/// A running journey over environments of type `E`.
#[derive(Debug)]
pub struct Journey<E> {
    world: World,
    registry: EnvironmentRegistry<E>,
    root: AttachedSet,
    gates: GateManager,
    pacing: Pacing,
    pose: ActorPoseSolver,
    camera: CameraController,
    atmosphere: Atmosphere,
    queued: Vec<Command>,
    actor_asset: Option<Receiver<ActorAssetResult>>,
    detached: bool,
}

impl<E: Environment> Journey<E> {
    /// Validates `config` and assembles a journey in the idle state.
    ///
    /// `environments` are assigned to segments in order; exactly one is
    /// required per segment.
    pub fn new(config: &JourneyConfig, environments: Vec<E>) -> Result<Self, ConfigError> {
        config.validate()?;
        let segments = config.world.path.segment_count as usize;
        if environments.len() != segments {
            return Err(ConfigError::Invalid(format!(
                "expected {segments} environments, received {}",
                environments.len()
            )));
        }
        let world = World::new(&config.world);
        let gates = GateManager::new(
            config.finale,
            query::gates(&world),
            query::layout(&world),
        );
        let registry = EnvironmentRegistry::new(environments, config.world.path.segment_length);
        debug!(
            environments = registry.len(),
            path_length = query::path(&world).length(),
            "journey assembled"
        );

        Ok(Self {
            world,
            registry,
            root: AttachedSet::new(),
            gates,
            pacing: Pacing::new(config.pacing.clone()),
            pose: ActorPoseSolver::new(config.actor.clone()),
            camera: CameraController::new(config.camera.clone()),
            atmosphere: Atmosphere::new(config.atmosphere.clone()),
            queued: Vec::new(),
            actor_asset: None,
            detached: false,
        })
    }

    /// Read-only access to the world for queries.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Environment registry with its residency states.
    #[must_use]
    pub const fn registry(&self) -> &EnvironmentRegistry<E> {
        &self.registry
    }

    /// Segments whose content is attached to the scene.
    #[must_use]
    pub const fn scene_root(&self) -> &AttachedSet {
        &self.root
    }

    /// Gate lifecycle states.
    #[must_use]
    pub const fn gates(&self) -> &GateManager {
        &self.gates
    }

    /// Loading state of the actor model.
    #[must_use]
    pub const fn actor_asset(&self) -> &AssetSlot {
        self.pose.asset()
    }

    /// Reports whether [`Journey::dispose`] has run.
    #[must_use]
    pub const fn is_detached(&self) -> bool {
        self.detached
    }

    /// Queues a command for the next tick.
    pub fn submit(&mut self, command: Command) {
        if !self.detached {
            self.queued.push(command);
        }
    }

    /// Starts the journey on the next tick.
    pub fn begin(&mut self) {
        self.submit(Command::Begin);
    }

    /// Overrides the speed the clock eases toward.
    pub fn set_target_speed(&mut self, speed: f32) {
        self.submit(Command::SetTargetSpeed { speed });
    }

    /// Freezes progression.
    pub fn pause(&mut self) {
        self.submit(Command::Pause);
    }

    /// Resumes progression after [`Journey::pause`].
    pub fn resume(&mut self) {
        self.submit(Command::Resume);
    }

    /// Hands control to an external mode while progression decelerates.
    pub fn begin_interlude(&mut self) {
        self.submit(Command::BeginInterlude);
    }

    /// Returns control to the journey after an interlude.
    pub fn end_interlude(&mut self) {
        self.submit(Command::EndInterlude);
    }

    /// Ends the journey immediately and requests the handoff.
    pub fn skip_to_finale(&mut self) {
        self.submit(Command::TriggerFinale {
            cause: FinaleCause::Skipped,
        });
    }

    /// Shakes the camera.
    pub fn shake_camera(&mut self, amount: f32) {
        self.submit(Command::ShakeCamera { amount });
    }

    /// Supplies the actor model directly.
    pub fn set_actor_model(&mut self, result: ActorAssetResult) {
        self.actor_asset = None;
        self.pose.finish_loading(result);
    }

    /// Polls `receiver` each tick until the off-thread load reports back.
    pub fn attach_actor_asset_receiver(&mut self, receiver: Receiver<ActorAssetResult>) {
        self.actor_asset = Some(receiver);
    }

    /// Advances the journey by `dt`. Returns `None` once disposed.
    pub fn tick(&mut self, dt: Duration) -> Option<FrameReport> {
        if self.detached {
            return None;
        }
        self.poll_actor_asset();

        let mut commands = mem::take(&mut self.queued);
        commands.push(Command::Tick { dt });
        let events = self.pump(commands);

        let clock = query::clock(&self.world);
        let progress = query::progress(&self.world);
        let segment = query::current_segment(&self.world);
        let path = query::path(&self.world);

        self.registry
            .update(query::segment_progress(&self.world), clock, &mut self.root);
        let actor = self.pose.update(path, progress, clock);
        let actor_position = actor.map_or_else(|| path.position_at(progress), |pose| pose.position);
        let camera = self.camera.update(path, progress, actor_position, clock);
        let atmosphere = self.atmosphere.update(segment, clock);

        Some(FrameReport {
            clock,
            progress,
            segment,
            play_mode: query::play_mode(&self.world),
            actor,
            camera,
            atmosphere,
            events,
        })
    }

    /// Stops the journey and releases every environment.
    ///
    /// The journey detaches first so no tick can run against half-released
    /// state, then cancels timers, then disposes content. Repeated calls do
    /// nothing.
    pub fn dispose(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;
        self.queued.clear();
        self.actor_asset = None;
        let _ = self.pump(vec![Command::Shutdown]);
        self.registry.dispose(&mut self.root);
        info!(tick = query::tick_index(&self.world), "journey disposed");
    }

    fn poll_actor_asset(&mut self) {
        let Some(receiver) = &self.actor_asset else {
            return;
        };
        let result = match receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                Err("actor loader stopped without a result".to_owned())
            }
        };
        self.actor_asset = None;
        self.pose.finish_loading(result);
    }

    fn pump(&mut self, commands: Vec<Command>) -> Vec<Event> {
        let mut emitted = Vec::new();
        let mut pending = commands;
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.gates.handle(&events, &mut pending);
            self.pacing.handle(&events, &mut pending);
            self.pose.handle(&events);
            self.camera.handle(&events);
            emitted.extend(events);
        }
        emitted
    }
}
