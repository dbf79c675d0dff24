#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that flies a Skyride journey.

mod environments;
mod loader;
mod scene;

use std::{path::PathBuf, time::Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use skyride_core::{Event, PlayMode, REFERENCE_FRAME};
use skyride_engine::{Journey, JourneyConfig};
use skyride_rendering::{FrameSimulationBreakdown, Presentation, RenderingBackend};
use skyride_rendering_macroquad::MacroquadBackend;
use skyride_system_atmosphere::Atmosphere;
use skyride_system_pose::ActorModel;
use skyride_world::query;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::environments::ThemedEnvironment;

/// Camera shake requested by the keyboard shortcut, before scaling.
const SHAKE_AMOUNT: f32 = 5.0;

#[derive(Debug, Parser)]
#[command(name = "skyride", about = "Scripted flight through themed segments")]
struct CliArgs {
    /// TOML file overriding the default journey configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// glTF model for the actor; a procedural stand-in is used when omitted.
    #[arg(long, value_name = "PATH")]
    actor_model: Option<PathBuf>,
    /// Synchronise presentation with the display refresh rate.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    vsync: bool,
    /// Print frame timing once per second.
    #[arg(long)]
    show_fps: bool,
    /// Run without a window at a fixed 60 Hz step.
    #[arg(long)]
    headless: bool,
    /// Frames to simulate in headless mode.
    #[arg(long, default_value_t = 4_000)]
    frames: u32,
    /// Seed for environment decoration.
    #[arg(long, default_value_t = 0x5eed)]
    seed: u64,
}

/// Entry point for the Skyride command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => JourneyConfig::load(path)
            .with_context(|| format!("could not load {}", path.display()))?,
        None => JourneyConfig::default(),
    };
    let segments = config.world.path.segment_count;
    let titles = environments::titles(segments as usize);
    let environments =
        ThemedEnvironment::sequence(segments, config.world.path.segment_length, args.seed);
    let mut journey = Journey::new(&config, environments)?;

    match args.actor_model.clone() {
        Some(path) => journey.attach_actor_asset_receiver(loader::spawn(path)),
        None => journey.set_actor_model(Ok(ActorModel::Fallback)),
    }
    journey.begin();
    info!(segments, seed = args.seed, headless = args.headless, "journey ready");

    if args.headless {
        run_headless(journey, args.frames, &titles);
        return Ok(());
    }

    let sky = Atmosphere::new(config.atmosphere.clone()).state();
    let presentation = Presentation::new("Skyride", scene::initial(&journey, sky));
    MacroquadBackend::new()
        .with_vsync(args.vsync)
        .with_show_fps(args.show_fps)
        .run(presentation, move |dt, input, scene| {
            let simulation_start = Instant::now();
            if input.pause_toggle {
                match query::play_mode(journey.world()) {
                    PlayMode::Flying => journey.pause(),
                    PlayMode::Paused => journey.resume(),
                    _ => {}
                }
            }
            if input.skip_to_finale {
                journey.skip_to_finale();
            }
            if input.shake {
                journey.shake_camera(SHAKE_AMOUNT);
            }
            let Some(report) = journey.tick(dt) else {
                return FrameSimulationBreakdown::default();
            };
            log_events(&report.events, &titles);
            let simulation = simulation_start.elapsed();

            let population_start = Instant::now();
            scene::sync(scene, &journey, &report, &titles);
            FrameSimulationBreakdown {
                simulation,
                scene_population: population_start.elapsed(),
            }
        })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn run_headless(mut journey: Journey<ThemedEnvironment>, frames: u32, titles: &[String]) {
    for frame in 0..frames {
        let Some(report) = journey.tick(REFERENCE_FRAME) else {
            break;
        };
        log_events(&report.events, titles);
        if report.events.contains(&Event::HandoffRequested) {
            info!(frame, "stopping at handoff");
            break;
        }
    }

    let world = journey.world();
    info!(
        progress = query::progress(world),
        segment = query::current_segment(world).get(),
        gates = journey.gates().fired_count(),
        populated = journey
            .registry()
            .slots()
            .iter()
            .filter(|slot| slot.state().is_populated())
            .count(),
        "headless run finished"
    );
    journey.dispose();
}

fn log_events(events: &[Event], titles: &[String]) {
    for event in events {
        match event {
            Event::SegmentEntered { segment } => info!(
                segment = segment.get(),
                title = titles.get(segment.as_usize()).map_or("", String::as_str),
                "entered segment"
            ),
            Event::GateOpened { gate, .. } => debug!(gate = gate.get(), "gate opened"),
            Event::FinaleTriggered { cause } => info!(?cause, "finale"),
            Event::HandoffRequested => info!("handoff requested"),
            _ => {}
        }
    }
}
