//! Translates journey frames into renderer scene descriptions.

use skyride_core::{Event, PROGRESS_CAP};
use skyride_engine::{FrameReport, Journey};
use skyride_rendering::{
    ActorPresentation, AtmospherePresentation, Color, EnvironmentPresentation, GatePresentation,
    MarkerPresentation, Scene, SceneCamera,
};
use skyride_system_atmosphere::AtmosphereState;
use skyride_system_pose::ActorModel;
use skyride_world::{path::FlightPath, query};

use crate::environments::ThemedEnvironment;

const TRACE_SAMPLES: usize = 240;

/// Points along the path, used to draw its faint trace.
pub(crate) fn path_trace(path: &FlightPath) -> Vec<glam::Vec3> {
    (0..=TRACE_SAMPLES)
        .map(|index| path.position_at(index as f32 / TRACE_SAMPLES as f32 * PROGRESS_CAP))
        .collect()
}

pub(crate) fn atmosphere(state: AtmosphereState) -> AtmospherePresentation {
    AtmospherePresentation {
        background: Color::from_rgb(state.background),
        fog: Color::from_rgb(state.fog),
        fog_density: state.fog_density,
    }
}

/// Builds the first scene before any frame has been ticked.
pub(crate) fn initial(journey: &Journey<ThemedEnvironment>, sky: AtmosphereState) -> Scene {
    let path = query::path(journey.world());
    let start = path.position_at(0.0);
    let camera = SceneCamera::new(start + glam::Vec3::new(0.0, 6.0, 12.0), start);
    let mut scene = Scene::new(camera, atmosphere(sky));
    scene.path_trace = path_trace(path);
    scene
}

/// Copies a ticked frame into `scene`.
pub(crate) fn sync(
    scene: &mut Scene,
    journey: &Journey<ThemedEnvironment>,
    report: &FrameReport,
    titles: &[String],
) {
    let world = journey.world();
    scene.camera = SceneCamera {
        position: report.camera.position,
        target: report.camera.look_at,
        ..scene.camera
    };

    let fallback = matches!(journey.actor_asset().model(), Some(ActorModel::Fallback));
    scene.actor = report.actor.map(|pose| ActorPresentation {
        position: pose.position,
        orientation: pose.orientation,
        animation_time: pose.animation_time,
        fallback,
    });

    scene.environments = journey
        .registry()
        .visible()
        .map(|slot| EnvironmentPresentation {
            segment: slot.index(),
            props: slot.environment().props().to_vec(),
        })
        .collect();

    scene.gates = query::gates(world)
        .iter()
        .map(|gate| GatePresentation {
            position: gate.position(),
            facing: gate.facing(),
            scale: gate.scale(),
            open: gate.is_open(),
        })
        .collect();
    scene.markers = query::markers(world)
        .iter()
        .map(|marker| MarkerPresentation {
            position: marker.position(),
            facing: marker.facing(),
        })
        .collect();

    scene.atmosphere = atmosphere(report.atmosphere);
    scene.announcement =
        query::announcement(world).and_then(|segment| titles.get(segment.as_usize()).cloned());

    for event in &report.events {
        if let Event::BurstRequested { position } = event {
            scene.bursts.spawn(*position);
        }
    }
    scene.bursts.update(report.clock.delta());

    scene.progress = report.progress;
    scene.play_mode = report.play_mode;
}
