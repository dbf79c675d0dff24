use glam::Vec3;
use skyride_core::{Event, FinaleCause, FrameClock};
use skyride_system_pose::{ActorModel, ActorPoseSolver, AssetSlot, Config};
use skyride_world::path::{FlightPath, PathConfig};

const DT: f32 = 1.0 / 60.0;

fn line_towards(direction: Vec3) -> FlightPath {
    let points = (0..=10).map(|step| Vec3::new(0.0, 5.0, 0.0) + direction * (10.0 * step as f32));
    FlightPath::from_waypoints(points.collect(), 0.1)
}

fn ready_solver() -> ActorPoseSolver {
    let mut solver = ActorPoseSolver::new(Config::default());
    solver.finish_loading(Ok(ActorModel::Loaded {
        name: "dragon".into(),
        byte_len: 1024,
        clip_count: 2,
    }));
    solver
}

fn reached() -> Event {
    Event::FinaleTriggered {
        cause: FinaleCause::Reached,
    }
}

#[test]
fn pending_model_produces_no_pose() {
    let path = line_towards(Vec3::NEG_Z);
    let mut solver = ActorPoseSolver::new(Config::default());
    assert!(solver.update(&path, 0.3, FrameClock::new(0.0, DT)).is_none());
    assert_eq!(solver.asset(), &AssetSlot::Pending);

    solver.finish_loading(Ok(ActorModel::Fallback));
    let pose = solver
        .update(&path, 0.3, FrameClock::new(DT, DT))
        .expect("model is ready");
    assert!((pose.animation_time - DT).abs() < 1e-6, "animation waits for the model");
}

#[test]
fn failed_load_recovers_with_fallback() {
    let path = line_towards(Vec3::NEG_Z);
    let mut solver = ActorPoseSolver::new(Config::default());
    solver.finish_loading(Err("asset missing".into()));
    assert_eq!(solver.asset(), &AssetSlot::Failed("asset missing".into()));

    assert!(solver.update(&path, 0.1, FrameClock::new(0.0, DT)).is_some());
    assert_eq!(solver.asset(), &AssetSlot::Ready(ActorModel::Fallback));
}

#[test]
fn first_pose_snaps_onto_the_path() {
    let path = line_towards(Vec3::NEG_Z);
    let mut solver = ready_solver();
    let pose = solver
        .update(&path, 0.5, FrameClock::new(0.0, DT))
        .expect("pose");

    assert!(pose.position.distance(Vec3::new(0.0, 7.0, -50.0)) < 0.06, "{pose:?}");
    assert!((pose.orientation * Vec3::NEG_Z).distance(Vec3::NEG_Z) < 1e-3);
    assert!(pose.roll.abs() < 0.01, "straight flight does not bank");
}

#[test]
fn sampling_is_capped_below_the_end() {
    let path = FlightPath::build(&PathConfig::default());
    let mut capped = ready_solver();
    let mut past_end = ready_solver();
    let clock = FrameClock::new(0.0, DT);

    let at_cap = capped.update(&path, 0.998, clock).expect("pose");
    let beyond = past_end.update(&path, 1.0, clock).expect("pose");
    assert_eq!(at_cap.position, beyond.position);
}

#[test]
fn heading_eases_toward_a_new_direction() {
    let mut solver = ready_solver();
    let _ = solver.update(&line_towards(Vec3::NEG_Z), 0.5, FrameClock::new(0.0, DT));
    let pose = solver
        .update(&line_towards(Vec3::X), 0.5, FrameClock::new(DT, DT))
        .expect("pose");

    let forward = pose.orientation * Vec3::NEG_Z;
    let angle_to_target = forward.angle_between(Vec3::X);
    let expected = 0.92 * std::f32::consts::FRAC_PI_2;
    assert!(
        (angle_to_target - expected).abs() < 0.01,
        "angle to target was {angle_to_target}"
    );
}

#[test]
fn banking_stays_within_limits_along_the_full_path() {
    let path = FlightPath::build(&PathConfig::default());
    let mut solver = ready_solver();
    let mut largest: f32 = 0.0;

    for frame in 0..3_000 {
        let progress = frame as f32 / 3_000.0;
        let pose = solver
            .update(&path, progress, FrameClock::new(frame as f32 * DT, DT))
            .expect("pose");
        assert!(pose.roll.abs() <= 0.6 + 1e-6);
        assert!(pose.position.is_finite());
        largest = largest.max(pose.roll.abs());
    }
    assert!(largest > 0.05, "winding path should bank, largest roll {largest}");
}

#[test]
fn reached_finale_drops_the_actor_under_gravity() {
    let path = line_towards(Vec3::NEG_Z);
    let mut solver = ready_solver();
    let origin = solver
        .update(&path, 0.5, FrameClock::new(0.0, DT))
        .expect("pose")
        .position;

    solver.handle(&[reached()]);
    assert!(solver.is_descending());

    let mut pose = None;
    for frame in 1..=60 {
        pose = solver.update(&path, 0.9, FrameClock::new(frame as f32 * DT, DT));
    }
    let pose = pose.expect("pose");
    assert!((pose.position.y - (origin.y - 7.5)).abs() < 0.05, "{pose:?}");
    assert!((pose.position.z - (origin.z - 5.0)).abs() < 0.05, "{pose:?}");
    assert!((pose.position.x - origin.x).abs() < 1e-4);
}

#[test]
fn skipped_finale_keeps_following_the_path() {
    let path = line_towards(Vec3::NEG_Z);
    let mut solver = ready_solver();
    let _ = solver.update(&path, 0.2, FrameClock::new(0.0, DT));
    solver.handle(&[Event::FinaleTriggered {
        cause: FinaleCause::Skipped,
    }]);
    assert!(!solver.is_descending());
}

#[test]
fn descent_requested_before_the_first_pose_starts_from_the_path() {
    let path = line_towards(Vec3::NEG_Z);
    let mut solver = ActorPoseSolver::new(Config::default());
    solver.handle(&[reached()]);
    solver.finish_loading(Ok(ActorModel::Fallback));

    let first = solver
        .update(&path, 0.5, FrameClock::new(0.0, DT))
        .expect("pose");
    assert!(first.position.distance(Vec3::new(0.0, 7.0, -50.0)) < 0.06);

    let second = solver
        .update(&path, 0.5, FrameClock::new(DT, DT))
        .expect("pose");
    assert!(second.position.y < first.position.y);
}
