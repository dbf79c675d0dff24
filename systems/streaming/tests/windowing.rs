use std::{cell::RefCell, rc::Rc};

use skyride_core::{FrameClock, SegmentIndex};
use skyride_system_streaming::{
    AttachedSet, Environment, EnvironmentRegistry, EnvironmentState, SceneRoot,
};

#[derive(Debug, Default)]
struct Counters {
    populated: Vec<u32>,
    disposed: Vec<u32>,
    updates: Vec<(u32, bool)>,
}

#[derive(Debug)]
struct CountingEnvironment {
    segment: u32,
    objects: Vec<u32>,
    counters: Rc<RefCell<Counters>>,
}

impl Environment for CountingEnvironment {
    fn populate(&mut self) {
        self.objects = (0..4).collect();
        self.counters.borrow_mut().populated.push(self.segment);
    }

    fn update(&mut self, _clock: FrameClock, _local_progress: f32, is_current: bool) {
        self.counters
            .borrow_mut()
            .updates
            .push((self.segment, is_current));
    }

    fn dispose(&mut self) {
        self.objects.clear();
        self.counters.borrow_mut().disposed.push(self.segment);
    }

    fn content_len(&self) -> usize {
        self.objects.len()
    }
}

fn registry(count: u32) -> (EnvironmentRegistry<CountingEnvironment>, Rc<RefCell<Counters>>) {
    let counters = Rc::new(RefCell::new(Counters::default()));
    let environments = (0..count)
        .map(|segment| CountingEnvironment {
            segment,
            objects: Vec::new(),
            counters: Rc::clone(&counters),
        })
        .collect();
    (EnvironmentRegistry::new(environments, 120.0), counters)
}

fn assert_window(registry: &EnvironmentRegistry<CountingEnvironment>, root: &AttachedSet) {
    let current = registry.current().map(|segment| segment.get()).unwrap_or(0);
    assert!(registry.visible_count() <= 3, "window grew past three");
    for slot in registry.visible() {
        assert!(
            slot.index().get().abs_diff(current) <= 1,
            "segment {} visible while current is {current}",
            slot.index().get()
        );
        assert!(root.contains(slot.index()), "visible slot missing from root");
    }
    assert_eq!(root.len(), registry.visible_count(), "root out of sync");

    for slot in registry.slots() {
        let populated = slot.state() != EnvironmentState::Dormant;
        assert_eq!(
            slot.environment().content_len() > 0,
            populated,
            "content must exist exactly when populated"
        );
    }
}

#[test]
fn window_stays_bounded_across_a_full_traversal() {
    let (mut registry, _) = registry(6);
    let mut root = AttachedSet::new();

    for step in 0..=600 {
        let progress = step as f32 / 600.0;
        registry.update(progress, FrameClock::new(step as f32 / 60.0, 1.0 / 60.0), &mut root);
        assert_window(&registry, &root);
    }

    assert_eq!(registry.current(), Some(SegmentIndex::new(5)));
}

#[test]
fn first_update_populates_current_and_next() {
    let (mut registry, counters) = registry(6);
    let mut root = AttachedSet::new();
    registry.update(0.0, FrameClock::default(), &mut root);

    assert_eq!(counters.borrow().populated, vec![0, 1]);
    assert_eq!(
        root.iter().collect::<Vec<_>>(),
        vec![SegmentIndex::new(0), SegmentIndex::new(1)]
    );
    assert_eq!(
        registry.state(SegmentIndex::new(2)),
        Some(EnvironmentState::Dormant)
    );
}

#[test]
fn repeated_updates_never_repopulate() {
    let (mut registry, counters) = registry(6);
    let mut root = AttachedSet::new();

    for _ in 0..1000 {
        registry.update(0.4, FrameClock::default(), &mut root);
    }

    let populated = counters.borrow().populated.clone();
    assert_eq!(populated, vec![2, 3], "each touched environment populates once");
}

#[test]
fn hidden_environments_keep_their_content() {
    let (mut registry, counters) = registry(6);
    let mut root = AttachedSet::new();

    registry.update(0.0, FrameClock::default(), &mut root);
    registry.update(0.5, FrameClock::default(), &mut root);

    assert_eq!(
        registry.state(SegmentIndex::new(0)),
        Some(EnvironmentState::PopulatedHidden)
    );
    assert!(!root.contains(SegmentIndex::new(0)));
    assert_eq!(registry.slots()[0].environment().content_len(), 4);

    registry.update(0.1, FrameClock::default(), &mut root);
    assert_eq!(
        registry.state(SegmentIndex::new(0)),
        Some(EnvironmentState::PopulatedVisible)
    );
    assert!(root.contains(SegmentIndex::new(0)));
    assert_eq!(
        counters
            .borrow()
            .populated
            .iter()
            .filter(|segment| **segment == 0)
            .count(),
        1,
        "showing again must not rebuild content"
    );
}

#[test]
fn only_visible_environments_animate_and_one_is_current() {
    let (mut registry, counters) = registry(6);
    let mut root = AttachedSet::new();
    for progress in [0.0, 0.35, 0.5] {
        registry.update(progress, FrameClock::default(), &mut root);
    }
    counters.borrow_mut().updates.clear();

    registry.update(0.5, FrameClock::default(), &mut root);
    let updates = counters.borrow().updates.clone();
    assert_eq!(updates, vec![(2, false), (3, true), (4, false)]);
}

#[test]
fn dispose_releases_everything_once() {
    let (mut registry, counters) = registry(6);
    let mut root = AttachedSet::new();
    for progress in [0.0, 0.35, 0.6] {
        registry.update(progress, FrameClock::default(), &mut root);
    }

    registry.dispose(&mut root);
    registry.dispose(&mut root);

    let disposed = counters.borrow().disposed.clone();
    assert_eq!(disposed, vec![0, 1, 2, 3, 4]);
    assert!(root.is_empty(), "disposal detaches every segment");
    assert!(registry.is_disposed());

    registry.update(0.9, FrameClock::default(), &mut root);
    assert!(root.is_empty(), "updates after disposal are ignored");
    assert_eq!(counters.borrow().populated.len(), 5);
}

#[derive(Debug, Default)]
struct RecordingRoot {
    log: Vec<(bool, u32)>,
}

impl SceneRoot for RecordingRoot {
    fn attach(&mut self, segment: SegmentIndex) {
        self.log.push((true, segment.get()));
    }

    fn detach(&mut self, segment: SegmentIndex) {
        self.log.push((false, segment.get()));
    }
}

#[test]
fn steady_state_does_not_touch_the_scene_root() {
    let (mut registry, _) = registry(4);
    let mut root = RecordingRoot::default();
    registry.update(0.3, FrameClock::default(), &mut root);
    let initial = root.log.len();

    for _ in 0..50 {
        registry.update(0.3, FrameClock::default(), &mut root);
    }
    assert_eq!(root.log.len(), initial, "no churn while the window is stable");
}
