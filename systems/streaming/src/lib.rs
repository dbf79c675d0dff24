#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Windowed streaming of environment content along the path.
//!
//! Each themed segment owns an [`Environment`] that is populated lazily the
//! first time the actor approaches it. Populated environments stay resident
//! for the rest of the session but only those within one segment of the
//! current one are attached to the scene root, bounding per-frame cost no
//! matter how long the path is.

use std::collections::BTreeSet;

use skyride_core::{segment_for, FrameClock, SegmentIndex};
use tracing::{debug, trace};

/// Decorative content for one themed segment.
///
/// Implementations own their objects outright; the registry never sees
/// anything beyond these calls.
pub trait Environment {
    /// Builds the environment's content. Called at most once per session.
    fn populate(&mut self);

    /// Advances decorative animation while the environment is visible.
    fn update(&mut self, clock: FrameClock, local_progress: f32, is_current: bool);

    /// Releases everything created by [`Environment::populate`].
    fn dispose(&mut self);

    /// Number of objects currently owned by the environment.
    fn content_len(&self) -> usize;
}

/// Scene graph host that environment content is inserted into.
pub trait SceneRoot {
    /// Inserts the content of a segment into the active scene.
    fn attach(&mut self, segment: SegmentIndex);

    /// Removes the content of a segment from the active scene.
    fn detach(&mut self, segment: SegmentIndex);
}

/// Scene root that tracks which segments are attached.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AttachedSet {
    attached: BTreeSet<SegmentIndex>,
}

impl AttachedSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports whether the provided segment is attached.
    #[must_use]
    pub fn contains(&self, segment: SegmentIndex) -> bool {
        self.attached.contains(&segment)
    }

    /// Number of attached segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attached.len()
    }

    /// Reports whether nothing is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }

    /// Attached segments in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = SegmentIndex> + '_ {
        self.attached.iter().copied()
    }
}

impl SceneRoot for AttachedSet {
    fn attach(&mut self, segment: SegmentIndex) {
        let _ = self.attached.insert(segment);
    }

    fn detach(&mut self, segment: SegmentIndex) {
        let _ = self.attached.remove(&segment);
    }
}

/// Lifecycle state of an environment slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvironmentState {
    /// Content has not been built yet.
    Dormant,
    /// Content exists but is detached from the scene.
    PopulatedHidden,
    /// Content exists and is attached to the scene.
    PopulatedVisible,
}

impl EnvironmentState {
    /// Reports whether content has been built.
    #[must_use]
    pub const fn is_populated(self) -> bool {
        !matches!(self, Self::Dormant)
    }
}

/// Registry entry describing one themed segment.
#[derive(Debug)]
pub struct EnvironmentSlot<E> {
    index: SegmentIndex,
    base_offset: f32,
    state: EnvironmentState,
    environment: E,
}

impl<E> EnvironmentSlot<E> {
    /// Segment the environment belongs to.
    #[must_use]
    pub const fn index(&self) -> SegmentIndex {
        self.index
    }

    /// Forward distance from the path origin to the start of the segment.
    #[must_use]
    pub const fn base_offset(&self) -> f32 {
        self.base_offset
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EnvironmentState {
        self.state
    }

    /// Read-only access to the environment.
    #[must_use]
    pub const fn environment(&self) -> &E {
        &self.environment
    }
}

/// Ordered environments with a one-segment visibility window.
#[derive(Debug)]
pub struct EnvironmentRegistry<E> {
    slots: Vec<EnvironmentSlot<E>>,
    current: Option<SegmentIndex>,
    disposed: bool,
}

impl<E: Environment> EnvironmentRegistry<E> {
    /// Creates a registry with every environment dormant.
    ///
    /// Environments are indexed by their position in `environments`.
    #[must_use]
    pub fn new(environments: Vec<E>, segment_length: f32) -> Self {
        let slots = environments
            .into_iter()
            .enumerate()
            .map(|(index, environment)| EnvironmentSlot {
                index: SegmentIndex::new(index as u32),
                base_offset: index as f32 * segment_length,
                state: EnvironmentState::Dormant,
                environment,
            })
            .collect();

        Self {
            slots,
            current: None,
            disposed: false,
        }
    }

    /// Number of environments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Reports whether the registry holds no environments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots in segment order.
    #[must_use]
    pub fn slots(&self) -> &[EnvironmentSlot<E>] {
        &self.slots
    }

    /// State of a segment's environment, or `None` when out of range.
    #[must_use]
    pub fn state(&self, segment: SegmentIndex) -> Option<EnvironmentState> {
        self.slots.get(segment.as_usize()).map(EnvironmentSlot::state)
    }

    /// Segment chosen as current by the most recent update.
    #[must_use]
    pub const fn current(&self) -> Option<SegmentIndex> {
        self.current
    }

    /// Slots whose content is attached to the scene.
    pub fn visible(&self) -> impl Iterator<Item = &EnvironmentSlot<E>> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.state == EnvironmentState::PopulatedVisible)
    }

    /// Number of slots whose content is attached to the scene.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    /// Reports whether [`EnvironmentRegistry::dispose`] has run.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Refreshes residency and visibility for the provided segment-space progress.
    ///
    /// `segment_progress` spans `[0, 1]` across all segments. The current and
    /// next segments are populated and shown, populated segments within one
    /// of the current are kept visible, and the rest are hidden.
    pub fn update<R: SceneRoot>(&mut self, segment_progress: f32, clock: FrameClock, root: &mut R) {
        if self.disposed || self.slots.is_empty() {
            return;
        }

        let count = self.slots.len() as u32;
        let current = segment_for(segment_progress, count);
        let local_progress =
            (segment_progress.max(0.0) * count as f32 - current.get() as f32).clamp(0.0, 1.0);

        if self.current != Some(current) {
            debug!(segment = current.get(), "streaming window moved");
            self.current = Some(current);
        }

        self.activate(current, root);
        self.activate(current.next(), root);

        for slot in &mut self.slots {
            if !slot.state.is_populated() {
                continue;
            }
            let within_window = slot.index.get().abs_diff(current.get()) <= 1;
            match (slot.state, within_window) {
                (EnvironmentState::PopulatedHidden, true) => {
                    root.attach(slot.index);
                    slot.state = EnvironmentState::PopulatedVisible;
                    trace!(segment = slot.index.get(), "environment shown");
                }
                (EnvironmentState::PopulatedVisible, false) => {
                    root.detach(slot.index);
                    slot.state = EnvironmentState::PopulatedHidden;
                    trace!(segment = slot.index.get(), "environment hidden");
                }
                _ => {}
            }
        }

        for slot in &mut self.slots {
            if slot.state == EnvironmentState::PopulatedVisible {
                let is_current = slot.index == current;
                slot.environment.update(clock, local_progress, is_current);
            }
        }
    }

    /// Detaches and releases every populated environment.
    ///
    /// Later calls, including further updates, do nothing.
    pub fn dispose<R: SceneRoot>(&mut self, root: &mut R) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        for slot in &mut self.slots {
            if slot.state == EnvironmentState::PopulatedVisible {
                root.detach(slot.index);
            }
            if slot.state.is_populated() {
                slot.environment.dispose();
                slot.state = EnvironmentState::Dormant;
            }
        }
        debug!(environments = self.slots.len(), "environments disposed");
    }

    /// Populates (once) and shows the segment at `segment`, ignoring indices past the end.
    fn activate<R: SceneRoot>(&mut self, segment: SegmentIndex, root: &mut R) {
        let Some(slot) = self.slots.get_mut(segment.as_usize()) else {
            return;
        };

        if slot.state == EnvironmentState::Dormant {
            slot.environment.populate();
            slot.state = EnvironmentState::PopulatedHidden;
            debug!(
                segment = segment.get(),
                objects = slot.environment.content_len(),
                "environment populated"
            );
        }

        if slot.state == EnvironmentState::PopulatedHidden {
            root.attach(segment);
            slot.state = EnvironmentState::PopulatedVisible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Stub {
        objects: usize,
    }

    impl Environment for Stub {
        fn populate(&mut self) {
            self.objects = 3;
        }

        fn update(&mut self, _clock: FrameClock, _local_progress: f32, _is_current: bool) {}

        fn dispose(&mut self) {
            self.objects = 0;
        }

        fn content_len(&self) -> usize {
            self.objects
        }
    }

    #[test]
    fn base_offsets_follow_segment_length() {
        let registry = EnvironmentRegistry::new(vec![Stub::default(), Stub::default()], 120.0);
        let offsets: Vec<f32> = registry.slots().iter().map(|slot| slot.base_offset()).collect();
        assert_eq!(offsets, vec![0.0, 120.0]);
    }

    #[test]
    fn look_ahead_past_the_last_segment_is_ignored() {
        let mut registry = EnvironmentRegistry::new(vec![Stub::default(), Stub::default()], 1.0);
        let mut root = AttachedSet::new();
        registry.update(1.0, FrameClock::default(), &mut root);
        assert_eq!(registry.current(), Some(SegmentIndex::new(1)));
        assert_eq!(root.len(), 2);
        assert_eq!(registry.state(SegmentIndex::new(2)), None);
    }

    #[test]
    fn empty_registry_updates_quietly() {
        let mut registry: EnvironmentRegistry<Stub> = EnvironmentRegistry::new(Vec::new(), 1.0);
        let mut root = AttachedSet::new();
        registry.update(0.5, FrameClock::default(), &mut root);
        assert!(root.is_empty());
        assert_eq!(registry.current(), None);
    }
}
