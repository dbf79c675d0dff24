//! Cosmetic one-shot timers keyed on simulated time.

use std::time::Duration;

use skyride_core::SegmentIndex;

/// Deferred effect applied when a timer comes due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TimerAction {
    /// Removes a segment title from display.
    ExpireAnnouncement { segment: SegmentIndex },
    /// Surrenders control after the finale cinematic.
    Handoff,
}

#[derive(Clone, Copy, Debug)]
struct ScheduledTimer {
    due: Duration,
    sequence: u64,
    action: TimerAction,
}

/// Pending timers ordered by due time, ties broken by scheduling order.
#[derive(Clone, Debug, Default)]
pub(crate) struct TimerQueue {
    pending: Vec<ScheduledTimer>,
    next_sequence: u64,
}

impl TimerQueue {
    pub(crate) fn schedule(&mut self, due: Duration, action: TimerAction) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.pending.push(ScheduledTimer {
            due,
            sequence,
            action,
        });
    }

    /// Drops every pending timer matching the predicate.
    pub(crate) fn cancel_where<F>(&mut self, mut matches: F)
    where
        F: FnMut(&TimerAction) -> bool,
    {
        self.pending.retain(|timer| !matches(&timer.action));
    }

    pub(crate) fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Removes and returns every timer due at or before `now`, in firing order.
    pub(crate) fn drain_due(&mut self, now: Duration) -> Vec<TimerAction> {
        let mut due: Vec<ScheduledTimer> = Vec::new();
        self.pending.retain(|timer| {
            if timer.due <= now {
                due.push(*timer);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|timer| (timer.due, timer.sequence));
        due.into_iter().map(|timer| timer.action).collect()
    }
}
