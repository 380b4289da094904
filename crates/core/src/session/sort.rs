use std::{
    cmp::Ordering,
    time::{Duration, Instant},
};

use crate::entity::Entity;

/// Debounce timer for the cosmetic re-sort.
///
/// Every event restarts the countdown; the sort fires once after `delay` of
/// quiet.
#[derive(Debug, Clone)]
pub struct SortScheduler {
    delay: Duration,
    deadline: Option<Instant>,
}

impl SortScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Cancel any pending sort and restart the countdown from `now`. A delay
    /// too large to add to `now` leaves nothing scheduled.
    pub fn touch(&mut self, now: Instant) {
        self.deadline = now.checked_add(self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// `true` exactly once when the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Palette order first, then case-insensitive name.
pub fn display_order(a: &Entity, b: &Entity) -> Ordering {
    a.group_color
        .index()
        .cmp(&b.group_color.index())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

/// Stable in-place sort by [`display_order`].
pub fn sort_entities(entities: &mut [Entity]) {
    entities.sort_by(display_order);
}
