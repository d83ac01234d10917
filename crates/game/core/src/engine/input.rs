use arrayvec::ArrayVec;

use crate::state::{CardinalDirection, Timestamp};

/// Held directional inputs plus the movement cooldown.
///
/// The most recently pressed direction that is still held wins, so letting
/// go of a later key falls back to the one still held underneath it.
#[derive(Clone, Debug, Default)]
pub struct InputTracker {
    held: ArrayVec<CardinalDirection, 4>,
    last_attempt: Option<Timestamp>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, direction: CardinalDirection) {
        self.held.retain(|held| *held != direction);
        self.held.push(direction);
    }

    pub fn release(&mut self, direction: CardinalDirection) {
        self.held.retain(|held| *held != direction);
    }

    pub fn current(&self) -> Option<CardinalDirection> {
        self.held.last().copied()
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.last_attempt = None;
    }

    /// True when the cooldown since the previous attempt has elapsed.
    pub fn ready(&self, now: Timestamp, cooldown_ms: u64) -> bool {
        self.last_attempt
            .is_none_or(|last| now.since(last) >= cooldown_ms)
    }

    pub fn mark_attempt(&mut self, now: Timestamp) {
        self.last_attempt = Some(now);
    }
}
