//! Opaque identifiers for live entities and saved patterns.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Identifier of a live entity. Later entities always compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

/// Identifier of a saved custom mech pattern. Assigned once, never reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hands out creation-time tokens that stay unique within a session.
///
/// Tokens are millisecond timestamps bumped past the previous token when two
/// requests land in the same millisecond.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    last: u64,
}

impl IdGenerator {
    /// Create a generator that will never return a token `<= floor`.
    pub fn starting_after(floor: u64) -> Self {
        Self { last: floor }
    }

    /// Raise the floor so reloaded ids are never handed out again.
    pub fn observe(&mut self, token: u64) {
        self.last = self.last.max(token);
    }

    fn next_token(&mut self) -> u64 {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.last = now.max(self.last + 1);
        self.last
    }

    /// Fresh entity id.
    pub fn entity(&mut self) -> EntityId {
        EntityId(self.next_token())
    }

    /// Fresh pattern id.
    pub fn pattern(&mut self) -> PatternId {
        PatternId(self.next_token())
    }
}
