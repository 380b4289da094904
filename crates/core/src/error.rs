//! Domain errors surfaced to the initiating user action.

use std::fmt;

use thiserror::Error;

/// What kind of record a failed lookup was searching for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    /// Catalog chassis.
    Chassis,
    /// Preset pattern inside a chassis.
    Pattern,
    /// User-saved mech pattern.
    CustomPattern,
    /// Other-entity category.
    Category,
    /// Other-entity template inside a category.
    Template,
    /// Catalog system.
    System,
    /// Catalog module.
    Module,
    /// Live entity in the session.
    Entity,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LookupKind::Chassis => "chassis",
            LookupKind::Pattern => "pattern",
            LookupKind::CustomPattern => "custom pattern",
            LookupKind::Category => "category",
            LookupKind::Template => "template",
            LookupKind::System => "system",
            LookupKind::Module => "module",
            LookupKind::Entity => "entity",
        };
        f.write_str(label)
    }
}

/// Slot pool a component draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// System slots.
    System,
    /// Module slots.
    Module,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::System => f.write_str("system"),
            SlotKind::Module => f.write_str("module"),
        }
    }
}

/// Failures that abort a single tracker mutation without touching session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// A catalog or session lookup missed.
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Record kind that was searched.
        kind: LookupKind,
        /// Key that missed.
        name: String,
    },
    /// Attaching a component would exceed the available slots.
    #[error("not enough {slot} slots: {used} used + {required} required exceeds {capacity}")]
    OutOfBudget {
        /// Pool that would overflow.
        slot: SlotKind,
        /// Slots the component needs.
        required: u32,
        /// Slots already in use.
        used: u32,
        /// Total slots available.
        capacity: u32,
    },
}

impl TrackerError {
    pub(crate) fn not_found(kind: LookupKind, name: impl Into<String>) -> Self {
        TrackerError::NotFound {
            kind,
            name: name.into(),
        }
    }
}
