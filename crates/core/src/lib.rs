#![warn(clippy::all, missing_docs)]

//! Core domain logic for the Salvage Union combat tracker.
//!
//! This crate hosts the equipment catalog, entity construction and mutation,
//! custom mech patterns, the session state machine and its persistence
//! layer. The terminal UI is a thin shell over [`Tracker`].

pub mod builder;
pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod ids;
pub mod loadout;
pub mod pattern;
pub mod session;
pub mod storage;

pub use builder::MechBuild;
pub use catalog::Catalog;
pub use config::AppConfig;
pub use entity::{Entity, EntityFactory, EntityRequest};
pub use error::{LookupKind, SlotKind, TrackerError};
pub use ids::{EntityId, IdGenerator, PatternId};
pub use pattern::{CustomMechPattern, PatternDraft};
pub use session::{SessionEvent, SessionState, Tab, Tracker};
pub use storage::{FileStorage, MemoryStorage, Storage};
