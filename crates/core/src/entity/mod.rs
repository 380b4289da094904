#![allow(missing_docs)]

//! Live entity records, their construction and in-place mutation.

pub mod factory;
mod models;
mod record;
pub mod mutator;

pub use factory::{EntityFactory, EntityRequest, MapBounds, BLANK_MECH_NAME};
pub use models::{
    Component, ComponentKind, Condition, Entity, EntityKind, Gauge, GroupColor, Pilot, Position,
    Stat,
};
pub use mutator::{duplicate_entity, duplicate_name, FieldUpdate, PilotPatch};
