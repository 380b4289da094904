#![allow(missing_docs)]

//! Live session: entity list, saved patterns, add-entity dialog and turn tracking.

mod selection;
mod sort;
mod state;
mod tracker;

pub use selection::{AddEntitySelection, ChassisChoice, SelectionKind};
pub use sort::{display_order, sort_entities, SortScheduler};
pub use state::{Changes, SessionEvent, SessionState, Tab};
pub use tracker::Tracker;
