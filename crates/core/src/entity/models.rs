use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, PatternId};

use super::record::{EntityRecord, PilotRecord};

/// Damage state of an attached system, module or ability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    Normal,
    Damaged,
    Destroyed,
}

impl Condition {
    /// Next state in the fixed `normal → damaged → destroyed → normal` cycle.
    pub fn next(self) -> Self {
        match self {
            Condition::Normal => Condition::Damaged,
            Condition::Damaged => Condition::Destroyed,
            Condition::Destroyed => Condition::Normal,
        }
    }
}

/// Named component slot with its current condition.
///
/// Reads accept either a bare name or a `{name, condition}` object; bare names
/// are upgraded to a normal-condition component immediately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ComponentRepr")]
pub struct Component {
    pub name: String,
    pub condition: Condition,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: Condition::Normal,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ComponentRepr {
    Bare(String),
    Tagged {
        name: String,
        #[serde(default)]
        condition: Condition,
    },
}

impl From<ComponentRepr> for Component {
    fn from(repr: ComponentRepr) -> Self {
        match repr {
            ComponentRepr::Bare(name) => Component::new(name),
            ComponentRepr::Tagged { name, condition } => Component { name, condition },
        }
    }
}

/// Which component list of an entity an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    System,
    Module,
    Ability,
}

/// Runtime entity discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Mech,
    Other,
}

/// Tracked stat on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    /// Structure points.
    Sp,
    /// Energy points.
    Ep,
    Heat,
    /// Hit points.
    Hp,
}

/// A current/max pair. `current` never leaves `[0, max]`.
///
/// Stored records keep the pair flat (`sp`/`maxSp`), see `record.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gauge {
    current: u32,
    max: u32,
}

impl Gauge {
    /// Gauge with `current == max`.
    pub fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Gauge starting at zero.
    pub fn empty(max: u32) -> Self {
        Self { current: 0, max }
    }

    /// Gauge with an explicit starting value, clamped into range.
    pub fn with_current(current: i64, max: u32) -> Self {
        let mut gauge = Self::empty(max);
        gauge.set_current(current);
        gauge
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Rebuild from a stored `current`/`max` pair. A lone value counts as
    /// both; out-of-range values are clamped.
    pub(crate) fn from_pair(current: Option<i64>, max: Option<i64>) -> Option<Self> {
        let max = max.or(current)?;
        let max = u32::try_from(max.max(0)).unwrap_or(u32::MAX);
        Some(Self::with_current(current.unwrap_or(i64::from(max)), max))
    }

    /// Set the current value, clamping into `[0, max]`.
    pub fn set_current(&mut self, value: i64) {
        self.current = value.clamp(0, i64::from(self.max)) as u32;
    }

    /// Set the maximum. Current is pulled down if it would exceed the new max.
    pub fn set_max(&mut self, max: u32) {
        self.max = max;
        self.current = self.current.min(max);
    }
}

/// Pilot aboard a mech.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PilotRecord", into = "PilotRecord")]
pub struct Pilot {
    pub name: String,
    pub hp: Gauge,
    /// Ability points.
    pub ap: Gauge,
}

impl Default for Pilot {
    fn default() -> Self {
        Self {
            name: "New Pilot".to_string(),
            hp: Gauge::full(10),
            ap: Gauge::full(5),
        }
    }
}

/// Map position of an entity token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

/// Grouping tag used to colour entity cards and map tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    #[default]
    White,
    Red,
    Blue,
    Green,
    Yellow,
}

impl GroupColor {
    /// Palette order used for cycling and sorting.
    pub const PALETTE: [GroupColor; 5] = [
        GroupColor::White,
        GroupColor::Red,
        GroupColor::Blue,
        GroupColor::Green,
        GroupColor::Yellow,
    ];

    pub fn index(self) -> usize {
        Self::PALETTE
            .iter()
            .position(|color| *color == self)
            .unwrap_or(0)
    }

    /// Next palette colour, wrapping back to white.
    pub fn next(self) -> Self {
        Self::PALETTE[(self.index() + 1) % Self::PALETTE.len()]
    }
}

/// A live combat entity: a mech or any other tracked unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntityRecord", into = "EntityRecord")]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub category: Option<String>,
    pub description: Option<String>,
    pub chassis: Option<String>,
    pub pattern_id: Option<PatternId>,
    pub sp: Option<Gauge>,
    pub ep: Option<Gauge>,
    pub heat: Option<Gauge>,
    pub hp: Option<Gauge>,
    pub system_slots: Option<u32>,
    pub module_slots: Option<u32>,
    pub pilots: Vec<Pilot>,
    pub systems: Vec<Component>,
    pub modules: Vec<Component>,
    pub abilities: Vec<Component>,
    pub has_acted: bool,
    pub is_disabled: bool,
    pub group_color: GroupColor,
    pub position: Option<Position>,
}

impl Entity {
    /// Bare record with no stats or components.
    pub fn new(id: EntityId, name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            category: None,
            description: None,
            chassis: None,
            pattern_id: None,
            sp: None,
            ep: None,
            heat: None,
            hp: None,
            system_slots: None,
            module_slots: None,
            pilots: Vec::new(),
            systems: Vec::new(),
            modules: Vec::new(),
            abilities: Vec::new(),
            has_acted: false,
            is_disabled: false,
            group_color: GroupColor::White,
            position: None,
        }
    }

    pub fn gauge(&self, stat: Stat) -> Option<&Gauge> {
        match stat {
            Stat::Sp => self.sp.as_ref(),
            Stat::Ep => self.ep.as_ref(),
            Stat::Heat => self.heat.as_ref(),
            Stat::Hp => self.hp.as_ref(),
        }
    }

    pub fn gauge_mut(&mut self, stat: Stat) -> Option<&mut Gauge> {
        match stat {
            Stat::Sp => self.sp.as_mut(),
            Stat::Ep => self.ep.as_mut(),
            Stat::Heat => self.heat.as_mut(),
            Stat::Hp => self.hp.as_mut(),
        }
    }

    pub fn components(&self, kind: ComponentKind) -> &[Component] {
        match kind {
            ComponentKind::System => &self.systems,
            ComponentKind::Module => &self.modules,
            ComponentKind::Ability => &self.abilities,
        }
    }

    pub fn components_mut(&mut self, kind: ComponentKind) -> &mut Vec<Component> {
        match kind {
            ComponentKind::System => &mut self.systems,
            ComponentKind::Module => &mut self.modules,
            ComponentKind::Ability => &mut self.abilities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_component_names_are_upgraded() {
        let parsed: Vec<Component> = serde_json::from_value(json!([
            "Vibro Blade",
            { "name": "Autocannon", "condition": "damaged" },
            { "name": "Riot Shield", "range": "Close" }
        ]))
        .expect("components parse");

        assert_eq!(parsed[0], Component::new("Vibro Blade"));
        assert_eq!(parsed[1].condition, Condition::Damaged);
        assert_eq!(parsed[2].condition, Condition::Normal);
    }

    #[test]
    fn gauges_clamp_on_every_path() {
        let mut gauge = Gauge::full(8);
        gauge.set_current(12);
        assert_eq!(gauge.current(), 8);
        gauge.set_current(-3);
        assert_eq!(gauge.current(), 0);

        gauge.set_current(6);
        gauge.set_max(4);
        assert_eq!((gauge.current(), gauge.max()), (4, 4));
        gauge.set_max(10);
        assert_eq!((gauge.current(), gauge.max()), (4, 10));

        let loaded = Gauge::from_pair(Some(15), Some(9)).expect("pair present");
        assert_eq!((loaded.current(), loaded.max()), (9, 9));
        let lone = Gauge::from_pair(Some(6), None).expect("value present");
        assert_eq!((lone.current(), lone.max()), (6, 6));
        assert_eq!(Gauge::from_pair(None, None), None);
    }

    #[test]
    fn palette_wraps() {
        let mut color = GroupColor::White;
        for _ in 0..GroupColor::PALETTE.len() {
            color = color.next();
        }
        assert_eq!(color, GroupColor::White);
        assert_eq!(GroupColor::Blue.index(), 2);
    }
}
