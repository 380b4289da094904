use crate::{entity::EntityRequest, ids::PatternId};

/// Top-level choice in the add-entity dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Mech,
    Other,
}

/// Chassis choice for a mech: a catalog chassis or the custom slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChassisChoice {
    Catalog(String),
    /// Either a saved custom pattern or, with none picked, a blank mech.
    Custom,
}

/// Cursor state of the add-entity dialog. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddEntitySelection {
    kind: Option<SelectionKind>,
    chassis: Option<ChassisChoice>,
    pattern: Option<String>,
    custom_pattern: Option<PatternId>,
    category: Option<String>,
    template: Option<String>,
}

impl AddEntitySelection {
    pub fn kind(&self) -> Option<SelectionKind> {
        self.kind
    }

    pub fn chassis(&self) -> Option<&ChassisChoice> {
        self.chassis.as_ref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn select_kind(&mut self, kind: SelectionKind) {
        if self.kind != Some(kind) {
            *self = Self {
                kind: Some(kind),
                ..Self::default()
            };
        }
    }

    /// Picking a chassis clears any pattern picked for the previous one.
    pub fn select_chassis(&mut self, chassis: ChassisChoice) {
        self.kind = Some(SelectionKind::Mech);
        self.chassis = Some(chassis);
        self.pattern = None;
        self.custom_pattern = None;
    }

    pub fn select_pattern(&mut self, pattern: impl Into<String>) {
        self.pattern = Some(pattern.into());
    }

    pub fn select_custom_pattern(&mut self, id: PatternId) {
        self.custom_pattern = Some(id);
    }

    /// Picking a category clears the template picked in the previous one.
    pub fn select_category(&mut self, category: impl Into<String>) {
        self.kind = Some(SelectionKind::Other);
        self.category = Some(category.into());
        self.template = None;
    }

    pub fn select_template(&mut self, template: impl Into<String>) {
        self.template = Some(template.into());
    }

    /// Whether the confirm action should be enabled.
    pub fn is_complete(&self) -> bool {
        self.to_request().is_some()
    }

    /// Factory input for the current selection, if it is complete.
    pub fn to_request(&self) -> Option<EntityRequest> {
        match self.kind? {
            SelectionKind::Mech => match self.chassis.as_ref()? {
                ChassisChoice::Catalog(chassis) => Some(EntityRequest::CatalogMech {
                    chassis: chassis.clone(),
                    pattern: self.pattern.clone()?,
                }),
                ChassisChoice::Custom => Some(match self.custom_pattern {
                    Some(pattern_id) => EntityRequest::CustomPattern { pattern_id },
                    None => EntityRequest::BlankMech,
                }),
            },
            SelectionKind::Other => Some(EntityRequest::Other {
                category: self.category.clone()?,
                template: self.template.clone()?,
            }),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
