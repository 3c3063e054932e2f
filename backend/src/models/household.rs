//! Household model

use crate::repository::{Entity, EntityId};
use serde::{Deserialize, Serialize};

/// How a household holds its dwelling; bought dwellings are owned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tenure {
    Own,
    #[default]
    Rent,
}

/// Families sharing one dwelling
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub families: Vec<EntityId>,
    pub dwelling: Option<EntityId>,
    pub tenure: Tenure,
}

impl Household {
    pub fn new(families: Vec<EntityId>) -> Self {
        Self {
            families,
            ..Self::default()
        }
    }

    pub fn remove_family(&mut self, family: EntityId) {
        self.families.retain(|&f| f != family);
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Looking for a place to live
    pub fn is_homeless(&self) -> bool {
        self.dwelling.is_none() && !self.families.is_empty()
    }
}

impl Entity for Household {
    fn being_removed(&mut self, _id: EntityId) {
        self.families.clear();
        self.dwelling = None;
    }
}
