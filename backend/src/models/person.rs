//! Person model
//!
//! A simulated individual. Relationships to other persons, families and
//! households are held as ids into their repositories.

use crate::repository::{Entity, EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sex {
    #[default]
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Widowed,
}

impl MaritalStatus {
    /// Whether a person with this status may enter a marriage
    pub fn can_marry(self) -> bool {
        !matches!(self, MaritalStatus::Married)
    }
}

/// A simulated person
///
/// # Example
/// ```
/// use microsim_core_rs::models::{Person, Sex};
///
/// let p = Person::new(34, Sex::Male);
/// assert!(p.living);
/// assert!(p.is_single());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub age: u32,
    pub sex: Sex,
    pub living: bool,
    pub marital_status: MaritalStatus,

    pub spouse: Option<EntityId>,
    pub father: Option<EntityId>,
    pub mother: Option<EntityId>,
    pub children: Vec<EntityId>,
    pub ex_spouses: Vec<EntityId>,

    /// Family this person currently belongs to
    pub family: Option<EntityId>,
}

impl Person {
    pub fn new(age: u32, sex: Sex) -> Self {
        Self {
            age,
            sex,
            living: true,
            ..Self::default()
        }
    }

    pub fn is_single(&self) -> bool {
        self.spouse.is_none() && self.marital_status.can_marry()
    }

    /// Mark this person as widowed, dropping the spouse link
    pub fn widow(&mut self) {
        if let Some(spouse) = self.spouse.take() {
            self.ex_spouses.push(spouse);
        }
        self.marital_status = MaritalStatus::Widowed;
    }

    /// Drop any link this person holds to `other`
    pub fn forget(&mut self, other: EntityId) {
        if self.spouse == Some(other) {
            self.widow();
        }
        if self.father == Some(other) {
            self.father = None;
        }
        if self.mother == Some(other) {
            self.mother = None;
        }
        self.children.retain(|&child| child != other);
    }
}

impl Entity for Person {
    fn being_removed(&mut self, _id: EntityId) {
        self.living = false;
        self.spouse = None;
        self.father = None;
        self.mother = None;
        self.children.clear();
        self.family = None;
    }
}
