//! Family model

use super::person::{Person, Sex};
use crate::core::Date;
use crate::repository::{Entity, EntityId, ReadScope};
use serde::{Deserialize, Serialize};

/// A family: a couple and/or their dependent members
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Family {
    /// Members, in joining order
    pub persons: Vec<EntityId>,
    pub male_head: Option<EntityId>,
    pub female_head: Option<EntityId>,
    pub household: Option<EntityId>,
    pub marriage_date: Option<Date>,
}

impl Family {
    /// A new family formed by marriage
    pub fn married(male: EntityId, female: EntityId, date: Date) -> Self {
        Self {
            persons: vec![male, female],
            male_head: Some(male),
            female_head: Some(female),
            household: None,
            marriage_date: Some(date),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn contains(&self, person: EntityId) -> bool {
        self.persons.contains(&person)
    }

    /// Drop `person` from the family
    ///
    /// If that leaves the family headless, its eldest remaining member
    /// becomes head. `persons` must not be write-locked by the caller.
    pub fn remove_person(&mut self, person: EntityId, persons: &ReadScope<'_, Person>) {
        self.persons.retain(|&member| member != person);
        if self.male_head == Some(person) {
            self.male_head = None;
        }
        if self.female_head == Some(person) {
            self.female_head = None;
            self.marriage_date = None;
        }
        if self.male_head.is_none() {
            self.marriage_date = None;
        }
        if self.male_head.is_none() && self.female_head.is_none() {
            self.elect_head(persons);
        }
    }

    /// Make the eldest member head; ties go to the earliest joiner
    fn elect_head(&mut self, persons: &ReadScope<'_, Person>) {
        let eldest = self
            .persons
            .iter()
            .filter_map(|&id| persons.get(id).map(|p| (id, p)))
            .fold(None::<(EntityId, &Person)>, |best, (id, p)| match best {
                Some((_, b)) if b.age >= p.age => best,
                _ => Some((id, p)),
            });
        if let Some((id, head)) = eldest {
            match head.sex {
                Sex::Male => self.male_head = Some(id),
                Sex::Female => self.female_head = Some(id),
            }
        }
    }
}

impl Entity for Family {
    fn being_removed(&mut self, _id: EntityId) {
        self.persons.clear();
        self.male_head = None;
        self.female_head = None;
        self.household = None;
    }
}
