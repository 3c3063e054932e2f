//! Removal of dead persons
//!
//! Persons marked not living are unlinked from their relatives and family,
//! then removed; the removal cascades into dependent repositories. Families
//! left empty are dissolved, and households left empty release their
//! dwelling.

use super::{ModuleError, YearlyModule};
use crate::models::{Dwelling, Family, Household, Person};
use crate::population::Population;
use crate::repository::{EntityId, Repository, RepositoryError};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// What the last `execute` removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupSummary {
    pub persons_removed: usize,
    pub families_removed: usize,
    pub households_removed: usize,
}

pub struct CleanupTheDead {
    persons: Arc<Repository<Person>>,
    families: Arc<Repository<Family>>,
    households: Arc<Repository<Household>>,
    dwellings: Arc<Repository<Dwelling>>,
    last: CleanupSummary,
}

impl CleanupTheDead {
    pub const NAME: &'static str = "cleanup-the-dead";

    pub fn new(population: &Population) -> Self {
        Self {
            persons: Arc::clone(&population.persons),
            families: Arc::clone(&population.families),
            households: Arc::clone(&population.households),
            dwellings: Arc::clone(&population.dwellings),
            last: CleanupSummary::default(),
        }
    }

    pub fn last_summary(&self) -> CleanupSummary {
        self.last
    }

    fn remove_person(&self, id: EntityId, person: &Person) -> Result<(), RepositoryError> {
        let relatives = person
            .spouse
            .into_iter()
            .chain(person.father)
            .chain(person.mother)
            .chain(person.children.iter().copied());
        for relative in relatives {
            if self.persons.contains(relative) {
                self.persons.update(relative, |p| p.forget(id))?;
            }
        }

        if let Some(family) = person.family.filter(|&f| self.families.contains(f)) {
            let persons = self.persons.read();
            self.families.update(family, |f| f.remove_person(id, &persons))?;
        }

        self.persons.remove(id)?;
        Ok(())
    }

    fn dissolve_empty_families(&self, summary: &mut CleanupSummary) -> Result<(), RepositoryError> {
        let empty: Vec<(EntityId, Option<EntityId>)> = self
            .families
            .read()
            .iter()
            .filter(|(_, f)| f.is_empty())
            .map(|(id, f)| (id, f.household))
            .collect();

        for (family, household) in empty {
            self.families.remove(family)?;
            summary.families_removed += 1;

            let Some(household) = household.filter(|&h| self.households.contains(h)) else {
                continue;
            };
            let (now_empty, dwelling) = self.households.update(household, |h| {
                h.remove_family(family);
                (h.is_empty(), h.dwelling)
            })?;
            if now_empty {
                self.households.remove(household)?;
                summary.households_removed += 1;
                if let Some(dwelling) = dwelling.filter(|&d| self.dwellings.contains(d)) {
                    self.dwellings.update(dwelling, |d| d.household = None)?;
                }
            }
        }
        Ok(())
    }

    fn run(&self) -> Result<CleanupSummary, RepositoryError> {
        let dead: Vec<(EntityId, Person)> = self
            .persons
            .read()
            .iter()
            .filter(|(_, p)| !p.living)
            .map(|(id, p)| (id, p.clone()))
            .collect();

        let mut summary = CleanupSummary::default();
        for (id, person) in &dead {
            self.remove_person(*id, person)?;
            summary.persons_removed += 1;
        }
        self.dissolve_empty_families(&mut summary)?;
        Ok(summary)
    }
}

impl YearlyModule for CleanupTheDead {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn execute(&mut self, year: u32) -> Result<(), ModuleError> {
        let summary = self
            .run()
            .map_err(|e| ModuleError::new(Self::NAME, "execute", e))?;
        info!(
            year,
            persons = summary.persons_removed,
            families = summary.families_removed,
            households = summary.households_removed,
            "dead persons cleaned up"
        );
        self.last = summary;
        Ok(())
    }
}
