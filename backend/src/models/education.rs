//! Per-person education record
//!
//! Lives in a dependent repository keyed by person id: one record per
//! person, created and removed with the person.

use crate::repository::Entity;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum EducationLevel {
    #[default]
    None,
    Primary,
    Secondary,
    PostSecondary,
    University,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalEducation {
    pub last_completed: EducationLevel,
    pub currently_undertaking: Option<EducationLevel>,
}

impl PersonalEducation {
    /// Finish the level in progress, if any
    pub fn complete_current(&mut self) {
        if let Some(level) = self.currently_undertaking.take() {
            self.last_completed = self.last_completed.max(level);
        }
    }
}

impl Entity for PersonalEducation {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_current_never_lowers_level() {
        let mut record = PersonalEducation {
            last_completed: EducationLevel::Secondary,
            currently_undertaking: Some(EducationLevel::University),
        };
        record.complete_current();
        assert_eq!(record.last_completed, EducationLevel::University);
        assert_eq!(record.currently_undertaking, None);

        record.currently_undertaking = Some(EducationLevel::Primary);
        record.complete_current();
        assert_eq!(record.last_completed, EducationLevel::University);

        // nothing in progress
        record.complete_current();
        assert_eq!(record.last_completed, EducationLevel::University);
    }
}
