//! Domain models
//!
//! Plain records stored in repositories. Cross-entity links are `EntityId`s,
//! never references.

pub mod dwelling;
pub mod education;
pub mod family;
pub mod household;
pub mod person;

pub use dwelling::{Dwelling, DwellingType};
pub use education::{EducationLevel, PersonalEducation};
pub use family::Family;
pub use household::{Household, Tenure};
pub use person::{MaritalStatus, Person, Sex};
