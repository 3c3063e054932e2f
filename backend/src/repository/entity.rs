//! Entity identity and teardown
//!
//! Relationships between entities are stored as `EntityId`s and resolved
//! through the owning repository at use time, never as direct references.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense, non-negative identifier assigned by a repository
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityId(pub u64);

impl EntityId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record owned by exactly one repository
///
/// `being_removed` is invoked exactly once, while the owning repository holds
/// its writer lock and before the record is unlinked. Implementations sever
/// links they hold themselves; links held by other entities are the removing
/// module's job, since the hook cannot reach other repositories.
pub trait Entity: Send + Sync + 'static {
    fn being_removed(&mut self, _id: EntityId) {}
}
