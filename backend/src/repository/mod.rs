//! Repository Module
//!
//! Owning, thread-synchronized stores for simulated entities.
//!
//! - **entity**: identifier type and the `Entity` teardown contract
//! - **store**: `Repository<T>`, the locked id → entity map
//! - **graph**: configuration-time wiring of dependent repositories
//!
//! # Critical Invariants
//!
//! 1. **Identity**: an id appears at most once per repository; auto-assigned ids
//!    are monotonic (`next = max(next, id + 1)`)
//! 2. **Cascade**: creating or removing id `i` in an origin creates or removes `i`
//!    in every dependent, recursively, while the origin's writer lock is held
//! 3. **Acyclicity**: the dependent graph never contains a cycle, otherwise
//!    cascading writer locks could deadlock
//! 4. **Lifecycle**: mutations are rejected until the repository is loaded
//! 5. **No partial cascades**: an origin is only changed once every repository
//!    its cascade reaches is known to be loaded

pub mod entity;
pub mod graph;
pub mod store;

use std::sync::Arc;
use thiserror::Error;

pub use entity::{Entity, EntityId};
pub use graph::RepositoryGraph;
pub use store::{ReadScope, Repository};

/// Errors raised by repositories and their dependency wiring
///
/// All of these are programming or configuration faults. None are retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("repository '{repository}' is not loaded (attempted {operation})")]
    NotLoaded {
        repository: String,
        operation: &'static str,
    },

    #[error("invalid argument to '{repository}' {operation}: {reason}")]
    InvalidArgument {
        repository: String,
        operation: &'static str,
        reason: String,
    },

    #[error("entity {id} not found in repository '{repository}' (attempted {operation})")]
    NotFound {
        repository: String,
        operation: &'static str,
        id: EntityId,
    },

    #[error("cyclic repository dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("unknown repository '{0}'")]
    UnknownRepository(String),

    #[error("repository '{0}' registered twice")]
    DuplicateRepository(String),
}

/// Lifecycle operations every repository exposes, independent of entity type
pub trait RepositoryHandle: Send + Sync {
    /// Configured name, used in diagnostics and dependency wiring
    fn name(&self) -> &str;

    /// Resolve dependents and enter the `Loaded` state
    fn load_with(&self, dependents: Vec<Arc<dyn DependentStore>>) -> Result<(), RepositoryError>;

    /// Clear all entries and dependents, returning to `Unloaded`
    fn unload(&self);

    fn is_loaded(&self) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A repository that can mirror structural changes of an origin
///
/// Only repositories whose entity type has a placeholder value (`Default`) can
/// act as dependents.
pub trait DependentStore: Send + Sync {
    fn name(&self) -> &str;

    /// Insert a placeholder at `id`, then cascade to own dependents
    fn create_placeholder(&self, id: EntityId) -> Result<(), RepositoryError>;

    /// Remove `id` if present, then cascade to own dependents
    fn cascade_remove(&self, id: EntityId) -> Result<(), RepositoryError>;

    /// Dependents resolved at load time
    fn dependents(&self) -> Vec<Arc<dyn DependentStore>>;

    /// Fail with `NotLoaded` unless this repository and every repository
    /// below it can take part in a cascade
    fn ensure_cascade_ready(&self, operation: &'static str) -> Result<(), RepositoryError>;
}
