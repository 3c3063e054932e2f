//! Repository store
//!
//! `Repository<T>` owns every `T` of one kind behind a single reader-writer
//! lock. Readers (lookups, read scopes, snapshots) share the lock; structural
//! writers (`add`, `add_at`, `remove`) hold it exclusively for their whole
//! duration, including the cascade into dependent repositories.
//!
//! # Deadlock note
//!
//! The lock is not reentrant. A closure passed to `with`/`update`, or code
//! running while a `ReadScope` is alive, must not write to the same
//! repository.
//!
//! # Failed cascades
//!
//! Before an origin changes, every repository the cascade will reach is
//! checked to be loaded, so a `NotLoaded` dependent fails the operation with
//! the origin untouched. Loading and unloading are configuration-time steps
//! and must not run concurrently with mutations of the same graph.

use super::{DependentStore, Entity, EntityId, RepositoryError, RepositoryHandle};
use parking_lot::{RwLock, RwLockReadGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Lock-protected state of a repository
struct Inner<T> {
    /// Entries in id order, so iteration is deterministic
    entries: BTreeMap<EntityId, T>,

    /// High-water mark: next id handed out by `add`
    next_id: u64,

    /// Resolved at load time
    dependents: Vec<Arc<dyn DependentStore>>,

    loaded: bool,
}

/// Owning, thread-synchronized store mapping `EntityId` → `T`
///
/// # Example
/// ```
/// use microsim_core_rs::repository::{Entity, Repository};
///
/// #[derive(Clone, Default)]
/// struct Vehicle { seats: u8 }
/// impl Entity for Vehicle {}
///
/// let vehicles = Repository::<Vehicle>::new("vehicles");
/// vehicles.load().unwrap();
///
/// let id = vehicles.add(Vehicle { seats: 5 }).unwrap();
/// assert_eq!(vehicles.get(id).unwrap().seats, 5);
/// assert_eq!(vehicles.len(), 1);
///
/// vehicles.remove(id).unwrap();
/// assert!(vehicles.remove(id).is_err());
/// ```
pub struct Repository<T> {
    name: String,
    inner: RwLock<Inner<T>>,
}

impl<T: Entity> Repository<T> {
    /// Create an unloaded repository
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(Inner {
                entries: BTreeMap::new(),
                next_id: 0,
                dependents: Vec::new(),
                loaded: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Load with no dependents
    pub fn load(&self) -> Result<(), RepositoryError> {
        self.load_with(Vec::new())
    }

    /// Resolve `dependents` and enter the `Loaded` state
    ///
    /// Fails with `CyclicDependency` if this repository instance is reachable
    /// from any of the given dependents. Distinct repositories may share a
    /// name. Reloading replaces the dependent list and keeps existing entries.
    ///
    /// The reachability walk runs before the writer lock is taken; concurrent
    /// `load_with` calls on repositories of one graph are not supported.
    pub fn load_with(
        &self,
        dependents: Vec<Arc<dyn DependentStore>>,
    ) -> Result<(), RepositoryError> {
        let origin = self as *const Self as *const ();
        let mut path = vec![self.name.clone()];
        for dependent in &dependents {
            reject_path_to(origin, dependent, &mut path)?;
        }

        let mut inner = self.inner.write();
        debug!(
            repository = %self.name,
            dependents = dependents.len(),
            "repository loaded"
        );
        inner.dependents = dependents;
        inner.loaded = true;
        Ok(())
    }

    /// Clear entries and dependents, returning to `Unloaded`
    pub fn unload(&self) {
        let mut inner = self.inner.write();
        inner.entries.clear();
        inner.dependents.clear();
        inner.next_id = 0;
        inner.loaded = false;
        debug!(repository = %self.name, "repository unloaded");
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.read().loaded
    }

    /// Insert `entity` under the next free id
    ///
    /// Every dependent receives a placeholder at the same id before the writer
    /// lock is released.
    pub fn add(&self, entity: T) -> Result<EntityId, RepositoryError> {
        let mut inner = self.inner.write();
        self.ensure_loaded(&inner, "add")?;

        let id = EntityId(inner.next_id);
        if id.0 == u64::MAX {
            return Err(self.invalid("add", "identifier space exhausted"));
        }
        ensure_cascade_ready(&inner.dependents, CREATE_PLACEHOLDER)?;
        self.insert_locked(&mut inner, id, entity);
        cascade_create(&inner.dependents, id)?;
        trace!(repository = %self.name, %id, "entity added");
        Ok(id)
    }

    /// Insert `entity` under a caller-chosen id
    ///
    /// An existing entry at `id` is overwritten without running its teardown
    /// hook. Dependents keep any record they already hold at `id`.
    pub fn add_at(&self, id: EntityId, entity: T) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write();
        self.ensure_loaded(&inner, "add_at")?;

        if id.0 == u64::MAX {
            return Err(self.invalid("add_at", "id u64::MAX is reserved"));
        }
        ensure_cascade_ready(&inner.dependents, CREATE_PLACEHOLDER)?;
        self.insert_locked(&mut inner, id, entity);
        cascade_create(&inner.dependents, id)?;
        trace!(repository = %self.name, %id, "entity added at explicit id");
        Ok(())
    }

    /// Tear down and remove the entity at `id`, cascading to dependents
    ///
    /// Returns the removed entity after its teardown hook has run.
    pub fn remove(&self, id: EntityId) -> Result<T, RepositoryError> {
        let mut inner = self.inner.write();
        self.ensure_loaded(&inner, "remove")?;

        if !inner.entries.contains_key(&id) {
            return Err(self.not_found("remove", id));
        }
        ensure_cascade_ready(&inner.dependents, CASCADE_REMOVE)?;

        let removed = match inner.entries.get_mut(&id) {
            Some(entity) => {
                entity.being_removed(id);
                inner.entries.remove(&id)
            }
            None => None,
        };
        let removed = removed.ok_or_else(|| self.not_found("remove", id))?;

        cascade_remove(&inner.dependents, id)?;
        trace!(repository = %self.name, %id, "entity removed");
        Ok(removed)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.inner.read().entries.contains_key(&id)
    }

    /// Run `f` against the entity at `id` under the read lock
    pub fn with<R>(&self, id: EntityId, f: impl FnOnce(&T) -> R) -> Result<R, RepositoryError> {
        let inner = self.inner.read();
        inner
            .entries
            .get(&id)
            .map(f)
            .ok_or_else(|| self.not_found("get", id))
    }

    /// Mutate the entity at `id` in place under the writer lock
    ///
    /// Field updates are not structural changes, so dependents are not notified.
    pub fn update<R>(
        &self,
        id: EntityId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, RepositoryError> {
        let mut inner = self.inner.write();
        self.ensure_loaded(&inner, "update")?;
        match inner.entries.get_mut(&id) {
            Some(entity) => Ok(f(entity)),
            None => Err(self.not_found("update", id)),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The id the next `add` will assign
    pub fn next_id(&self) -> EntityId {
        EntityId(self.inner.read().next_id)
    }

    /// Open a batched read scope
    ///
    /// The read lock is held until the returned scope is dropped.
    pub fn read(&self) -> ReadScope<'_, T> {
        ReadScope {
            repository: &self.name,
            guard: self.inner.read(),
        }
    }

    /// Ids of all current entries, ascending
    pub fn ids(&self) -> Vec<EntityId> {
        self.read().ids()
    }

    fn insert_locked(&self, inner: &mut Inner<T>, id: EntityId, entity: T) {
        inner.entries.insert(id, entity);
        inner.next_id = inner.next_id.max(id.0 + 1);
    }

    fn ensure_loaded(
        &self,
        inner: &Inner<T>,
        operation: &'static str,
    ) -> Result<(), RepositoryError> {
        if inner.loaded {
            Ok(())
        } else {
            Err(RepositoryError::NotLoaded {
                repository: self.name.clone(),
                operation,
            })
        }
    }

    fn not_found(&self, operation: &'static str, id: EntityId) -> RepositoryError {
        RepositoryError::NotFound {
            repository: self.name.clone(),
            operation,
            id,
        }
    }

    fn invalid(&self, operation: &'static str, reason: &str) -> RepositoryError {
        RepositoryError::InvalidArgument {
            repository: self.name.clone(),
            operation,
            reason: reason.to_string(),
        }
    }
}

impl<T: Entity + Clone> Repository<T> {
    /// Clone of the entity at `id`
    pub fn get(&self, id: EntityId) -> Result<T, RepositoryError> {
        self.with(id, T::clone)
    }

    pub fn try_get(&self, id: EntityId) -> Option<T> {
        self.inner.read().entries.get(&id).cloned()
    }

    /// Clone every entry, in id order
    pub fn snapshot(&self) -> Vec<(EntityId, T)> {
        self.read().iter().map(|(id, e)| (id, e.clone())).collect()
    }
}

impl<T: Entity> RepositoryHandle for Repository<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn load_with(&self, dependents: Vec<Arc<dyn DependentStore>>) -> Result<(), RepositoryError> {
        Repository::load_with(self, dependents)
    }

    fn unload(&self) {
        Repository::unload(self)
    }

    fn is_loaded(&self) -> bool {
        Repository::is_loaded(self)
    }

    fn len(&self) -> usize {
        Repository::len(self)
    }
}

impl<T: Entity + Default> DependentStore for Repository<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn create_placeholder(&self, id: EntityId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write();
        self.ensure_loaded(&inner, CREATE_PLACEHOLDER)?;

        if !inner.entries.contains_key(&id) {
            self.insert_locked(&mut inner, id, T::default());
        }
        cascade_create(&inner.dependents, id)?;
        trace!(repository = %self.name, %id, "placeholder created");
        Ok(())
    }

    fn cascade_remove(&self, id: EntityId) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write();
        self.ensure_loaded(&inner, CASCADE_REMOVE)?;

        if let Some(entity) = inner.entries.get_mut(&id) {
            entity.being_removed(id);
            inner.entries.remove(&id);
        }
        cascade_remove(&inner.dependents, id)?;
        trace!(repository = %self.name, %id, "cascaded removal");
        Ok(())
    }

    fn dependents(&self) -> Vec<Arc<dyn DependentStore>> {
        self.inner.read().dependents.clone()
    }

    fn ensure_cascade_ready(&self, operation: &'static str) -> Result<(), RepositoryError> {
        let dependents = {
            let inner = self.inner.read();
            self.ensure_loaded(&inner, operation)?;
            inner.dependents.clone()
        };
        ensure_cascade_ready(&dependents, operation)
    }
}

const CREATE_PLACEHOLDER: &str = "create placeholder";
const CASCADE_REMOVE: &str = "cascade remove";

/// Fail with `NotLoaded` if any repository below `dependents` is unloaded
fn ensure_cascade_ready(
    dependents: &[Arc<dyn DependentStore>],
    operation: &'static str,
) -> Result<(), RepositoryError> {
    for dependent in dependents {
        dependent.ensure_cascade_ready(operation)?;
    }
    Ok(())
}

fn cascade_create(
    dependents: &[Arc<dyn DependentStore>],
    id: EntityId,
) -> Result<(), RepositoryError> {
    for dependent in dependents {
        dependent.create_placeholder(id)?;
    }
    Ok(())
}

fn cascade_remove(
    dependents: &[Arc<dyn DependentStore>],
    id: EntityId,
) -> Result<(), RepositoryError> {
    for dependent in dependents {
        dependent.cascade_remove(id)?;
    }
    Ok(())
}

/// Fail if the repository at `origin` is reachable from `node` through
/// resolved dependents
///
/// Repositories are compared by address, not by name.
fn reject_path_to(
    origin: *const (),
    node: &Arc<dyn DependentStore>,
    path: &mut Vec<String>,
) -> Result<(), RepositoryError> {
    path.push(node.name().to_string());
    if Arc::as_ptr(node) as *const () == origin {
        return Err(RepositoryError::CyclicDependency {
            cycle: path.clone(),
        });
    }
    for next in node.dependents() {
        reject_path_to(origin, &next, path)?;
    }
    path.pop();
    Ok(())
}

/// Batched read access to a repository
///
/// Holds the read lock for its lifetime: no writer runs while a scope is open,
/// and that is the only isolation it provides.
pub struct ReadScope<'a, T> {
    repository: &'a str,
    guard: RwLockReadGuard<'a, Inner<T>>,
}

impl<'a, T> ReadScope<'a, T> {
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.guard.entries.get(&id)
    }

    /// Like `get`, with a `NotFound` error naming the repository
    pub fn require(&self, id: EntityId) -> Result<&T, RepositoryError> {
        self.guard
            .entries
            .get(&id)
            .ok_or_else(|| RepositoryError::NotFound {
                repository: self.repository.to_string(),
                operation: "get",
                id,
            })
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.guard.entries.contains_key(&id)
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.guard.entries.keys().copied().collect()
    }

    /// Entries in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.guard.entries.iter().map(|(id, entity)| (*id, entity))
    }

    pub fn len(&self) -> usize {
        self.guard.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.entries.is_empty()
    }
}
