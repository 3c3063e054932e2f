//! Repository dependency graph
//!
//! Configuration-time wiring of dependent repositories:
//! - Register repositories by unique name
//! - Declare `origin → dependent` edges
//! - Validate acyclicity with Tarjan's SCC algorithm (O(V+E))
//! - Load every repository with its resolved dependents, sinks first
//!
//! Key features:
//! - Deterministic vertex ordering (registration order)
//! - BTreeMap/BTreeSet adjacency for sorted iteration
//! - A cycle is reported as the names of its strongly connected component

use super::{DependentStore, Entity, Repository, RepositoryError, RepositoryHandle};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

/// One registered repository
struct Node {
    handle: Arc<dyn RepositoryHandle>,
    /// Present when the repository can act as a dependent
    as_dependent: Option<Arc<dyn DependentStore>>,
}

/// Registry of repositories and the dependent edges between them
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use microsim_core_rs::repository::{Entity, EntityId, Repository, RepositoryGraph};
///
/// #[derive(Clone, Default)]
/// struct Person;
/// impl Entity for Person {}
///
/// #[derive(Clone, Default)]
/// struct TaxRecord { owed: i64 }
/// impl Entity for TaxRecord {}
///
/// let persons = Arc::new(Repository::<Person>::new("persons"));
/// let taxes = Arc::new(Repository::<TaxRecord>::new("taxes"));
///
/// let mut graph = RepositoryGraph::new();
/// graph.register(&persons).unwrap();
/// graph.register_dependent(&taxes).unwrap();
/// graph.add_dependency("persons", "taxes").unwrap();
/// graph.load().unwrap();
///
/// let id = persons.add(Person).unwrap();
/// assert!(taxes.contains(id));
/// persons.remove(id).unwrap();
/// assert!(!taxes.contains(EntityId(0)));
/// ```
#[derive(Default)]
pub struct RepositoryGraph {
    /// Name → vertex index (registration order)
    name_to_index: BTreeMap<String, usize>,

    /// Vertex index → node
    nodes: Vec<Node>,

    /// Adjacency: origin_idx → dependent indices
    adj: BTreeMap<usize, BTreeSet<usize>>,
}

impl RepositoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository that can only act as an origin
    pub fn register<T: Entity>(
        &mut self,
        repository: &Arc<Repository<T>>,
    ) -> Result<(), RepositoryError> {
        let handle: Arc<dyn RepositoryHandle> = repository.clone();
        self.insert_node(Node {
            handle,
            as_dependent: None,
        })
    }

    /// Register a repository that may also mirror an origin
    pub fn register_dependent<T: Entity + Default>(
        &mut self,
        repository: &Arc<Repository<T>>,
    ) -> Result<(), RepositoryError> {
        let handle: Arc<dyn RepositoryHandle> = repository.clone();
        let as_dependent: Arc<dyn DependentStore> = repository.clone();
        self.insert_node(Node {
            handle,
            as_dependent: Some(as_dependent),
        })
    }

    fn insert_node(&mut self, node: Node) -> Result<(), RepositoryError> {
        let name = node.handle.name().to_string();
        if self.name_to_index.contains_key(&name) {
            return Err(RepositoryError::DuplicateRepository(name));
        }
        self.name_to_index.insert(name, self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Declare that `dependent` mirrors creations and removals of `origin`
    pub fn add_dependency(&mut self, origin: &str, dependent: &str) -> Result<(), RepositoryError> {
        let origin_idx = self.index_of(origin)?;
        let dependent_idx = self.index_of(dependent)?;
        if self.nodes[dependent_idx].as_dependent.is_none() {
            return Err(RepositoryError::InvalidArgument {
                repository: dependent.to_string(),
                operation: "add_dependency",
                reason: "repository was not registered as a dependent".to_string(),
            });
        }
        self.adj.entry(origin_idx).or_default().insert(dependent_idx);
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize, RepositoryError> {
        self.name_to_index
            .get(name)
            .copied()
            .ok_or_else(|| RepositoryError::UnknownRepository(name.to_string()))
    }

    pub fn vertex_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adj.values().map(|deps| deps.len()).sum()
    }

    /// Dependents of `origin` (sorted by registration order)
    pub fn dependents_of(&self, origin: &str) -> Result<Vec<String>, RepositoryError> {
        let idx = self.index_of(origin)?;
        Ok(self
            .out_neighbors(idx)
            .into_iter()
            .map(|d| self.nodes[d].handle.name().to_string())
            .collect())
    }

    fn out_neighbors(&self, vertex_idx: usize) -> Vec<usize> {
        self.adj
            .get(&vertex_idx)
            .map(|deps| deps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check the graph is acyclic
    ///
    /// Returns vertex indices in load order (every dependent before its origins).
    pub fn validate(&self) -> Result<Vec<usize>, RepositoryError> {
        let sccs = SccFinder::find_sccs(self);
        let mut order = Vec::with_capacity(self.nodes.len());
        for scc in sccs {
            let self_loop = scc.len() == 1 && self.out_neighbors(scc[0]).contains(&scc[0]);
            if scc.len() > 1 || self_loop {
                let mut cycle: Vec<String> = scc
                    .iter()
                    .map(|&v| self.nodes[v].handle.name().to_string())
                    .collect();
                cycle.push(cycle[0].clone());
                return Err(RepositoryError::CyclicDependency { cycle });
            }
            order.push(scc[0]);
        }
        Ok(order)
    }

    /// Validate, then load every repository with its resolved dependents
    pub fn load(&self) -> Result<(), RepositoryError> {
        let order = self.validate()?;
        for v in order {
            let dependents = self
                .out_neighbors(v)
                .into_iter()
                .filter_map(|d| self.nodes[d].as_dependent.clone())
                .collect();
            self.nodes[v].handle.load_with(dependents)?;
        }
        info!(
            repositories = self.vertex_count(),
            edges = self.edge_count(),
            "repository graph loaded"
        );
        Ok(())
    }

    /// Unload every repository
    pub fn unload(&self) {
        for node in &self.nodes {
            node.handle.unload();
        }
    }
}

// ============================================================================
// SCC Finder - Tarjan's Algorithm
// ============================================================================

/// Strongly Connected Component finder using Tarjan's algorithm
///
/// SCCs come out in reverse topological order: a component is emitted only
/// after every component it reaches, so sinks come first.
struct SccFinder;

impl SccFinder {
    fn find_sccs(graph: &RepositoryGraph) -> Vec<Vec<usize>> {
        let n = graph.vertex_count();
        let mut state = TarjanState {
            index: 0,
            indices: vec![None; n],
            lowlinks: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            sccs: Vec::new(),
        };

        // Visit vertices in registration order (deterministic)
        for v in 0..n {
            if state.indices[v].is_none() {
                Self::strongconnect(graph, v, &mut state);
            }
        }
        state.sccs
    }

    fn strongconnect(graph: &RepositoryGraph, v: usize, state: &mut TarjanState) {
        let v_index = state.index;
        state.indices[v] = Some(v_index);
        state.lowlinks[v] = v_index;
        state.index += 1;
        state.stack.push(v);
        state.on_stack[v] = true;

        for w in graph.out_neighbors(v) {
            match state.indices[w] {
                None => {
                    Self::strongconnect(graph, w, state);
                    state.lowlinks[v] = state.lowlinks[v].min(state.lowlinks[w]);
                }
                Some(w_index) if state.on_stack[w] => {
                    state.lowlinks[v] = state.lowlinks[v].min(w_index);
                }
                Some(_) => {}
            }
        }

        // v is a root node: pop its component
        if state.lowlinks[v] == v_index {
            let mut scc = Vec::new();
            while let Some(w) = state.stack.pop() {
                state.on_stack[w] = false;
                scc.push(w);
                if w == v {
                    break;
                }
            }
            scc.sort_unstable();
            state.sccs.push(scc);
        }
    }
}

struct TarjanState {
    index: usize,
    indices: Vec<Option<usize>>,
    lowlinks: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    sccs: Vec<Vec<usize>>,
}
