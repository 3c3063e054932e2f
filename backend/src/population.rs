//! Population
//!
//! The repositories a simulation run works on, wired into one
//! `RepositoryGraph`. Education records mirror persons by default.

use crate::config::RepositoryDecl;
use crate::models::{Dwelling, Family, Household, Person, PersonalEducation};
use crate::repository::{Repository, RepositoryError, RepositoryGraph};
use std::sync::Arc;

pub const PERSONS: &str = "persons";
pub const FAMILIES: &str = "families";
pub const HOUSEHOLDS: &str = "households";
pub const DWELLINGS: &str = "dwellings";
pub const EDUCATIONS: &str = "educations";

/// All population repositories, shared with the modules that act on them
pub struct Population {
    pub persons: Arc<Repository<Person>>,
    pub families: Arc<Repository<Family>>,
    pub households: Arc<Repository<Household>>,
    pub dwellings: Arc<Repository<Dwelling>>,
    pub educations: Arc<Repository<PersonalEducation>>,
    graph: RepositoryGraph,
}

impl Population {
    /// Default wiring: persons → educations
    pub fn new() -> Result<Self, RepositoryError> {
        Self::with_dependencies(&[RepositoryDecl {
            name: PERSONS.to_string(),
            dependents: vec![EDUCATIONS.to_string()],
        }])
    }

    /// Wire dependents as declared
    ///
    /// Fails with `CyclicDependency` or `UnknownRepository` before anything
    /// is loaded.
    pub fn with_dependencies(decls: &[RepositoryDecl]) -> Result<Self, RepositoryError> {
        let persons = Arc::new(Repository::new(PERSONS));
        let families = Arc::new(Repository::new(FAMILIES));
        let households = Arc::new(Repository::new(HOUSEHOLDS));
        let dwellings = Arc::new(Repository::new(DWELLINGS));
        let educations = Arc::new(Repository::new(EDUCATIONS));

        let mut graph = RepositoryGraph::new();
        graph.register_dependent(&persons)?;
        graph.register_dependent(&families)?;
        graph.register_dependent(&households)?;
        graph.register_dependent(&dwellings)?;
        graph.register_dependent(&educations)?;

        for decl in decls {
            for dependent in &decl.dependents {
                graph.add_dependency(&decl.name, dependent)?;
            }
        }
        graph.validate()?;

        Ok(Self {
            persons,
            families,
            households,
            dwellings,
            educations,
            graph,
        })
    }

    pub fn graph(&self) -> &RepositoryGraph {
        &self.graph
    }

    pub fn load(&self) -> Result<(), RepositoryError> {
        self.graph.load()
    }

    pub fn unload(&self) {
        self.graph.unload()
    }
}
