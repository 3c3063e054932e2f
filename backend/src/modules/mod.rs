//! Yearly modules
//!
//! Modules own the behaviour that acts on the population. The embedding driver
//! calls the hooks in this order:
//!
//! ```text
//! before_first_year
//! for each year:
//!     before_yearly_execute → execute → after_yearly_execute
//! run_finished
//! ```

pub mod cleanup;
pub mod housing;
pub mod marriage;

use crate::market::MarketError;
use crate::repository::RepositoryError;
use thiserror::Error;

pub use cleanup::{CleanupSummary, CleanupTheDead};
pub use housing::{HousingMarket, HousingPricing};
pub use marriage::{MarriageMarket, MatchScore};

/// What went wrong inside a module
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModuleFault {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Market(#[from] MarketError),
}

/// A module hook failed
#[derive(Debug, Error, Clone, PartialEq)]
#[error("module '{module}' failed in {operation}: {fault}")]
pub struct ModuleError {
    pub module: String,
    pub operation: &'static str,
    #[source]
    pub fault: ModuleFault,
}

impl ModuleError {
    pub fn new(module: &str, operation: &'static str, fault: impl Into<ModuleFault>) -> Self {
        Self {
            module: module.to_string(),
            operation,
            fault: fault.into(),
        }
    }
}

/// Lifecycle hooks driven once per simulated year
pub trait YearlyModule: Send {
    fn name(&self) -> &str;

    fn before_first_year(&mut self, _first_year: u32) -> Result<(), ModuleError> {
        Ok(())
    }

    fn before_yearly_execute(&mut self, _year: u32) -> Result<(), ModuleError> {
        Ok(())
    }

    fn execute(&mut self, year: u32) -> Result<(), ModuleError>;

    fn after_yearly_execute(&mut self, _year: u32) -> Result<(), ModuleError> {
        Ok(())
    }

    fn run_finished(&mut self, _final_year: u32) -> Result<(), ModuleError> {
        Ok(())
    }
}

/// Pick `count` distinct indices below `len`, in draw order
///
/// Returns every index, ascending, when `count >= len`.
pub(crate) fn sample_distinct(
    rng: &mut crate::rng::RngManager,
    len: usize,
    count: usize,
) -> Vec<usize> {
    if count >= len {
        return (0..len).collect();
    }
    let mut chosen = std::collections::BTreeSet::new();
    let mut picks = Vec::with_capacity(count);
    while picks.len() < count {
        let index = rng.index(len);
        if chosen.insert(index) {
            picks.push(index);
        }
    }
    picks
}
