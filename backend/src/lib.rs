//! Microsimulation Core - Rust Engine
//!
//! Concurrent entity storage and deterministic market clearing for
//! population microsimulation.
//!
//! # Architecture
//!
//! - **repository**: Thread-safe entity stores with cascading dependents
//! - **market**: Generic double auction with deterministic parallel clearing
//! - **models**: Domain records (Person, Family, Household, Dwelling, ...)
//! - **modules**: Yearly modules (marriage market, housing market, cleanup)
//! - **population**: The repositories of one run, wired together
//! - **rng**: Deterministic random number generation
//! - **core**: Simulation calendar
//!
//! # Critical Invariants
//!
//! 1. Every live entity has exactly one id, and every dependent holds a
//!    record at that id
//! 2. All randomness is deterministic (seeded RNG), independent of thread count
//! 3. Structural repository changes are atomic with their cascades

pub mod config;
pub mod core;
pub mod logging;
pub mod market;
pub mod models;
pub mod modules;
pub mod population;
pub mod repository;
pub mod rng;

// Re-exports for convenience
pub use config::{ConfigError, MarketConfig, RepositoryDecl, SimulationConfig};
pub use core::Date;
pub use market::{Bid, ClearingReport, MarketError, MarketModel, SellerValue};
pub use modules::{ModuleError, YearlyModule};
pub use population::Population;
pub use repository::{Entity, EntityId, Repository, RepositoryError, RepositoryGraph};
pub use rng::RngManager;
