//! Simulation configuration
//!
//! Typed, serde-deserializable configuration. Every field has a default, so
//! an empty JSON object is a valid configuration.
//!
//! ```
//! use microsim_core_rs::SimulationConfig;
//!
//! let config = SimulationConfig::from_json_str(r#"{
//!     "seed": 7,
//!     "housing": { "name": "housing", "max_iterations": 3 }
//! }"#).unwrap();
//!
//! assert_eq!(config.seed, 7);
//! assert_eq!(config.housing.max_iterations, 3);
//! assert_eq!(config.housing.choice_set_size, 10);
//! assert_eq!(config.marriage.name, "marriage-market");
//!
//! let (marriage, housing) = config.seeded_markets();
//! assert_ne!(marriage.seed, housing.seed);
//! ```

use crate::rng::RngManager;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration for one simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Master seed; markets without an explicit seed draw theirs from it
    pub seed: u64,

    pub marriage: MarketConfig,

    pub housing: MarketConfig,

    /// Dependent-repository wiring, by repository name
    pub repositories: Vec<RepositoryDecl>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 12345,
            marriage: MarketConfig::named("marriage-market"),
            housing: MarketConfig::named("housing-market"),
            repositories: vec![RepositoryDecl {
                name: "persons".to_string(),
                dependents: vec!["educations".to_string()],
            }],
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Market configs with every seed resolved
    ///
    /// One seed per market is drawn from the master seed, marriage first and
    /// housing second. An explicit market seed wins over its draw, and the draw
    /// is still consumed so the other market's seed does not shift.
    pub fn seeded_markets(&self) -> (MarketConfig, MarketConfig) {
        let mut master = RngManager::new(self.seed);
        let marriage = self.marriage.seeded_or(master.next_seed());
        let housing = self.housing.seeded_or(master.next_seed());
        (marriage, housing)
    }

    /// Check parameter ranges
    ///
    /// Repository wiring is checked for cycles when the population is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.marriage.validate()?;
        self.housing.validate()?;
        if self.marriage.name == self.housing.name {
            return Err(ConfigError::Invalid(format!(
                "markets must have distinct names, both are '{}'",
                self.marriage.name
            )));
        }
        for decl in &self.repositories {
            if decl.name.is_empty() {
                return Err(ConfigError::Invalid(
                    "repository declaration with empty name".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Seed of a market built outside a `SimulationConfig` without one
pub const DEFAULT_MARKET_SEED: u64 = 12345;

/// Parameters of one market model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub name: String,

    /// Upper bound on clearing rounds per cycle
    pub max_iterations: usize,

    /// Number of sellers each buyer samples
    pub choice_set_size: usize,

    /// Explicit seed; absent means drawn from the run's master seed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self::named("market")
    }
}

impl MarketConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_iterations: 10,
            choice_set_size: 10,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Seed the market starts from
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_MARKET_SEED)
    }

    fn seeded_or(&self, drawn: u64) -> Self {
        let mut config = self.clone();
        if config.seed.is_none() {
            config.seed = Some(drawn);
        }
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("market name must not be empty".to_string()));
        }
        if self.choice_set_size == 0 {
            return Err(ConfigError::Invalid(format!(
                "market '{}': choice_set_size must be greater than zero",
                self.name
            )));
        }
        Ok(())
    }
}

/// An origin repository and the repositories mirroring it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryDecl {
    pub name: String,

    #[serde(default)]
    pub dependents: Vec<String>,
}
