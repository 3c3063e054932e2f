//! Market Module
//!
//! Generic one-shot double auction. An owning module implements
//! [`MarketModel`] to describe who buys, who sells, how buyers search, and
//! how a finalized match is settled; [`engine::execute`] does the clearing.
//!
//! # Critical Invariants
//!
//! 1. **Determinism**: same master seed + same snapshot → same ordered
//!    sequence of `resolve_sale` calls, whatever the worker-pool size
//! 2. **Single match**: within one cycle a seller slot and a buyer are each
//!    finalized at most once
//! 3. **Clearing price**: a match settles at the next-best remaining bid on
//!    that seller, or at the winning bid when none remains
//! 4. **Floor**: no bid under a seller's minimum price ever enters clearing
//!
//! # Tie-breaks
//!
//! Equal bids on one seller favour the higher buyer slot. A buyer winning
//! several sellers in one round takes the highest clearing price, equal prices
//! favouring the higher seller slot (seller type first, then index).

pub mod engine;
pub mod types;

use crate::repository::RepositoryError;
use crate::rng::RngManager;
use thiserror::Error;

pub use engine::execute;
pub use types::{Bid, ClearingReport, SellerValue};

/// Errors that abort a clearing cycle
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketError {
    #[error("market '{market}': bids for seller type {seller_type}, only {available} types exist")]
    SellerTypeOutOfRange {
        market: String,
        seller_type: usize,
        available: usize,
    },

    #[error("market '{market}': seller {seller_index} of type {seller_type} out of {available}")]
    IndexOutOfRange {
        market: String,
        seller_type: usize,
        seller_index: usize,
        available: usize,
    },

    #[error("market '{market}' failed in {operation}: {reason}")]
    Rejected {
        market: String,
        operation: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Seller snapshot, one list per seller type
pub type SellerSnapshot<S> = Vec<Vec<SellerValue<S>>>;

/// Hooks an owning module supplies to the clearing engine
///
/// Snapshot and search hooks run on worker threads, possibly concurrently;
/// `resolve_sale` runs on the calling thread, in a deterministic order.
pub trait MarketModel: Sync {
    type Buyer: Send + Sync;
    type Seller: Send + Sync;

    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Buyers eligible this cycle
    fn get_buyers(&self, rng: &mut RngManager) -> Result<Vec<Self::Buyer>, MarketError>;

    /// Sellers, partitioned by seller type
    fn get_sellers(&self, rng: &mut RngManager)
        -> Result<SellerSnapshot<Self::Seller>, MarketError>;

    /// The buyer's search policy: bids per seller type, indexed into `sellers`
    fn select_sellers(
        &self,
        rng: &mut RngManager,
        buyer: &Self::Buyer,
        sellers: &SellerSnapshot<Self::Seller>,
    ) -> Result<Vec<Vec<Bid>>, MarketError>;

    /// Settle one finalized match at its clearing price
    fn resolve_sale(
        &self,
        buyer: &Self::Buyer,
        seller: &Self::Seller,
        amount: f64,
    ) -> Result<(), MarketError>;

    /// Run one clearing cycle with at most `max_iterations` rounds
    fn execute(
        &self,
        rng: &mut RngManager,
        max_iterations: usize,
    ) -> Result<ClearingReport, MarketError>
    where
        Self: Sized,
    {
        engine::execute(self, rng, max_iterations)
    }
}
