//! Transient market types
//!
//! Everything here is rebuilt on every clearing cycle and never persisted.

use serde::Serialize;

/// A seller's terms for one clearing cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SellerValue<S> {
    /// The unit on offer (a dwelling, a marriage candidate, ...)
    pub unit: S,

    /// Informational asking price
    pub asking_price: f64,

    /// Hard floor: bids below this are dropped before clearing
    pub minimum_price: f64,
}

impl<S> SellerValue<S> {
    pub fn new(unit: S, asking_price: f64, minimum_price: f64) -> Self {
        Self {
            unit,
            asking_price,
            minimum_price,
        }
    }

    /// Seller with no floor, asking nothing
    pub fn unpriced(unit: S) -> Self {
        Self::new(unit, 0.0, f64::NEG_INFINITY)
    }
}

/// A buyer's offer on one seller slot
///
/// The buyer slot is filled in by the engine when the bid is accepted into a
/// choice set; whatever a caller puts there is overwritten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bid {
    pub amount: f64,

    /// Index of the seller within its seller type
    pub seller_index: usize,

    pub(crate) buyer_index: usize,
}

impl Bid {
    pub fn new(amount: f64, seller_index: usize) -> Self {
        Self {
            amount,
            seller_index,
            buyer_index: 0,
        }
    }

    /// Buyer slot assigned by the engine
    pub fn buyer_index(&self) -> usize {
        self.buyer_index
    }
}

/// Outcome of one clearing cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearingReport {
    pub market: String,

    /// Buyers in the snapshot
    pub buyers: usize,

    /// Sellers in the snapshot, across all seller types
    pub sellers: usize,

    /// Bids accepted into choice sets
    pub bids_placed: usize,

    /// Bids dropped for falling under the seller's minimum price
    pub bids_below_floor: usize,

    /// Clearing rounds that produced at least one tentative match
    pub rounds: usize,

    /// Finalized matches (`resolve_sale` calls)
    pub matches: usize,

    /// Sum of clearing prices over all matches
    pub total_clearing_price: f64,
}

impl ClearingReport {
    pub fn average_clearing_price(&self) -> Option<f64> {
        if self.matches == 0 {
            None
        } else {
            Some(self.total_clearing_price / self.matches as f64)
        }
    }
}
