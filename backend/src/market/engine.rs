//! Clearing engine
//!
//! One call to [`execute`] is one clearing cycle:
//!
//! ```text
//! 1. Snapshot buyers and sellers (concurrently, pre-drawn seeds)
//! 2. Build choice sets (parallel over buyers, one lock per seller list)
//! 3. Sort every choice set
//! 4. Clearing rounds, up to max_iterations:
//!    a. every seller pops its best bid (parallel) → tentative successes
//!    b. stop if there were none
//!    c. finalize one seller per buyer, in ascending buyer order
//!    d. sweep finalized buyers out of every remaining choice set
//! ```
//!
//! Seeds are always drawn from the master generator before work is fanned
//! out, and every tie-break is on slot indices, so thread count and
//! scheduling cannot change the outcome.

use super::types::{Bid, ClearingReport};
use super::{MarketError, MarketModel, SellerSnapshot};
use crate::rng::RngManager;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use tracing::{debug, info};

/// Bids on one seller slot
///
/// Kept worst-first so the best bid is popped from the back.
#[derive(Debug, Default)]
struct ChoiceSet {
    bids: Vec<Bid>,
}

impl ChoiceSet {
    /// Order bids and keep only each buyer's highest bid
    fn sort(&mut self) {
        self.bids.sort_by(compare_bids);
        let mut seen = HashSet::with_capacity(self.bids.len());
        let mut kept: Vec<Bid> = self
            .bids
            .drain(..)
            .rev()
            .filter(|bid| seen.insert(bid.buyer_index))
            .collect();
        kept.reverse();
        self.bids = kept;
    }

    /// Pop the best bid together with its clearing price
    fn pop_best(&mut self) -> Option<(Bid, f64)> {
        let best = self.bids.pop()?;
        let price = self.bids.last().map_or(best.amount, |next| next.amount);
        Some((best, price))
    }

    fn clear(&mut self) {
        self.bids.clear();
    }
}

/// Ascending by amount, then by buyer slot: the best bid sorts last
///
/// Equal amounts therefore favour the higher buyer slot.
fn compare_bids(a: &Bid, b: &Bid) -> Ordering {
    a.amount
        .total_cmp(&b.amount)
        .then(a.buyer_index.cmp(&b.buyer_index))
}

/// A seller's best bid for one round, not yet finalized
#[derive(Debug, Clone, Copy)]
struct Tentative {
    buyer_index: usize,
    /// Flat seller slot
    slot: usize,
    clearing_price: f64,
}

/// Flat addressing of seller slots across seller types
struct SlotLayout {
    /// First flat slot of each seller type
    offsets: Vec<usize>,
    /// Flat slot → (seller type, index within type)
    slots: Vec<(usize, usize)>,
}

impl SlotLayout {
    fn new<S>(sellers: &SellerSnapshot<S>) -> Self {
        let mut offsets = Vec::with_capacity(sellers.len());
        let mut slots = Vec::new();
        for (seller_type, group) in sellers.iter().enumerate() {
            offsets.push(slots.len());
            slots.extend((0..group.len()).map(|index| (seller_type, index)));
        }
        Self { offsets, slots }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Run one clearing cycle of `market`
///
/// Fails fast, before any `resolve_sale`, if `select_sellers` names a seller
/// type or seller outside the snapshot. Errors from `resolve_sale` abort the
/// cycle after the matches already settled.
pub fn execute<M: MarketModel>(
    market: &M,
    rng: &mut RngManager,
    max_iterations: usize,
) -> Result<ClearingReport, MarketError> {
    let buyer_seed = rng.next_seed();
    let seller_seed = rng.next_seed();
    let (buyers, sellers) = rayon::join(
        || market.get_buyers(&mut RngManager::new(buyer_seed)),
        || market.get_sellers(&mut RngManager::new(seller_seed)),
    );
    let buyers = buyers?;
    let sellers = sellers?;
    let layout = SlotLayout::new(&sellers);

    let mut report = ClearingReport {
        market: market.name().to_string(),
        buyers: buyers.len(),
        sellers: layout.len(),
        ..ClearingReport::default()
    };

    let mut choice_sets = build_choice_sets(market, rng, &buyers, &sellers, &layout, &mut report)?;
    debug!(
        market = market.name(),
        buyers = report.buyers,
        sellers = report.sellers,
        bids = report.bids_placed,
        below_floor = report.bids_below_floor,
        "choice sets built"
    );

    let mut finalized = vec![false; buyers.len()];
    for round in 0..max_iterations {
        let tentatives: Vec<Tentative> = choice_sets
            .par_iter_mut()
            .enumerate()
            .filter_map(|(slot, set)| {
                set.pop_best().map(|(bid, clearing_price)| Tentative {
                    buyer_index: bid.buyer_index,
                    slot,
                    clearing_price,
                })
            })
            .collect();
        if tentatives.is_empty() {
            break;
        }
        report.rounds += 1;

        let winners = select_winners(&tentatives);
        for (&buyer_index, winner) in &winners {
            let (seller_type, seller_index) = layout.slots[winner.slot];
            market.resolve_sale(
                &buyers[buyer_index],
                &sellers[seller_type][seller_index].unit,
                winner.clearing_price,
            )?;
            choice_sets[winner.slot].clear();
            finalized[buyer_index] = true;
            report.matches += 1;
            report.total_clearing_price += winner.clearing_price;
        }

        let matched = &finalized;
        choice_sets
            .par_iter_mut()
            .for_each(|set| set.bids.retain(|bid| !matched[bid.buyer_index]));

        debug!(
            market = market.name(),
            round,
            tentative = tentatives.len(),
            matched = winners.len(),
            "clearing round finished"
        );
    }

    info!(
        market = %report.market,
        matches = report.matches,
        rounds = report.rounds,
        total_clearing_price = report.total_clearing_price,
        "market cleared"
    );
    Ok(report)
}

/// Populate and sort one choice set per seller slot
fn build_choice_sets<M: MarketModel>(
    market: &M,
    rng: &mut RngManager,
    buyers: &[M::Buyer],
    sellers: &SellerSnapshot<M::Seller>,
    layout: &SlotLayout,
    report: &mut ClearingReport,
) -> Result<Vec<ChoiceSet>, MarketError> {
    let seeds = rng.sub_seeds(buyers.len());
    let lists: Vec<Mutex<ChoiceSet>> = (0..layout.len()).map(|_| Mutex::default()).collect();
    let placed = AtomicUsize::new(0);
    let below_floor = AtomicUsize::new(0);

    buyers
        .par_iter()
        .zip(seeds.par_iter())
        .enumerate()
        .try_for_each(|(buyer_index, (buyer, &seed))| -> Result<(), MarketError> {
            let mut buyer_rng = RngManager::new(seed);
            let bids_by_type = market.select_sellers(&mut buyer_rng, buyer, sellers)?;
            for (seller_type, bids) in bids_by_type.into_iter().enumerate() {
                let group = sellers.get(seller_type).ok_or_else(|| {
                    MarketError::SellerTypeOutOfRange {
                        market: market.name().to_string(),
                        seller_type,
                        available: sellers.len(),
                    }
                })?;
                for mut bid in bids {
                    let seller = group.get(bid.seller_index).ok_or_else(|| {
                        MarketError::IndexOutOfRange {
                            market: market.name().to_string(),
                            seller_type,
                            seller_index: bid.seller_index,
                            available: group.len(),
                        }
                    })?;
                    if bid.amount >= seller.minimum_price {
                        bid.buyer_index = buyer_index;
                        let slot = layout.offsets[seller_type] + bid.seller_index;
                        lists[slot].lock().bids.push(bid);
                        placed.fetch_add(1, AtomicOrdering::Relaxed);
                    } else {
                        below_floor.fetch_add(1, AtomicOrdering::Relaxed);
                    }
                }
            }
            Ok(())
        })?;

    report.bids_placed = placed.into_inner();
    report.bids_below_floor = below_floor.into_inner();

    let mut choice_sets: Vec<ChoiceSet> = lists.into_iter().map(|list| list.into_inner()).collect();
    choice_sets.par_iter_mut().for_each(ChoiceSet::sort);
    Ok(choice_sets)
}

/// Pick one seller per buyer from this round's tentative successes
///
/// Highest clearing price wins; equal prices go to the higher seller slot.
/// Keyed by buyer slot so settlement happens in ascending buyer order.
fn select_winners(tentatives: &[Tentative]) -> BTreeMap<usize, Tentative> {
    let mut winners: BTreeMap<usize, Tentative> = BTreeMap::new();
    for candidate in tentatives {
        winners
            .entry(candidate.buyer_index)
            .and_modify(|current| {
                let better = candidate
                    .clearing_price
                    .total_cmp(&current.clearing_price)
                    .then(candidate.slot.cmp(&current.slot))
                    == Ordering::Greater;
                if better {
                    *current = *candidate;
                }
            })
            .or_insert(*candidate);
    }
    winners
}
