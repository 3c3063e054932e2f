//! Housing market
//!
//! Households without a dwelling bid on vacant dwellings. Dwellings are
//! partitioned into one seller type per `DwellingType`. Pricing is supplied
//! by the caller; the market clears once per month.

use super::{sample_distinct, ModuleError, YearlyModule};
use crate::config::MarketConfig;
use crate::core::MONTHS_PER_YEAR;
use crate::market::{
    self, Bid, ClearingReport, MarketError, MarketModel, SellerSnapshot, SellerValue,
};
use crate::models::{Dwelling, DwellingType, Household, Tenure};
use crate::population::Population;
use crate::repository::{EntityId, Repository};
use crate::rng::RngManager;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

type AskFn = dyn Fn(&Dwelling) -> (f64, f64) + Send + Sync;
type BidFn = dyn Fn(&Household, &Dwelling, f64) -> f64 + Send + Sync;

/// Caller-supplied price formation
pub struct HousingPricing {
    ask: Box<AskFn>,
    bid: Box<BidFn>,
}

impl HousingPricing {
    /// `ask` gives (asking price, minimum price) of a vacant dwelling; `bid`
    /// gives a household's offer given the asking price
    pub fn new(
        ask: impl Fn(&Dwelling) -> (f64, f64) + Send + Sync + 'static,
        bid: impl Fn(&Household, &Dwelling, f64) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            ask: Box::new(ask),
            bid: Box::new(bid),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HomeSeeker {
    pub id: EntityId,
    pub household: Household,
}

#[derive(Debug, Clone)]
pub struct ListedDwelling {
    pub id: EntityId,
    pub dwelling: Dwelling,
}

/// Sales since the start of the current year
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SalesTotals {
    pub sold: usize,
    pub total_price: f64,
}

pub struct HousingMarket {
    config: MarketConfig,
    households: Arc<Repository<Household>>,
    dwellings: Arc<Repository<Dwelling>>,
    pricing: HousingPricing,
    totals: Mutex<SalesTotals>,
    reports: Vec<ClearingReport>,
}

impl HousingMarket {
    pub fn new(config: MarketConfig, population: &Population, pricing: HousingPricing) -> Self {
        Self {
            config,
            households: Arc::clone(&population.households),
            dwellings: Arc::clone(&population.dwellings),
            pricing,
            totals: Mutex::new(SalesTotals::default()),
            reports: Vec::new(),
        }
    }

    pub fn totals(&self) -> SalesTotals {
        *self.totals.lock()
    }

    /// Reports of the cycles run since the start of the current year
    pub fn reports(&self) -> &[ClearingReport] {
        &self.reports
    }

    /// Run one clearing cycle for `month` of `year`
    pub fn execute_month(&mut self, year: u32, month: u32) -> Result<ClearingReport, ModuleError> {
        let seed = self
            .config
            .effective_seed()
            .wrapping_mul(u64::from(year))
            .wrapping_add(u64::from(month));
        let mut rng = RngManager::new(seed);
        let report = market::execute(&*self, &mut rng, self.config.max_iterations)
            .map_err(|e| ModuleError::new(&self.config.name, "execute_month", e))?;
        debug!(year, month, sold = report.matches, "housing market month cleared");
        self.reports.push(report.clone());
        Ok(report)
    }
}

impl MarketModel for HousingMarket {
    type Buyer = HomeSeeker;
    type Seller = ListedDwelling;

    fn name(&self) -> &str {
        &self.config.name
    }

    fn get_buyers(&self, _rng: &mut RngManager) -> Result<Vec<HomeSeeker>, MarketError> {
        Ok(self
            .households
            .read()
            .iter()
            .filter(|(_, h)| h.is_homeless())
            .map(|(id, h)| HomeSeeker {
                id,
                household: h.clone(),
            })
            .collect())
    }

    fn get_sellers(
        &self,
        _rng: &mut RngManager,
    ) -> Result<SellerSnapshot<ListedDwelling>, MarketError> {
        let mut by_type: SellerSnapshot<ListedDwelling> =
            DwellingType::ALL.iter().map(|_| Vec::new()).collect();
        for (id, dwelling) in self.dwellings.read().iter().filter(|(_, d)| d.is_vacant()) {
            let (asking, minimum) = (self.pricing.ask)(dwelling);
            by_type[dwelling.dwelling_type.index()].push(SellerValue::new(
                ListedDwelling {
                    id,
                    dwelling: dwelling.clone(),
                },
                asking,
                minimum,
            ));
        }
        Ok(by_type)
    }

    fn select_sellers(
        &self,
        rng: &mut RngManager,
        buyer: &HomeSeeker,
        sellers: &SellerSnapshot<ListedDwelling>,
    ) -> Result<Vec<Vec<Bid>>, MarketError> {
        let total: usize = sellers.iter().map(Vec::len).sum();
        let mut bids: Vec<Vec<Bid>> = sellers.iter().map(|_| Vec::new()).collect();

        for flat in sample_distinct(rng, total, self.config.choice_set_size) {
            let mut index = flat;
            for (seller_type, group) in sellers.iter().enumerate() {
                if index < group.len() {
                    let listing = &group[index];
                    let amount = (self.pricing.bid)(
                        &buyer.household,
                        &listing.unit.dwelling,
                        listing.asking_price,
                    );
                    bids[seller_type].push(Bid::new(amount, index));
                    break;
                }
                index -= group.len();
            }
        }
        Ok(bids)
    }

    fn resolve_sale(
        &self,
        buyer: &HomeSeeker,
        seller: &ListedDwelling,
        amount: f64,
    ) -> Result<(), MarketError> {
        self.households.update(buyer.id, |h| {
            h.dwelling = Some(seller.id);
            h.tenure = Tenure::Own;
        })?;
        self.dwellings.update(seller.id, |d| {
            d.household = Some(buyer.id);
            d.value = amount;
        })?;

        let mut totals = self.totals.lock();
        totals.sold += 1;
        totals.total_price += amount;
        Ok(())
    }
}

impl YearlyModule for HousingMarket {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn before_yearly_execute(&mut self, _year: u32) -> Result<(), ModuleError> {
        *self.totals.lock() = SalesTotals::default();
        self.reports.clear();
        Ok(())
    }

    fn execute(&mut self, year: u32) -> Result<(), ModuleError> {
        for month in 0..MONTHS_PER_YEAR {
            self.execute_month(year, month)?;
        }
        Ok(())
    }

    fn after_yearly_execute(&mut self, year: u32) -> Result<(), ModuleError> {
        let totals = self.totals();
        info!(
            year,
            sold = totals.sold,
            total_price = totals.total_price,
            "housing market year finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_pricing() -> HousingPricing {
        HousingPricing::new(|d| (d.value, d.value * 0.9), |_, _, asking| asking)
    }

    #[test]
    fn test_sellers_partitioned_by_type() {
        let population = Population::new().unwrap();
        population.load().unwrap();
        population.dwellings.add(Dwelling::new(DwellingType::ApartmentHigh, 2, 100.0)).unwrap();
        population.dwellings.add(Dwelling::new(DwellingType::Detached, 5, 300.0)).unwrap();
        let mut occupied = Dwelling::new(DwellingType::Detached, 4, 200.0);
        occupied.household = Some(EntityId(0));
        population.dwellings.add(occupied).unwrap();

        let market =
            HousingMarket::new(MarketConfig::named("housing"), &population, flat_pricing());
        let sellers = market.get_sellers(&mut RngManager::new(1)).unwrap();

        assert_eq!(sellers.len(), DwellingType::ALL.len());
        assert_eq!(sellers[DwellingType::Detached.index()].len(), 1);
        assert_eq!(sellers[DwellingType::ApartmentHigh.index()].len(), 1);
        assert_eq!(sellers[DwellingType::Detached.index()][0].minimum_price, 270.0);
    }

    #[test]
    fn test_year_totals_reset() {
        let population = Population::new().unwrap();
        population.load().unwrap();
        let household = population.households.add(Household::new(vec![EntityId(0)])).unwrap();
        population.dwellings.add(Dwelling::new(DwellingType::Attached, 3, 150.0)).unwrap();
        assert_eq!(population.households.get(household).unwrap().tenure, Tenure::Rent);

        let mut market =
            HousingMarket::new(MarketConfig::named("housing"), &population, flat_pricing());
        market.before_yearly_execute(2000).unwrap();
        YearlyModule::execute(&mut market, 2000).unwrap();
        assert_eq!(
            market.totals(),
            SalesTotals {
                sold: 1,
                total_price: 150.0,
            }
        );
        assert_eq!(market.reports().len(), 12);
        assert_eq!(population.households.get(household).unwrap().tenure, Tenure::Own);

        market.before_yearly_execute(2001).unwrap();
        assert_eq!(market.totals(), SalesTotals::default());
        assert!(market.reports().is_empty());
    }
}
