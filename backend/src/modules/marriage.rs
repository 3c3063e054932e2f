//! Marriage market
//!
//! Single adult males bid on single adult females. Each male scores a random
//! sample of candidates with a caller-supplied match function; the market
//! pairs them off and every match forms a new family in a new household.

use super::{sample_distinct, ModuleError, YearlyModule};
use crate::config::MarketConfig;
use crate::core::Date;
use crate::market::{
    self, Bid, ClearingReport, MarketError, MarketModel, SellerSnapshot, SellerValue,
};
use crate::models::{Family, Household, MaritalStatus, Person, Sex};
use crate::population::Population;
use crate::repository::{EntityId, Repository};
use crate::rng::RngManager;
use std::sync::Arc;
use tracing::info;

/// Scores a (male, female) pairing; higher is better
pub type MatchScore = dyn Fn(&Person, &Person) -> f64 + Send + Sync;

/// A person as seen by the marriage market
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: EntityId,
    pub person: Person,
}

pub struct MarriageMarket {
    config: MarketConfig,
    persons: Arc<Repository<Person>>,
    families: Arc<Repository<Family>>,
    households: Arc<Repository<Household>>,
    score: Box<MatchScore>,
    minimum_age: u32,
    rng: RngManager,
    year: u32,
    last_report: Option<ClearingReport>,
}

impl MarriageMarket {
    pub fn new(
        config: MarketConfig,
        population: &Population,
        score: impl Fn(&Person, &Person) -> f64 + Send + Sync + 'static,
    ) -> Self {
        let rng = RngManager::new(config.effective_seed());
        Self {
            config,
            persons: Arc::clone(&population.persons),
            families: Arc::clone(&population.families),
            households: Arc::clone(&population.households),
            score: Box::new(score),
            minimum_age: 16,
            rng,
            year: 0,
            last_report: None,
        }
    }

    pub fn with_minimum_age(mut self, minimum_age: u32) -> Self {
        self.minimum_age = minimum_age;
        self
    }

    /// Report of the most recent clearing cycle
    pub fn last_report(&self) -> Option<&ClearingReport> {
        self.last_report.as_ref()
    }

    fn candidates(&self, sex: Sex) -> Vec<Candidate> {
        self.persons
            .read()
            .iter()
            .filter(|(_, p)| p.living && p.sex == sex && p.age >= self.minimum_age && p.is_single())
            .map(|(id, p)| Candidate {
                id,
                person: p.clone(),
            })
            .collect()
    }

    /// Take `person` out of the family they currently belong to
    fn leave_family(&self, person: EntityId) -> Result<(), MarketError> {
        let family = self.persons.with(person, |p| p.family)?;
        if let Some(family) = family {
            let persons = self.persons.read();
            self.families
                .update(family, |f| f.remove_person(person, &persons))?;
        }
        Ok(())
    }

    fn marry(
        &self,
        person: EntityId,
        spouse: EntityId,
        family: EntityId,
    ) -> Result<(), MarketError> {
        self.persons.update(person, |p| {
            p.spouse = Some(spouse);
            p.marital_status = MaritalStatus::Married;
            p.family = Some(family);
        })?;
        Ok(())
    }
}

impl MarketModel for MarriageMarket {
    type Buyer = Candidate;
    type Seller = Candidate;

    fn name(&self) -> &str {
        &self.config.name
    }

    fn get_buyers(&self, _rng: &mut RngManager) -> Result<Vec<Candidate>, MarketError> {
        Ok(self.candidates(Sex::Male))
    }

    fn get_sellers(&self, _rng: &mut RngManager) -> Result<SellerSnapshot<Candidate>, MarketError> {
        let females = self.candidates(Sex::Female);
        Ok(vec![females.into_iter().map(SellerValue::unpriced).collect()])
    }

    fn select_sellers(
        &self,
        rng: &mut RngManager,
        buyer: &Candidate,
        sellers: &SellerSnapshot<Candidate>,
    ) -> Result<Vec<Vec<Bid>>, MarketError> {
        let Some(females) = sellers.first() else {
            return Ok(Vec::new());
        };
        let bids = sample_distinct(rng, females.len(), self.config.choice_set_size)
            .into_iter()
            .map(|index| {
                let score = (self.score)(&buyer.person, &females[index].unit.person);
                Bid::new(score, index)
            })
            .collect();
        Ok(vec![bids])
    }

    fn resolve_sale(
        &self,
        buyer: &Candidate,
        seller: &Candidate,
        _amount: f64,
    ) -> Result<(), MarketError> {
        self.leave_family(buyer.id)?;
        self.leave_family(seller.id)?;

        let family = self
            .families
            .add(Family::married(buyer.id, seller.id, Date::start_of_year(self.year)))?;
        let household = self.households.add(Household::new(vec![family]))?;
        self.families.update(family, |f| f.household = Some(household))?;

        self.marry(buyer.id, seller.id, family)?;
        self.marry(seller.id, buyer.id, family)
    }
}

impl YearlyModule for MarriageMarket {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn before_first_year(&mut self, _first_year: u32) -> Result<(), ModuleError> {
        self.rng = RngManager::new(self.config.effective_seed());
        Ok(())
    }

    fn execute(&mut self, year: u32) -> Result<(), ModuleError> {
        self.year = year;
        let mut rng = self.rng.clone();
        let result = market::execute(&*self, &mut rng, self.config.max_iterations);
        self.rng = rng;

        let report = result.map_err(|e| ModuleError::new(&self.config.name, "execute", e))?;
        info!(year, marriages = report.matches, "marriage market cleared");
        self.last_report = Some(report);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population_with(people: &[(u32, Sex)]) -> (Population, Vec<EntityId>) {
        let population = Population::new().unwrap();
        population.load().unwrap();
        let ids = people
            .iter()
            .map(|&(age, sex)| population.persons.add(Person::new(age, sex)).unwrap())
            .collect();
        (population, ids)
    }

    #[test]
    fn test_minors_and_married_are_excluded() {
        let (population, ids) =
            population_with(&[(30, Sex::Male), (12, Sex::Male), (25, Sex::Female)]);
        population
            .persons
            .update(ids[2], |p| p.marital_status = MaritalStatus::Married)
            .unwrap();

        let market = MarriageMarket::new(MarketConfig::named("marriage"), &population, |_, _| 1.0);
        let males = market.candidates(Sex::Male);
        assert_eq!(males.len(), 1);
        assert_eq!(males[0].id, ids[0]);
        assert!(market.candidates(Sex::Female).is_empty());
    }

    #[test]
    fn test_resolve_sale_forms_family_and_household() {
        let (population, ids) = population_with(&[(30, Sex::Male), (28, Sex::Female)]);
        let mut market =
            MarriageMarket::new(MarketConfig::named("marriage"), &population, |_, _| 1.0);
        YearlyModule::execute(&mut market, 2001).unwrap();

        assert_eq!(market.last_report().unwrap().matches, 1);
        let husband = population.persons.get(ids[0]).unwrap();
        let wife = population.persons.get(ids[1]).unwrap();
        assert_eq!(husband.spouse, Some(ids[1]));
        assert_eq!(wife.spouse, Some(ids[0]));
        assert_eq!(husband.family, wife.family);

        let family = population.families.get(husband.family.unwrap()).unwrap();
        assert_eq!(family.male_head, Some(ids[0]));
        assert_eq!(family.marriage_date, Some(Date::start_of_year(2001)));
        let household = population.households.get(family.household.unwrap()).unwrap();
        assert!(household.is_homeless());
    }
}
