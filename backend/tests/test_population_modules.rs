//! Integration tests for the yearly modules over a shared population
//!
//! Marriage market → housing market → cleanup, driven year by year.

use microsim_core_rs::models::{Dwelling, DwellingType, MaritalStatus, Person, Sex};
use microsim_core_rs::modules::{
    CleanupTheDead, HousingMarket, HousingPricing, MarriageMarket, ModuleError, YearlyModule,
};
use microsim_core_rs::{EntityId, Population, SimulationConfig};

// ============================================================================
// Test Helpers
// ============================================================================

struct World {
    population: Population,
    modules: Vec<Box<dyn YearlyModule>>,
    men: Vec<EntityId>,
    women: Vec<EntityId>,
    dwellings: Vec<EntityId>,
}

fn world() -> World {
    microsim_core_rs::logging::init_test_tracing();
    let config = SimulationConfig::default();
    let (marriage_config, housing_config) = config.seeded_markets();
    let population = Population::with_dependencies(&config.repositories).unwrap();
    population.load().unwrap();

    let mut men = Vec::new();
    let mut women = Vec::new();
    for age in [25, 31, 40] {
        men.push(population.persons.add(Person::new(age, Sex::Male)).unwrap());
        women.push(population.persons.add(Person::new(age - 2, Sex::Female)).unwrap());
    }
    // Too young to marry
    population.persons.add(Person::new(9, Sex::Female)).unwrap();

    let dwellings = vec![
        population
            .dwellings
            .add(Dwelling::new(DwellingType::Detached, 4, 300_000.0))
            .unwrap(),
        population
            .dwellings
            .add(Dwelling::new(DwellingType::ApartmentLow, 2, 120_000.0))
            .unwrap(),
    ];

    let marriage = MarriageMarket::new(marriage_config, &population, |male, female| {
        -(f64::from(male.age) - f64::from(female.age) - 2.0).abs()
    });
    let housing = HousingMarket::new(
        housing_config,
        &population,
        HousingPricing::new(|d| (d.value, d.value * 0.8), |_, _, asking| asking),
    );
    let cleanup = CleanupTheDead::new(&population);

    World {
        population,
        modules: vec![Box::new(marriage), Box::new(housing), Box::new(cleanup)],
        men,
        women,
        dwellings,
    }
}

/// One year of every hook, each phase across all modules before the next
fn run_year(modules: &mut [Box<dyn YearlyModule>], year: u32) -> Result<(), ModuleError> {
    for module in modules.iter_mut() {
        module.before_yearly_execute(year)?;
    }
    for module in modules.iter_mut() {
        module.execute(year)?;
    }
    for module in modules.iter_mut() {
        module.after_yearly_execute(year)?;
    }
    Ok(())
}

fn start(world: &mut World, first_year: u32) {
    for module in world.modules.iter_mut() {
        module.before_first_year(first_year).unwrap();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_first_year_marries_and_houses() {
    let mut w = world();
    start(&mut w, 2000);
    run_year(&mut w.modules, 2000).unwrap();

    let persons = &w.population.persons;
    for (&man, &woman) in w.men.iter().zip(&w.women) {
        let husband = persons.get(man).unwrap();
        assert_eq!(husband.marital_status, MaritalStatus::Married);
        assert_eq!(husband.spouse, Some(woman), "Closest age match should pair up");
        assert_eq!(persons.get(woman).unwrap().spouse, Some(man));
    }
    assert_eq!(w.population.families.len(), 3);
    assert_eq!(w.population.households.len(), 3);

    let housed = w
        .population
        .households
        .read()
        .iter()
        .filter(|(_, h)| h.dwelling.is_some())
        .count();
    assert_eq!(housed, 2, "Two dwellings for three new households");
    for &d in &w.dwellings {
        let dwelling = w.population.dwellings.get(d).unwrap();
        assert!(dwelling.household.is_some());
    }
}

#[test]
fn test_cleanup_widows_and_dissolves() {
    let mut w = world();
    start(&mut w, 2000);
    run_year(&mut w.modules, 2000).unwrap();

    let husband = w.men[2];
    let wife = w.women[2];
    let family = w.population.persons.get(husband).unwrap().family.unwrap();
    let household = w.population.families.get(family).unwrap().household.unwrap();
    let home = w.population.households.get(household).unwrap().dwelling;

    w.population.persons.update(husband, |p| p.living = false).unwrap();
    run_year(&mut w.modules, 2001).unwrap();

    assert!(!w.population.persons.contains(husband));
    assert!(!w.population.educations.contains(husband), "Removal cascades to education");
    let widow = w.population.persons.get(wife).unwrap();
    assert_eq!(widow.marital_status, MaritalStatus::Widowed);
    assert_eq!(w.population.families.get(family).unwrap().persons, vec![wife]);

    w.population.persons.update(wife, |p| p.living = false).unwrap();
    run_year(&mut w.modules, 2002).unwrap();

    assert!(!w.population.families.contains(family));
    assert!(!w.population.households.contains(household));
    if let Some(home) = home {
        assert!(
            w.population.dwellings.get(home).unwrap().is_vacant(),
            "Dwelling of a dissolved household is released"
        );
    }
    assert_eq!(w.population.persons.len(), w.population.educations.len());
}

#[test]
fn test_runs_are_reproducible() {
    let snapshot = |w: &World| {
        w.population
            .persons
            .snapshot()
            .into_iter()
            .map(|(id, p)| (id, p.spouse, p.family))
            .collect::<Vec<_>>()
    };

    let mut a = world();
    let mut b = world();
    start(&mut a, 1990);
    start(&mut b, 1990);
    for year in 1990..1993 {
        run_year(&mut a.modules, year).unwrap();
        run_year(&mut b.modules, year).unwrap();
    }
    assert_eq!(snapshot(&a), snapshot(&b));
}

/// Spouse of every person after one year of a marriage market where each man
/// only sees two of twenty women
fn pairings_under(seed: u64) -> Vec<(EntityId, Option<EntityId>)> {
    let config = SimulationConfig {
        seed,
        ..SimulationConfig::default()
    };
    let population = Population::with_dependencies(&config.repositories).unwrap();
    population.load().unwrap();
    for _ in 0..20 {
        population.persons.add(Person::new(30, Sex::Male)).unwrap();
        population.persons.add(Person::new(28, Sex::Female)).unwrap();
    }

    let (mut marriage_config, _) = config.seeded_markets();
    marriage_config.choice_set_size = 2;
    let mut market = MarriageMarket::new(marriage_config, &population, |_, _| 1.0);
    market.before_first_year(2000).unwrap();
    YearlyModule::execute(&mut market, 2000).unwrap();

    population
        .persons
        .snapshot()
        .into_iter()
        .map(|(id, p)| (id, p.spouse))
        .collect()
}

#[test]
fn test_master_seed_drives_outcome() {
    assert_eq!(pairings_under(7), pairings_under(7));
    assert_ne!(
        pairings_under(7),
        pairings_under(8),
        "A different master seed samples different candidates"
    );
}
