//! Calendar for the simulation
//!
//! The simulation advances in whole months grouped into years. A `Date` is a
//! count of months since year 0, so ordering and arithmetic are plain integer
//! operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of months in a simulated year
pub const MONTHS_PER_YEAR: u32 = 12;

/// A point on the simulation calendar, month resolution
///
/// # Example
/// ```
/// use microsim_core_rs::Date;
///
/// let mut date = Date::new(1986, 11);
/// assert_eq!(date.year(), 1986);
/// assert_eq!(date.month(), 11);
///
/// date.advance_month();
/// assert_eq!(date, Date::new(1987, 0));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Date {
    /// Months elapsed since year 0
    months: u32,
}

impl Date {
    /// Create a date from a year and a 0-indexed month
    ///
    /// # Panics
    /// Panics if `month` is not below 12
    pub fn new(year: u32, month: u32) -> Self {
        assert!(month < MONTHS_PER_YEAR, "month must be in 0..12");
        Self {
            months: year * MONTHS_PER_YEAR + month,
        }
    }

    /// Create a date from a raw month count
    pub fn from_months(months: u32) -> Self {
        Self { months }
    }

    /// First month of `year`
    pub fn start_of_year(year: u32) -> Self {
        Self::new(year, 0)
    }

    /// Months elapsed since year 0
    pub fn months(&self) -> u32 {
        self.months
    }

    pub fn year(&self) -> u32 {
        self.months / MONTHS_PER_YEAR
    }

    /// Month within the year (0-indexed)
    pub fn month(&self) -> u32 {
        self.months % MONTHS_PER_YEAR
    }

    /// Advance by one month
    pub fn advance_month(&mut self) {
        self.months += 1;
    }

    /// Date `months` later
    pub fn plus_months(&self, months: u32) -> Self {
        Self {
            months: self.months + months,
        }
    }

    /// Whole years from `earlier` to `self`, zero if `earlier` is later
    pub fn years_since(&self, earlier: Date) -> u32 {
        self.months.saturating_sub(earlier.months) / MONTHS_PER_YEAR
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year(), self.month() + 1)
    }
}
