//! Simulation calendar

pub mod date;

pub use date::{Date, MONTHS_PER_YEAR};
