//! Deterministic random number generation
//!
//! Uses xorshift64* for fast, seedable generation. Parallel consumers never
//! share a generator: they draw sub-seeds from a parent sequentially, before
//! any work is dispatched, and seed a private generator per task.
//! CRITICAL: All randomness in the simulation MUST go through this module.

mod xorshift;

pub use xorshift::RngManager;
