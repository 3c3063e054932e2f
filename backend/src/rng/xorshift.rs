//! xorshift64* random number generator
//!
//! This is a fast, high-quality PRNG that is deterministic and suitable
//! for simulation purposes.
//!
//! # Algorithm
//!
//! xorshift64* is a variant of xorshift that passes TestU01's BigCrush
//! statistical tests. It uses 64-bit state and produces 64-bit output.
//!
//! # Splitting
//!
//! A generator is split by drawing sub-seeds from it. The draw is sequential,
//! so the seed handed to task `i` depends only on the parent seed and `i`,
//! never on which task happens to run first.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use microsim_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let slot = rng.index(10); // [0, 10)
/// assert!(slot < 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    /// Internal state (64-bit)
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is replaced by 1, since xorshift never leaves the all-zero state.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Draw a sub-seed for a child generator
    pub fn next_seed(&mut self) -> u64 {
        self.next()
    }

    /// Draw `count` sub-seeds, in order
    ///
    /// # Example
    /// ```
    /// use microsim_core_rs::RngManager;
    ///
    /// let mut a = RngManager::new(7);
    /// let mut b = RngManager::new(7);
    /// assert_eq!(a.sub_seeds(4), b.sub_seeds(4));
    /// ```
    pub fn sub_seeds(&mut self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.next_seed()).collect()
    }

    /// Split off an independent child generator
    pub fn fork(&mut self) -> RngManager {
        RngManager::new(self.next_seed())
    }

    /// Generate a uniform index in `[0, len)`
    ///
    /// # Panics
    /// Panics if `len` is zero
    pub fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "len must be positive");
        (self.next() % len as u64) as usize
    }

    /// Get current RNG state (for replay)
    ///
    /// ```
    /// use microsim_core_rs::RngManager;
    ///
    /// let mut rng = RngManager::new(12345);
    /// rng.next();
    /// let mut replay = RngManager::new(rng.get_state());
    /// assert_eq!(rng.next(), replay.next());
    /// ```
    pub fn get_state(&self) -> u64 {
        self.state
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        // 53 significant bits, divided by 2^53
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Generate random f32 in range [0.0, 1.0)
    pub fn next_f32(&mut self) -> f32 {
        let value = self.next();
        (value >> 40) as f32 * (1.0 / ((1u32 << 24) as f32))
    }
}
