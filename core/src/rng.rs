//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through StreamRng instances derived
//! from the single master seed stored on the run record.
//!
//! Each draw stage gets its own stream per trial, seeded from
//! (master_seed, slot, trial). This means:
//!   - Adding a new stage never changes existing stages' streams.
//!   - Any trial can be reproduced in isolation.

use crate::{
    error::{SimError, SimResult},
    types::{ActivityPoints, Trial},
};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Geometric};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single draw stage.
pub struct StreamRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl StreamRng {
    /// Create a stream from the master seed and a stable stream index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// Draw an integer in the half-open range [low, high).
    pub fn int_in_range(
        &mut self,
        low: ActivityPoints,
        high: ActivityPoints,
    ) -> SimResult<ActivityPoints> {
        if low >= high {
            return Err(SimError::InvalidRange { low, high });
        }
        Ok(self.inner.gen_range(low..high))
    }

    /// Number of Bernoulli(p) trials up to and including the first success.
    /// Support is 1, 2, 3, ...
    pub fn geometric(&mut self, p: f64) -> SimResult<ActivityPoints> {
        if !(p > 0.0 && p <= 1.0) {
            return Err(SimError::InvalidProbability { p });
        }
        let dist = Geometric::new(p).map_err(|_| SimError::InvalidProbability { p })?;
        // rand_distr counts failures before the first success.
        let failures: u64 = dist.sample(&mut self.inner);
        Ok(failures
            .saturating_add(1)
            .min(ActivityPoints::MAX as u64) as ActivityPoints)
    }
}

/// All draw streams for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// The stream for `slot` within `trial`. Calling this twice with the
    /// same arguments yields two identical streams.
    pub fn for_stream_at_trial(&self, slot: StreamSlot, trial: Trial) -> StreamRng {
        let index = trial
            .wrapping_mul(StreamSlot::COUNT)
            .wrapping_add(slot as u64);
        StreamRng::new(self.master_seed, index).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every stage's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Thresholds   = 0,
    BaseActivity = 1,
    Activity     = 2,
    // Add new stages here, append only.
}

impl StreamSlot {
    /// Stride between trials. Leaves room for appended slots.
    pub const COUNT: u64 = 16;

    pub fn name(&self) -> &'static str {
        match self {
            Self::Thresholds   => "thresholds",
            Self::BaseActivity => "base_activity",
            Self::Activity     => "activity",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_are_deterministic() {
        let bank_a = RngBank::new(12345);
        let bank_b = RngBank::new(12345);

        let mut a = bank_a.for_stream_at_trial(StreamSlot::Activity, 3);
        let mut b = bank_b.for_stream_at_trial(StreamSlot::Activity, 3);

        for _ in 0..50 {
            assert_eq!(a.geometric(0.2).unwrap(), b.geometric(0.2).unwrap());
        }
    }

    #[test]
    fn slots_and_trials_get_distinct_streams() {
        let bank = RngBank::new(7);
        let mut thresholds = bank.for_stream_at_trial(StreamSlot::Thresholds, 0);
        let mut activity   = bank.for_stream_at_trial(StreamSlot::Activity, 0);
        let mut next_trial = bank.for_stream_at_trial(StreamSlot::Thresholds, 1);

        let a: Vec<f64> = (0..8).map(|_| thresholds.next_f64()).collect();
        let b: Vec<f64> = (0..8).map(|_| activity.next_f64()).collect();
        let c: Vec<f64> = (0..8).map(|_| next_trial.next_f64()).collect();

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(thresholds.name, "thresholds");
    }

    #[test]
    fn int_in_range_is_half_open() {
        let mut rng = RngBank::new(1).for_stream_at_trial(StreamSlot::Thresholds, 0);
        for _ in 0..1_000 {
            let v = rng.int_in_range(8, 15).unwrap();
            assert!((8..15).contains(&v), "value {v} outside [8, 15)");
        }
        assert!(matches!(
            rng.int_in_range(5, 5),
            Err(SimError::InvalidRange { low: 5, high: 5 })
        ));
    }

    #[test]
    fn geometric_support_starts_at_one() {
        let mut rng = RngBank::new(99).for_stream_at_trial(StreamSlot::Activity, 0);
        for _ in 0..1_000 {
            assert!(rng.geometric(0.3).unwrap() >= 1);
        }
        // p = 1 always succeeds on the first trial.
        for _ in 0..100 {
            assert_eq!(rng.geometric(1.0).unwrap(), 1);
        }
    }

    #[test]
    fn geometric_rejects_probabilities_outside_unit_interval() {
        let mut rng = RngBank::new(99).for_stream_at_trial(StreamSlot::Activity, 0);
        for p in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(
                matches!(rng.geometric(p), Err(SimError::InvalidProbability { .. })),
                "p={p} should be rejected"
            );
        }
    }

    #[test]
    fn geometric_mean_is_close_to_inverse_probability() {
        let mut rng = RngBank::new(2024).for_stream_at_trial(StreamSlot::Activity, 0);
        let n = 20_000;
        let total: u64 = (0..n).map(|_| rng.geometric(0.25).unwrap() as u64).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 4.0).abs() < 0.2, "mean={mean}, expected ~4.0");
    }
}
