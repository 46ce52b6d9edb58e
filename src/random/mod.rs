//! Keyed, independently seeded random number streams.
//!
//! Every engine owns one [`RngData`]. Each concern that needs randomness (contact sampling,
//! infection progression, testing, ...) draws from its own stream, keyed by a type declared
//! with [`define_rng!`]. A stream is created lazily the first time it is used and is seeded with
//! `base_seed + hash(stream name)`, so adding draws to one stream never perturbs another and a
//! whole run is reproducible from the base seed alone.
mod macros;

use std::any::{Any, TypeId};
use std::cell::{RefCell, RefMut};

use log::trace;

pub use macros::define_rng;

use crate::hashing::{hash_str, HashMap};
use crate::rand::distr::uniform::{SampleRange, SampleUniform};
use crate::rand::distr::Distribution;
use crate::rand::{Rng, SeedableRng};

pub trait RngId: Copy + Clone + 'static {
    type RngType: SeedableRng + Rng + Send + 'static;
    fn get_name() -> &'static str;
}

// This is a wrapper that allows for future support for different types of
// random number generators (anything that implements SeedableRng is valid).
struct RngHolder {
    rng: Box<dyn Any + Send>,
}

/// Stores a base seed and the map of rngs keyed by their `RngId`. The map is held in a
/// `RefCell` so that sampling only needs a shared borrow of the owner.
pub struct RngData {
    base_seed: u64,
    rng_holders: RefCell<HashMap<TypeId, RngHolder>>,
}

impl RngData {
    #[must_use]
    pub fn new(base_seed: u64) -> RngData {
        trace!("initializing random streams with base seed {base_seed}");
        RngData {
            base_seed,
            rng_holders: RefCell::new(HashMap::default()),
        }
    }

    #[must_use]
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Replaces the base seed. Existing streams are dropped so that they get re-seeded the next
    /// time they are used.
    pub fn reseed(&mut self, base_seed: u64) {
        self.base_seed = base_seed;
        self.rng_holders.get_mut().clear();
    }

    /// Gets a mutable reference to the stream associated with the given [`RngId`], creating it if
    /// it has not been used before.
    ///
    /// # Panics
    ///
    /// Panics if a stream is already borrowed, i.e. if `sample` is called re-entrantly.
    fn get_rng<R: RngId>(&self) -> RefMut<'_, R::RngType> {
        let base_seed = self.base_seed;
        let rng_holders = self
            .rng_holders
            .try_borrow_mut()
            .expect("random streams must not be sampled re-entrantly");
        RefMut::map(rng_holders, |holders| {
            holders
                .entry(TypeId::of::<R>())
                .or_insert_with(|| {
                    let seed_offset = hash_str(R::get_name());
                    trace!(
                        "creating new RNG {} (seed={})",
                        R::get_name(),
                        base_seed.wrapping_add(seed_offset)
                    );
                    RngHolder {
                        rng: Box::new(R::RngType::seed_from_u64(
                            base_seed.wrapping_add(seed_offset),
                        )),
                    }
                })
                .rng
                .downcast_mut::<R::RngType>()
                .expect("rng holder always stores the type declared by its RngId")
        })
    }

    /// Gets a random sample from the stream associated with the given [`RngId`] by applying the
    /// specified sampler function.
    pub fn sample<R: RngId, T>(
        &self,
        _rng_id: R,
        sampler: impl FnOnce(&mut R::RngType) -> T,
    ) -> T {
        let mut rng = self.get_rng::<R>();
        sampler(&mut rng)
    }

    /// Gets a random sample from the specified distribution.
    pub fn sample_distr<R: RngId, T>(&self, rng_id: R, distribution: impl Distribution<T>) -> T {
        self.sample(rng_id, |rng| distribution.sample(rng))
    }

    /// Gets a random sample within the range provided by `range`.
    pub fn sample_range<R: RngId, S, T>(&self, rng_id: R, range: S) -> T
    where
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    /// Gets a random boolean value which is true with probability `p`.
    pub fn sample_bool<R: RngId>(&self, rng_id: R, p: f64) -> bool {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }
}

#[cfg(test)]
mod tests {
    use super::RngData;
    use crate::define_rng;
    use crate::rand::RngCore;
    use rand_distr::Normal;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_rng_basic() {
        let rngs = RngData::new(42);
        assert_ne!(
            rngs.sample(FooRng, RngCore::next_u64),
            rngs.sample(FooRng, RngCore::next_u64)
        );
    }

    #[test]
    fn multiple_rng_types() {
        let rngs = RngData::new(42);
        assert_ne!(
            rngs.sample(FooRng, RngCore::next_u64),
            rngs.sample(BarRng, RngCore::next_u64)
        );
    }

    #[test]
    fn streams_do_not_perturb_each_other() {
        let a = RngData::new(7);
        let b = RngData::new(7);
        // Draw from an unrelated stream on `b` first.
        let _ = b.sample(BarRng, RngCore::next_u64);
        assert_eq!(
            a.sample(FooRng, RngCore::next_u64),
            b.sample(FooRng, RngCore::next_u64)
        );
    }

    #[test]
    fn reset_seed() {
        let mut rngs = RngData::new(42);

        let run_0 = rngs.sample(FooRng, RngCore::next_u64);
        let run_1 = rngs.sample(FooRng, RngCore::next_u64);

        // Reset with same seed, ensure we get the same values
        rngs.reseed(42);
        assert_eq!(run_0, rngs.sample(FooRng, RngCore::next_u64));
        assert_eq!(run_1, rngs.sample(FooRng, RngCore::next_u64));

        // Reset with different seed, ensure we get different values
        rngs.reseed(88);
        assert_ne!(run_0, rngs.sample(FooRng, RngCore::next_u64));
        assert_ne!(run_1, rngs.sample(FooRng, RngCore::next_u64));
    }

    #[test]
    fn sample_distribution() {
        let rngs = RngData::new(42);
        let normal = Normal::new(10.0, 1.0).unwrap();
        let n_samples = 2000;
        let mean = (0..n_samples)
            .map(|_| rngs.sample_distr(FooRng, normal))
            .sum::<f64>()
            / f64::from(n_samples);
        assert!((mean - 10.0).abs() < 0.2);
    }

    #[test]
    fn sample_range_and_bool() {
        let rngs = RngData::new(42);
        let result = rngs.sample_range(FooRng, 0..10);
        assert!((0..10).contains(&result));
        assert!(rngs.sample_bool(FooRng, 1.0));
        assert!(!rngs.sample_bool(FooRng, 0.0));
    }
}
