//! A simple pseudorandom number generator.
//!
//! Specifically, an implementation of Steele, Lea, and Flood's SplitMix64 mixer,
//! implemented to satisfy the [RngCore](rand_core::RngCore) trait.
//!
//! SplitMix64 was chosen as the default source of (pseudo)random numbers as it is a
//! single multiply-shift-xor chain over one word of state, and so trivial to audit.
//! Each solver engine stores a source of rng, parameterised to anything which
//! satisfies [Rng](rand::Rng), with [SplitMix64] as the fixed default.

use rand::SeedableRng;
use rand_core::{impls, Error, RngCore};

/// One word of state, advanced by a Weyl increment on each draw.
#[derive(Default)]
pub struct SplitMix64 {
    state: u64,
}

impl RngCore for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);

        let mut mixed = self.state;
        mixed = (mixed ^ (mixed >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        mixed = (mixed ^ (mixed >> 27)).wrapping_mul(0x94D049BB133111EB);
        mixed ^ (mixed >> 31)
    }

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for SplitMix64 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self {
            state: u64::from_le_bytes(seed),
        }
    }
}

#[cfg(test)]
mod splitmix_tests {
    use super::*;

    // Reference values from the public domain C implementation.
    #[test]
    fn zero_seed() {
        let mut zero_seed = SplitMix64::from_seed(0u64.to_le_bytes());

        assert_eq!(zero_seed.next_u64(), 0xE220A8397B1DCDAF);
        assert_eq!(zero_seed.next_u64(), 0x6E789E6AA1B965F4);
        assert_eq!(zero_seed.next_u64(), 0x06C45D188009454F);
    }

    #[test]
    fn distinct_seeds_distinct_draws() {
        let mut a = SplitMix64::from_seed(1u64.to_le_bytes());
        let mut b = SplitMix64::from_seed(2u64.to_le_bytes());

        assert_ne!(a.next_u64(), b.next_u64());
    }
}
