// Copyright @yucwang 2026

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::math::constants::Float;

/// Random stream owned by one pair resolution. Seeded from the run seed and
/// the pair indices, so results do not depend on thread scheduling.
pub struct PairRng {
    inner: StdRng,
}

impl PairRng {
    pub fn new(seed: u64) -> Self {
        Self { inner: StdRng::seed_from_u64(seed) }
    }

    pub fn for_pair(seed: u64, i: usize, j: usize) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        state = splitmix(state ^ (i as u64));
        state = splitmix(state ^ (j as u64).rotate_left(32));
        Self::new(state)
    }

    /// Uniform in [0, 1).
    pub fn next_float(&mut self) -> Float {
        self.inner.gen::<Float>()
    }
}

fn splitmix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
