use rand::{
    Rng, SeedableRng,
    distr::{Distribution, Uniform},
    seq::IndexedRandom,
};

pub type Seed = u64;

/// Seeded source of every random decision. Two randomizers built from the
/// same seed produce the same stream of draws.
pub struct Randomizer {
    rnd: rand::rngs::StdRng,
}

impl Randomizer {
    pub fn new(seed: Seed) -> Self {
        Self {
            rnd: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw from `[from, to]`. Collapses to `from` when the range is inverted.
    pub fn random_in_range(&mut self, from: usize, to: usize) -> usize {
        match Uniform::new_inclusive(from, to) {
            Ok(distr) => self.rnd.sample(distr),
            Err(_) => from,
        }
    }

    /// Picks `amount` distinct elements, or all of them if the slice is shorter.
    pub fn sample_distinct<T: Copy>(&mut self, from: &[T], amount: usize) -> Vec<T> {
        from.choose_multiple(&mut self.rnd, amount)
            .copied()
            .collect()
    }

    pub fn sample<D: Distribution<f64>>(&mut self, distr: &D) -> f64 {
        distr.sample(&mut self.rnd)
    }
}
