//! Per-entity seed allocation from a single master seed.

use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::error::{Result, SynthError};

/// Upper bound (exclusive) of allocated seeds: the largest positive `i32`.
pub const MAX_ENTITY_SEED: u32 = i32::MAX as u32;

/// Derives one reproducible seed per entity from a master seed.
///
/// Seeds are drawn in entity order from one generator, so the `i`-th entity
/// always receives the same seed for a given master seed, no matter how the
/// per-entity work is scheduled afterwards.
///
/// # Examples
///
/// ```
/// use loadshape_dataset::seeds::SeedAllocator;
///
/// let a = SeedAllocator::new(42).allocate(3);
/// let b = SeedAllocator::new(42).allocate(3);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SeedAllocator {
    master_seed: u64,
}

impl SeedAllocator {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Returns `count` seeds in `[0, MAX_ENTITY_SEED)`.
    pub fn allocate(&self, count: usize) -> Vec<u32> {
        let mut rng = StdRng::seed_from_u64(self.master_seed);
        let seeds: Vec<u32> = (0..count)
            .map(|_| rng.random_range(0..MAX_ENTITY_SEED))
            .collect();
        debug!(master_seed = self.master_seed, count, "allocated entity seeds");
        seeds
    }

    /// Allocates one seed per entity and pairs them in order.
    pub fn allocate_for<'a, T>(&self, entities: &'a [T]) -> EntitySeeds<'a, T> {
        EntitySeeds {
            entities,
            seeds: self.allocate(entities.len()),
        }
    }
}

/// Entities paired with their allocated seeds, in entity order.
#[derive(Debug, Clone)]
pub struct EntitySeeds<'a, T> {
    entities: &'a [T],
    seeds: Vec<u32>,
}

impl<'a, T> EntitySeeds<'a, T> {
    /// Pairs externally supplied seeds with entities.
    ///
    /// # Errors
    ///
    /// Returns [`SynthError::Reproducibility`] when the counts differ.
    pub fn new(entities: &'a [T], seeds: Vec<u32>) -> Result<Self> {
        if entities.len() != seeds.len() {
            return Err(SynthError::Reproducibility {
                entities: entities.len(),
                seeds: seeds.len(),
            });
        }
        Ok(Self { entities, seeds })
    }

    pub fn seeds(&self) -> &[u32] {
        &self.seeds
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a T, u32)> + '_ {
        self.entities.iter().zip(self.seeds.iter().copied())
    }
}
