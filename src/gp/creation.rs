//! Initial population creation.

use crate::error::Result;
use crate::gp::genome::{DEFAULT_CHROMOSOME_SIZE, Genome, Token, tokenize};
use crate::gp::registry::{Role, Strategy};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet of oriented diversity: moves and arithmetic outweigh loops and
/// input/output.
pub const ORIENTED_ALPHABET: &str = "<<<>>>++--[],..";

/// Strategies building the first generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreationStrategy {
    /// Lengths 30 to 39, chromosome sizes 3 to 19, weighted alphabet.
    OrientedDiversity,
    /// Lengths 10 to 49, default chromosome size, uniform alphabet.
    UniformRandom,
}

impl CreationStrategy {
    /// Build `size` random genomes.
    ///
    /// # Errors
    ///
    /// Never fails for the registered strategies; the `Result` carries
    /// [`Genome::random`] errors.
    pub fn create<R: Rng + ?Sized>(&self, size: usize, rng: &mut R) -> Result<Vec<Genome>> {
        let oriented = tokenize(ORIENTED_ALPHABET);
        (0..size)
            .map(|_| match self {
                Self::OrientedDiversity => {
                    let length = rng.gen_range(30..40);
                    let chromosome_size = rng.gen_range(3..20);
                    Genome::random(rng, length, chromosome_size, &oriented)
                }
                Self::UniformRandom => {
                    let length = rng.gen_range(10..50);
                    Genome::random(rng, length, DEFAULT_CHROMOSOME_SIZE, &Token::ALL)
                }
            })
            .collect()
    }
}

impl Strategy for CreationStrategy {
    const ROLE: Role = Role::Create;

    fn named() -> Vec<(String, Self)> {
        [Self::OrientedDiversity, Self::UniformRandom]
            .into_iter()
            .map(|s| (s.code(), s))
            .collect()
    }

    fn defaults() -> Vec<Self> {
        vec![Self::OrientedDiversity]
    }

    fn code(&self) -> String {
        match self {
            Self::OrientedDiversity => "OD",
            Self::UniformRandom => "UR",
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_oriented_diversity() {
        let mut rng = SmallRng::seed_from_u64(12345);
        let population = CreationStrategy::OrientedDiversity.create(50, &mut rng).unwrap();

        assert_eq!(population.len(), 50);
        for genome in &population {
            assert!((30..40).contains(&genome.len()));
            assert!((3..20).contains(&genome.chromosome_size()));
        }
    }

    #[test]
    fn test_uniform_random() {
        let mut rng = SmallRng::seed_from_u64(12345);
        let population = CreationStrategy::UniformRandom.create(50, &mut rng).unwrap();

        assert_eq!(population.len(), 50);
        assert!(population.iter().all(|g| (10..50).contains(&g.len())));
        assert!(population.iter().all(|g| g.chromosome_size() == DEFAULT_CHROMOSOME_SIZE));
    }
}
