//! Genetic algorithm over populations of policies.
//!
//! One call to [`PopulationEvolver::evolve`] turns a population and its fitness
//! scores into the next generation:
//!
//! 1. **Diverse elitism** - The fittest member is always kept. Further elites are
//!    admitted in rank order only if their weights are farther than
//!    `elite_diversity_threshold` from every elite admitted so far; if that leaves
//!    free elite slots, they are backfilled with the best remaining members.
//! 2. **Tournament selection** - `population_size / 2` tournaments, each drawing
//!    `tournament_size` distinct members and keeping the fittest, form the parent pool.
//! 3. **Reproduction** - Elites are copied unchanged. Every other slot gets a child
//!    of two parents drawn (with replacement) from the pool, built by uniform
//!    crossover and then mutated.
//!
//! Fitness is passed alongside the population as a slice aligned by index; members
//! do not carry their own score.
//!
//! # Example
//!
//! ```
//! use dinoga_training::{
//!     genetic::{Population, PopulationEvolver},
//!     policy::MutationParams,
//! };
//! use rand::SeedableRng as _;
//! use rand_pcg::Pcg32;
//!
//! let mut rng = Pcg32::seed_from_u64(42);
//! let mutation = MutationParams { rate: 0.1, scale: 0.2 };
//! let population = Population::random(6, &mut rng, mutation);
//! let evolver = PopulationEvolver {
//!     elite_count: 2,
//!     tournament_size: 3,
//!     elite_diversity_threshold: 0.1,
//! };
//!
//! let fitness = [12.0, 3.0, 40.0, 7.0, 0.0, 18.0];
//! let next = evolver.evolve(&population, &fitness, &mut rng).unwrap();
//! assert_eq!(next.len(), 6);
//! // the fittest member survives unchanged
//! assert_eq!(next.individuals()[0], population.individuals()[2]);
//! ```

use dinoga_stats::descriptive::DescriptiveStats;
use rand::{
    Rng,
    seq::{IndexedRandom as _, index},
};

use crate::{
    policy::{MutationParams, Policy},
    weights::FEATURE_COUNT,
};

/// Fitness scores that cannot be matched to the population.
#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum EvolveError {
    #[display("expected {expected} fitness scores (one per population member), got {actual}")]
    FitnessCountMismatch { expected: usize, actual: usize },
    #[display("fitness score of member #{index} is not finite ({value})")]
    NonFiniteFitness { index: usize, value: f64 },
}

/// Checks that `fitness` has one finite score per population member.
pub fn check_fitness(population_size: usize, fitness: &[f64]) -> Result<(), EvolveError> {
    if fitness.len() != population_size {
        return Err(EvolveError::FitnessCountMismatch {
            expected: population_size,
            actual: fitness.len(),
        });
    }
    if let Some((index, &value)) = fitness.iter().enumerate().find(|(_, f)| !f.is_finite()) {
        return Err(EvolveError::NonFiniteFitness { index, value });
    }
    Ok(())
}

/// An ordered, fixed-size collection of policies.
#[derive(Debug, Clone, PartialEq)]
pub struct Population {
    individuals: Vec<Policy>,
}

impl Population {
    /// Creates a population of `count` random policies.
    #[must_use]
    pub fn random<R>(count: usize, rng: &mut R, mutation: MutationParams) -> Self
    where
        R: Rng + ?Sized,
    {
        let individuals = (0..count)
            .map(|_| Policy::random(rng, mutation))
            .collect();
        Self { individuals }
    }

    #[must_use]
    pub fn from_individuals(individuals: Vec<Policy>) -> Self {
        Self { individuals }
    }

    #[must_use]
    pub fn individuals(&self) -> &[Policy] {
        &self.individuals
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// Computes descriptive statistics for each weight across all individuals.
    ///
    /// Useful for watching the population converge (or drift).
    #[must_use]
    pub fn compute_weight_stats(&self) -> Vec<DescriptiveStats> {
        (0..FEATURE_COUNT)
            .filter_map(|i| DescriptiveStats::new(self.individuals.iter().map(|p| p.weights()[i])))
            .collect()
    }
}

/// Controls how one generation turns into the next.
#[derive(Debug, Clone)]
pub struct PopulationEvolver {
    /// Members carried over unchanged.
    pub elite_count: usize,
    /// Members drawn per tournament (larger = stronger selection pressure).
    pub tournament_size: usize,
    /// Minimum weight distance between elites before backfilling.
    pub elite_diversity_threshold: f64,
}

impl PopulationEvolver {
    /// Evolves `population` into a new population of the same size.
    ///
    /// `fitness[i]` is the score of `population.individuals()[i]`. The input
    /// population is left untouched; elites are cloned into the result and every
    /// child owns fresh storage.
    ///
    /// # Panics
    ///
    /// Panics if `tournament_size` is zero or larger than the population.
    pub fn evolve<R>(
        &self,
        population: &Population,
        fitness: &[f64],
        rng: &mut R,
    ) -> Result<Population, EvolveError>
    where
        R: Rng + ?Sized,
    {
        check_fitness(population.len(), fitness)?;
        let individuals = &population.individuals;

        let elites = select_diverse_elites(
            individuals,
            fitness,
            self.elite_count,
            self.elite_diversity_threshold,
        );
        let pool = tournament_pool(fitness, individuals.len() / 2, self.tournament_size, rng);

        let mut next = Vec::with_capacity(individuals.len());
        next.extend(elites.iter().map(|&i| individuals[i].clone()));
        while next.len() < individuals.len() {
            let p1 = pool
                .choose(rng)
                .expect("selection pool is empty only for populations filled by elites");
            let p2 = pool
                .choose(rng)
                .expect("selection pool is empty only for populations filled by elites");
            let mut child = Policy::crossover(&individuals[*p1], &individuals[*p2], rng);
            child.mutate(rng);
            next.push(child);
        }

        Ok(Population { individuals: next })
    }
}

/// Returns population indices sorted by fitness, best first.
///
/// The sort is stable: equal scores keep their population order.
#[must_use]
pub fn rank_by_fitness(fitness: &[f64]) -> Vec<usize> {
    let mut ranking = (0..fitness.len()).collect::<Vec<_>>();
    ranking.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));
    ranking
}

/// Picks up to `elite_count` elites, favoring weight-space diversity.
///
/// Returns population indices in admission order: the best member first, then the
/// diverse members in rank order, then backfilled members in rank order. No index
/// appears twice, and the result holds `min(elite_count, population size)` entries.
#[must_use]
pub fn select_diverse_elites(
    individuals: &[Policy],
    fitness: &[f64],
    elite_count: usize,
    diversity_threshold: f64,
) -> Vec<usize> {
    let ranking = rank_by_fitness(fitness);
    let target = elite_count.min(ranking.len());
    let mut elites = Vec::with_capacity(target);

    for &candidate in &ranking {
        if elites.len() >= target {
            break;
        }
        let is_diverse = elites.iter().all(|&elite: &usize| {
            individuals[candidate].distance(&individuals[elite]) > diversity_threshold
        });
        if is_diverse {
            elites.push(candidate);
        }
    }

    for &candidate in &ranking {
        if elites.len() >= target {
            break;
        }
        if !elites.contains(&candidate) {
            elites.push(candidate);
        }
    }

    elites
}

/// Runs `pool_size` independent tournaments and returns the winners' indices.
///
/// Winners may repeat across tournaments.
pub fn tournament_pool<R>(
    fitness: &[f64],
    pool_size: usize,
    tournament_size: usize,
    rng: &mut R,
) -> Vec<usize>
where
    R: Rng + ?Sized,
{
    (0..pool_size)
        .map(|_| tournament_select(fitness, tournament_size, rng))
        .collect()
}

/// Draws `tournament_size` distinct members and returns the fittest one.
fn tournament_select<R>(fitness: &[f64], tournament_size: usize, rng: &mut R) -> usize
where
    R: Rng + ?Sized,
{
    assert!(tournament_size > 0 && tournament_size <= fitness.len());
    index::sample(rng, fitness.len(), tournament_size)
        .into_iter()
        .max_by(|&a, &b| fitness[a].total_cmp(&fitness[b]))
        .expect("tournament has at least one contestant")
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    const PARAMS: MutationParams = MutationParams {
        rate: 0.1,
        scale: 0.2,
    };

    fn policy_at(x: f64) -> Policy {
        Policy::new([x, 0.0, 0.0, 0.0, 0.0], 0.0, 0.0, PARAMS)
    }

    #[test]
    fn test_rank_is_stable_and_descending() {
        assert_eq!(rank_by_fitness(&[1.0, 3.0, 2.0, 3.0]), vec![1, 3, 2, 0]);
    }

    #[test]
    fn test_elites_in_rank_order_without_diversity_filter() {
        let mut rng = Pcg32::seed_from_u64(1);
        let population = Population::random(5, &mut rng, PARAMS);
        let fitness = [10.0, 5.0, 8.0, 2.0, 1.0];
        let elites = select_diverse_elites(population.individuals(), &fitness, 2, 0.0);
        assert_eq!(elites, vec![0, 2]);
    }

    #[test]
    fn test_diversity_filter_skips_near_duplicates() {
        // 0 and 1 are near-identical; 2 is far away
        let individuals = [policy_at(0.0), policy_at(0.01), policy_at(5.0), policy_at(9.0)];
        let fitness = [10.0, 9.0, 8.0, 1.0];
        let elites = select_diverse_elites(&individuals, &fitness, 2, 0.5);
        assert_eq!(elites, vec![0, 2]);
    }

    #[test]
    fn test_distance_equal_to_threshold_is_not_diverse() {
        let individuals = [policy_at(0.0), policy_at(0.5), policy_at(0.6)];
        let fitness = [3.0, 2.0, 1.0];
        assert_eq!(individuals[0].distance(&individuals[1]), 0.5);

        let elites = select_diverse_elites(&individuals, &fitness, 2, 0.5);
        assert_eq!(elites, vec![0, 2]);
        // 1 only gets in through backfill, after the diverse members
        let elites = select_diverse_elites(&individuals, &fitness, 3, 0.5);
        assert_eq!(elites, vec![0, 2, 1]);
    }

    #[test]
    fn test_zero_threshold_rejects_identical_weights() {
        let individuals = [policy_at(1.0), policy_at(1.0), policy_at(2.0)];
        let fitness = [3.0, 2.0, 1.0];
        let elites = select_diverse_elites(&individuals, &fitness, 2, 0.0);
        assert_eq!(elites, vec![0, 2]);
        let elites = select_diverse_elites(&individuals, &fitness, 3, 0.0);
        assert_eq!(elites, vec![0, 2, 1]);
    }

    #[test]
    fn test_backfill_preserves_rank_order_without_duplicates() {
        let individuals = [policy_at(0.0), policy_at(0.0), policy_at(0.0), policy_at(0.0)];
        let fitness = [1.0, 4.0, 3.0, 2.0];
        let elites = select_diverse_elites(&individuals, &fitness, 3, 0.5);
        assert_eq!(elites, vec![1, 2, 3]);
    }

    #[test]
    fn test_elite_count_capped_by_population() {
        let individuals = [policy_at(0.0), policy_at(0.0)];
        let elites = select_diverse_elites(&individuals, &[1.0, 2.0], 5, 0.0);
        assert_eq!(elites, vec![1, 0]);
    }

    #[test]
    fn test_elites_always_contain_round_best() {
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..100 {
            let population = Population::random(8, &mut rng, PARAMS);
            let fitness = (0..8)
                .map(|_| rng.random_range(0.0..100.0))
                .collect::<Vec<f64>>();
            let best = rank_by_fitness(&fitness)[0];
            let threshold = rng.random_range(0.0..3.0);
            let elites = select_diverse_elites(population.individuals(), &fitness, 3, threshold);
            assert_eq!(elites[0], best);
            assert_eq!(elites.len(), 3);
        }
    }

    #[test]
    fn test_tournament_of_whole_population_picks_best() {
        let mut rng = Pcg32::seed_from_u64(3);
        let fitness = [3.0, 9.0, 1.0, 4.0];
        let pool = tournament_pool(&fitness, 2, 4, &mut rng);
        assert_eq!(pool, vec![1, 1]);
    }

    #[test]
    fn test_tournament_never_picks_the_worst() {
        let mut rng = Pcg32::seed_from_u64(4);
        let fitness = [3.0, 9.0, 1.0, 4.0, 2.0];
        let pool = tournament_pool(&fitness, 200, 2, &mut rng);
        assert_eq!(pool.len(), 200);
        assert!(!pool.contains(&2));
    }

    #[test]
    fn test_evolve_keeps_population_size() {
        let mut rng = Pcg32::seed_from_u64(5);
        let evolver = PopulationEvolver {
            elite_count: 3,
            tournament_size: 3,
            elite_diversity_threshold: 0.1,
        };
        let mut population = Population::random(20, &mut rng, PARAMS);
        for _ in 0..10 {
            let fitness = (0..population.len())
                .map(|_| rng.random_range(0.0..500.0))
                .collect::<Vec<f64>>();
            population = evolver.evolve(&population, &fitness, &mut rng).unwrap();
            assert_eq!(population.len(), 20);
        }
    }

    #[test]
    fn test_evolve_copies_elites_verbatim() {
        let mut rng = Pcg32::seed_from_u64(6);
        let evolver = PopulationEvolver {
            elite_count: 2,
            tournament_size: 2,
            elite_diversity_threshold: 0.0,
        };
        let population = Population::random(5, &mut rng, PARAMS);
        let next = evolver
            .evolve(&population, &[10.0, 5.0, 8.0, 2.0, 1.0], &mut rng)
            .unwrap();
        assert_eq!(next.individuals()[0], population.individuals()[0]);
        assert_eq!(next.individuals()[1], population.individuals()[2]);
    }

    #[test]
    fn test_evolve_rejects_misaligned_fitness() {
        let mut rng = Pcg32::seed_from_u64(7);
        let evolver = PopulationEvolver {
            elite_count: 1,
            tournament_size: 2,
            elite_diversity_threshold: 0.0,
        };
        let population = Population::random(4, &mut rng, PARAMS);
        let err = evolver
            .evolve(&population, &[1.0, 2.0, 3.0], &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            EvolveError::FitnessCountMismatch {
                expected: 4,
                actual: 3
            }
        );
        let err = evolver
            .evolve(&population, &[1.0, f64::NAN, 3.0, 4.0], &mut rng)
            .unwrap_err();
        assert!(matches!(err, EvolveError::NonFiniteFitness { index: 1, .. }));
    }

    #[test]
    fn test_weight_stats_cover_every_feature() {
        let population = Population::from_individuals(vec![policy_at(1.0), policy_at(3.0)]);
        let stats = population.compute_weight_stats();
        assert_eq!(stats.len(), FEATURE_COUNT);
        assert_eq!(stats[0].mean, 2.0);
        assert_eq!(stats[1].max, 0.0);
    }
}
