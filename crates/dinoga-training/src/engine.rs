//! The evolution engine: owns the training state and advances it one generation
//! at a time.
//!
//! # Lifecycle
//!
//! ```text
//! initialize(config) ──► [load(save_file) | resume_from_latest_checkpoint()]
//!                          │
//!                          ▼
//!        ┌──► evaluate population (outside the engine)
//!        │              │
//!        │              ▼
//!        └─── evaluate_and_record(fitness) ──► checkpoint every N generations
//! ```
//!
//! The engine is the only owner of the population, the best-ever policy, the
//! training history and the random source. All randomness flows from one
//! [`Pcg32`] seeded at initialization, so a fixed `training.seed` reproduces a run
//! given the same fitness scores.

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use chrono::Utc;
use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

use crate::{
    config::{ConfigError, TrainingConfig},
    genetic::{self, EvolveError, Population, PopulationEvolver},
    history::TrainingRecord,
    persistence::{
        self, Checkpoint, CheckpointInfo, CheckpointStore, PersistenceError, PolicyRecord,
        SavedPopulation,
    },
    policy::Policy,
};

#[derive(Debug)]
pub struct EvolutionEngine {
    config: TrainingConfig,
    evolver: PopulationEvolver,
    checkpoints: CheckpointStore,
    rng: Pcg32,
    seed: u64,
    population: Population,
    generation: usize,
    best_fitness: f64,
    best_policy: Option<Policy>,
    history: Vec<TrainingRecord>,
    round_started: Instant,
}

impl EvolutionEngine {
    /// Validates `config` and creates a random initial population.
    pub fn initialize(config: TrainingConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let seed = config.training.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = Pcg32::seed_from_u64(seed);
        let population = Population::random(
            config.training.population_size,
            &mut rng,
            config.genetic.mutation(),
        );
        tracing::info!(
            seed,
            population_size = population.len(),
            "initialized population"
        );

        Ok(Self {
            evolver: PopulationEvolver {
                elite_count: config.genetic.elite_count,
                tournament_size: config.genetic.tournament_size,
                elite_diversity_threshold: config.genetic.elite_diversity_threshold,
            },
            checkpoints: CheckpointStore::new(
                &config.training.checkpoint_dir,
                config.training.max_checkpoints,
            ),
            config,
            rng,
            seed,
            population,
            generation: 0,
            best_fitness: 0.0,
            best_policy: None,
            history: vec![],
            round_started: Instant::now(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Seed of the engine's random source.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Number of completed generations.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Best fitness seen over the whole run (0 before any improvement).
    #[must_use]
    pub fn best_fitness(&self) -> f64 {
        self.best_fitness
    }

    /// The policy that scored [`Self::best_fitness`], if any round beat 0.
    #[must_use]
    pub fn best_policy(&self) -> Option<&Policy> {
        self.best_policy.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &[TrainingRecord] {
        &self.history
    }

    /// Appends a [`TrainingRecord`] for this round, then [evolves](Self::evolve).
    ///
    /// Invalid fitness scores are rejected before anything is recorded.
    pub fn evaluate_and_record(
        &mut self,
        fitness: &[f64],
    ) -> Result<TrainingRecord, EvolveError> {
        genetic::check_fitness(self.population.len(), fitness)?;

        let record = TrainingRecord::new(
            self.generation + 1,
            fitness,
            self.round_started.elapsed(),
            self.best_fitness,
        )
        .expect("validated fitness covers a non-empty population");
        self.history.push(record.clone());

        self.evolve(fitness)?;
        Ok(record)
    }

    /// Advances the population by one generation.
    ///
    /// `fitness[i]` must be the score of `population().individuals()[i]`. Misaligned
    /// or non-finite scores are rejected before any state changes. A checkpoint is
    /// written whenever the new generation number is a multiple of
    /// `checkpoint_interval`; a failed checkpoint write is logged and does not undo
    /// the step.
    pub fn evolve(&mut self, fitness: &[f64]) -> Result<(), EvolveError> {
        genetic::check_fitness(self.population.len(), fitness)?;

        let round_best = genetic::rank_by_fitness(fitness)[0];
        if fitness[round_best] > self.best_fitness {
            tracing::info!(
                previous = self.best_fitness,
                best_fitness = fitness[round_best],
                "new best fitness"
            );
            self.best_fitness = fitness[round_best];
            self.best_policy = Some(self.population.individuals()[round_best].clone());
        }

        self.population = self
            .evolver
            .evolve(&self.population, fitness, &mut self.rng)?;
        self.generation += 1;
        self.round_started = Instant::now();
        tracing::info!(
            generation = self.generation,
            best_fitness = self.best_fitness,
            "generation complete"
        );

        if self.generation % self.config.training.checkpoint_interval == 0
            && let Err(e) = self.checkpoint()
        {
            tracing::warn!(
                error = %e,
                generation = self.generation,
                "failed to write checkpoint"
            );
        }
        Ok(())
    }

    /// Writes generation, best fitness, best policy and population to `path`.
    pub fn save<P>(&self, path: P) -> Result<(), PersistenceError>
    where
        P: AsRef<Path>,
    {
        persistence::write_json(path, &self.saved_population())
    }

    /// Restores the state written by [`Self::save`].
    ///
    /// Returns `Ok(false)`, leaving the engine untouched, if `path` does not exist.
    /// The training history is kept as is; the save file does not hold one.
    pub fn load<P>(&mut self, path: P) -> Result<bool, PersistenceError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let Some(saved) = persistence::read_json::<SavedPopulation, _>(path)? else {
            tracing::info!(path = %path.display(), "no saved population, starting fresh");
            return Ok(false);
        };
        self.restore(path, saved)?;
        tracing::info!(
            path = %path.display(),
            generation = self.generation,
            best_fitness = self.best_fitness,
            "loaded population"
        );
        Ok(true)
    }

    /// Writes a checkpoint of the full state into the checkpoint directory.
    pub fn checkpoint(&self) -> Result<PathBuf, PersistenceError> {
        let checkpoint = Checkpoint {
            state: self.saved_population(),
            training_history: self.history.clone(),
            config: self.config.clone(),
            timestamp: Utc::now(),
        };
        self.checkpoints.write(&checkpoint)
    }

    /// Restores the most recently created checkpoint, including its history.
    ///
    /// Returns `Ok(false)` if there is none.
    pub fn resume_from_latest_checkpoint(&mut self) -> Result<bool, PersistenceError> {
        let Some((path, checkpoint)) = self.checkpoints.latest()? else {
            tracing::info!(
                dir = %self.checkpoints.dir().display(),
                "no checkpoint found"
            );
            return Ok(false);
        };
        self.restore(&path, checkpoint.state)?;
        self.history = checkpoint.training_history;
        tracing::info!(
            path = %path.display(),
            generation = self.generation,
            best_fitness = self.best_fitness,
            "resumed from checkpoint"
        );
        Ok(true)
    }

    /// Lists the checkpoints in the configured directory, highest generation first.
    pub fn list_checkpoints(&self) -> Result<Vec<CheckpointInfo>, PersistenceError> {
        self.checkpoints.list()
    }

    fn saved_population(&self) -> SavedPopulation {
        SavedPopulation {
            generation: self.generation,
            best_fitness: self.best_fitness,
            best_individual: self.best_policy.as_ref().map(PolicyRecord::from),
            population: self
                .population
                .individuals()
                .iter()
                .map(PolicyRecord::from)
                .collect(),
        }
    }

    fn restore(&mut self, path: &Path, saved: SavedPopulation) -> Result<(), PersistenceError> {
        let expected = self.config.training.population_size;
        if saved.population.len() != expected {
            return Err(PersistenceError::PopulationSize {
                path: path.to_owned(),
                expected,
                actual: saved.population.len(),
            });
        }

        let mutation = self.config.genetic.mutation();
        self.population = Population::from_individuals(
            saved
                .population
                .iter()
                .map(|record| record.to_policy(mutation))
                .collect(),
        );
        self.best_policy = saved
            .best_individual
            .map(|record| record.to_policy(mutation));
        self.best_fitness = saved.best_fitness;
        self.generation = saved.generation;
        self.round_started = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use super::*;

    fn test_config(dir: &Path, population_size: usize) -> TrainingConfig {
        let mut config = TrainingConfig::default();
        config.training.population_size = population_size;
        config.training.seed = Some(7);
        config.training.checkpoint_interval = 2;
        config.training.checkpoint_dir = dir.join("checkpoints");
        config.training.save_file = dir.join("population.json");
        config.genetic.elite_count = 1;
        config.genetic.tournament_size = 2;
        config
    }

    fn fitness_for(engine: &EvolutionEngine, offset: f64) -> Vec<f64> {
        (0..engine.population().len())
            .map(|i| f64::from(u32::try_from(i).unwrap()) * 3.0 + offset)
            .collect()
    }

    #[test]
    fn test_initialize_rejects_invalid_config() {
        let mut config = TrainingConfig::default();
        config.genetic.elite_count = 0;
        assert!(matches!(
            EvolutionEngine::initialize(config).unwrap_err(),
            ConfigError::NoElites
        ));
    }

    #[test]
    fn test_seed_reproduces_initial_population() {
        let dir = tempfile::tempdir().unwrap();
        let a = EvolutionEngine::initialize(test_config(dir.path(), 6)).unwrap();
        let b = EvolutionEngine::initialize(test_config(dir.path(), 6)).unwrap();
        assert_eq!(a.seed(), 7);
        assert_eq!(a.population(), b.population());
    }

    #[test]
    fn test_evaluate_and_record_appends_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = EvolutionEngine::initialize(test_config(dir.path(), 4)).unwrap();

        let record = engine.evaluate_and_record(&[1.0, 4.0, 2.0, 3.0]).unwrap();
        assert_eq!(record.generation, 1);
        assert_eq!(record.best_fitness, 4.0);
        assert!(record.improved);
        assert_eq!(engine.generation(), 1);
        assert_eq!(engine.best_fitness(), 4.0);

        let record = engine.evaluate_and_record(&[4.0, 1.0, 1.0, 1.0]).unwrap();
        assert_eq!(record.generation, 2);
        assert!(!record.improved);
        assert_eq!(engine.history().len(), 2);
    }

    #[test]
    fn test_best_policy_is_copied_from_round_best() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = EvolutionEngine::initialize(test_config(dir.path(), 4)).unwrap();
        let expected = engine.population().individuals()[2].clone();
        engine.evolve(&[1.0, 2.0, 9.0, 3.0]).unwrap();
        assert_eq!(engine.best_policy(), Some(&expected));

        // a tie does not replace the stored best
        engine.evolve(&[0.0, 0.0, 0.0, 9.0]).unwrap();
        assert_eq!(engine.best_policy(), Some(&expected));
    }

    #[test]
    fn test_rejected_fitness_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = EvolutionEngine::initialize(test_config(dir.path(), 4)).unwrap();
        let before = engine.population().clone();

        let err = engine.evaluate_and_record(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            EvolveError::FitnessCountMismatch {
                expected: 4,
                actual: 2
            }
        ));
        let err = engine.evolve(&[1.0, f64::INFINITY, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            EvolveError::NonFiniteFitness { index: 1, .. }
        ));

        assert_eq!(engine.population(), &before);
        assert_eq!(engine.generation(), 0);
        assert!(engine.history().is_empty());
        assert!(engine.best_policy().is_none());
    }

    #[test]
    fn test_save_then_load_into_fresh_engine() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 3);
        let mut engine = EvolutionEngine::initialize(config.clone()).unwrap();
        for offset in [1.0, 5.0, 2.0] {
            let fitness = fitness_for(&engine, offset);
            engine.evaluate_and_record(&fitness).unwrap();
        }
        engine.save(&config.training.save_file).unwrap();

        let mut fresh_config = config.clone();
        fresh_config.training.seed = Some(99);
        let mut fresh = EvolutionEngine::initialize(fresh_config).unwrap();
        assert_ne!(fresh.population(), engine.population());
        assert!(fresh.load(&config.training.save_file).unwrap());

        assert_eq!(fresh.generation(), 3);
        assert_eq!(fresh.best_fitness(), engine.best_fitness());
        assert_eq!(fresh.best_policy(), engine.best_policy());
        assert_eq!(fresh.population(), engine.population());
    }

    #[test]
    fn test_load_missing_file_is_cold_start() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = EvolutionEngine::initialize(test_config(dir.path(), 4)).unwrap();
        let before = engine.population().clone();
        assert!(!engine.load(dir.path().join("missing.json")).unwrap());
        assert_eq!(engine.population(), &before);
    }

    #[test]
    fn test_load_rejects_population_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let small = EvolutionEngine::initialize(test_config(dir.path(), 3)).unwrap();
        let path = dir.path().join("small.json");
        small.save(&path).unwrap();

        let mut large = EvolutionEngine::initialize(test_config(dir.path(), 6)).unwrap();
        let err = large.load(&path).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::PopulationSize {
                expected: 6,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.json");
        fs::write(&path, "{\"generation\": 1, \"best_fit").unwrap();
        let mut engine = EvolutionEngine::initialize(test_config(dir.path(), 4)).unwrap();
        assert!(matches!(
            engine.load(&path).unwrap_err(),
            PersistenceError::Parse { .. }
        ));
    }

    #[test]
    fn test_checkpoints_written_at_interval_and_resumed() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path(), 4);
        let mut engine = EvolutionEngine::initialize(config.clone()).unwrap();
        for offset in 0..4 {
            let fitness = fitness_for(&engine, f64::from(offset));
            engine.evaluate_and_record(&fitness).unwrap();
            std::thread::sleep(Duration::from_millis(10));
        }

        let generations = engine
            .list_checkpoints()
            .unwrap()
            .iter()
            .map(|info| info.generation)
            .collect::<Vec<_>>();
        assert_eq!(generations, vec![4, 2]);

        let mut resumed = EvolutionEngine::initialize(config).unwrap();
        assert!(resumed.resume_from_latest_checkpoint().unwrap());
        assert_eq!(resumed.generation(), 4);
        assert_eq!(resumed.population(), engine.population());
        assert_eq!(resumed.history(), engine.history());
    }

    #[test]
    fn test_failed_checkpoint_keeps_completed_generation() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut config = test_config(dir.path(), 4);
        config.training.checkpoint_interval = 1;
        config.training.checkpoint_dir = blocker.join("checkpoints");
        let mut engine = EvolutionEngine::initialize(config.clone()).unwrap();
        let before = engine.population().clone();

        let record = engine.evaluate_and_record(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(record.generation, 1);
        assert_eq!(engine.generation(), 1);
        assert_eq!(engine.history().len(), 1);
        assert_ne!(engine.population(), &before);
        assert!(engine.best_policy().is_some());

        engine.save(&config.training.save_file).unwrap();
        let mut fresh = EvolutionEngine::initialize(config.clone()).unwrap();
        assert!(fresh.load(&config.training.save_file).unwrap());
        assert_eq!(fresh.generation(), 1);
    }

    #[test]
    fn test_resume_without_checkpoints() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = EvolutionEngine::initialize(test_config(dir.path(), 4)).unwrap();
        assert!(!engine.resume_from_latest_checkpoint().unwrap());
        assert_eq!(engine.generation(), 0);
    }
}
