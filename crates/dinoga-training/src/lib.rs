//! Evolutionary training of dino-runner policies.
//!
//! A [`Policy`](policy::Policy) is a tiny linear controller: five weights and two
//! biases that turn an [`Observation`](dinoga_engine::Observation) into jump/duck
//! intents. This crate evolves a population of them with a genetic algorithm and
//! keeps the run durable on disk.
//!
//! # How Training Works
//!
//! 1. **Initialize** - [`EvolutionEngine::initialize`](engine::EvolutionEngine::initialize)
//!    validates the [`TrainingConfig`](config::TrainingConfig) and creates a random population
//! 2. **Evaluate** - [`SessionEvaluator`](evaluator::SessionEvaluator) plays each policy
//!    against an [`Environment`](dinoga_engine::Environment) and averages the scores
//! 3. **Record & Evolve** - [`evaluate_and_record`](engine::EvolutionEngine::evaluate_and_record)
//!    logs a [`TrainingRecord`](history::TrainingRecord) and builds the next generation
//!    (diverse elitism, tournament selection, uniform crossover, mutation)
//! 4. **Persist** - the population is saved to a single file; full checkpoints with
//!    history rotate in a checkpoint directory
//! 5. **Report** - [`TrainingSummary`](report::TrainingSummary) condenses the history
//!
//! # Architecture
//!
//! ```text
//! TrainingConfig
//!     ↓ configures
//! EvolutionEngine ──owns──► Population ──of──► Policy (weights + biases)
//!     │                                          ↑ decides for
//!     │                    SessionEvaluator ──plays──► Environment
//!     │                          ↓ produces
//!     ◄──────────────────── fitness scores
//!     ↓ persists
//! save file / CheckpointStore
//! ```
//!
//! # Example
//!
//! ```
//! use dinoga_engine::SimulatedGame;
//! use dinoga_training::{
//!     config::TrainingConfig, engine::EvolutionEngine, evaluator::SessionEvaluator,
//! };
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut config = TrainingConfig::preset("quick").unwrap();
//! config.training.seed = Some(1);
//! config.training.max_steps = 200;
//! config.training.checkpoint_dir = dir.path().join("checkpoints");
//!
//! let mut engine = EvolutionEngine::initialize(config.clone()).unwrap();
//! let evaluator = SessionEvaluator::from_params(&config.training);
//! let mut game = SimulatedGame::with_seed(config.simulation, 1);
//!
//! for _ in 0..2 {
//!     let fitness = evaluator.evaluate_population(&mut game, engine.population());
//!     engine.evaluate_and_record(&fitness).unwrap();
//! }
//! assert_eq!(engine.generation(), 2);
//! assert_eq!(engine.history().len(), 2);
//! ```

pub mod config;
pub mod engine;
pub mod evaluator;
pub mod genetic;
pub mod history;
pub mod persistence;
pub mod policy;
pub mod report;
pub mod weights;
