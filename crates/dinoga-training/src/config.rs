//! Training configuration.
//!
//! A [`TrainingConfig`] is built once (from defaults, a preset, or a JSON file),
//! validated, and then handed to the [`EvolutionEngine`](crate::engine::EvolutionEngine).
//! Nothing mutates it afterwards.
//!
//! # File Format
//!
//! ```json
//! {
//!   "training": { "population_size": 20, "generations": 20, "runs_per_individual": 3 },
//!   "genetic": { "mutation_rate": 0.1, "elite_count": 3 },
//!   "simulation": { "tick_seconds": 0.01 }
//! }
//! ```
//!
//! Every field is optional; missing fields take their default value.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use dinoga_engine::SimulationParams;
use serde::{Deserialize, Serialize};

use crate::policy::MutationParams;

/// A configuration value that breaks an invariant, or a config file that cannot be read.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("failed to read config file {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[display("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("unknown config preset '{name}' (expected one of: quick, standard, intensive)")]
    UnknownPreset { name: String },
    #[display(
        "population_size ({population_size}) must be at least 2 x elite_count ({elite_count})"
    )]
    PopulationTooSmall {
        population_size: usize,
        elite_count: usize,
    },
    #[display("elite_count must be at least 1")]
    NoElites,
    #[display("mutation_rate ({rate}) must be within [0, 1]")]
    MutationRateOutOfRange { rate: f64 },
    #[display("mutation_scale ({scale}) must be a positive finite number")]
    InvalidMutationScale { scale: f64 },
    #[display("tournament_size ({tournament_size}) must be at least 2")]
    TournamentTooSmall { tournament_size: usize },
    #[display(
        "tournament_size ({tournament_size}) must not exceed population_size ({population_size})"
    )]
    TournamentTooLarge {
        tournament_size: usize,
        population_size: usize,
    },
    #[display("elite_diversity_threshold ({threshold}) must be a non-negative finite number")]
    InvalidDiversityThreshold { threshold: f64 },
    #[display("{name} must be at least 1")]
    ZeroCount { name: &'static str },
    #[display("simulation.tick_seconds ({tick_seconds}) must be a positive finite number")]
    InvalidTick { tick_seconds: f64 },
    #[display(
        "simulation.max_speed ({max_speed}) must be at least simulation.initial_speed ({initial_speed}) and positive"
    )]
    InvalidSpeed { initial_speed: f64, max_speed: f64 },
}

/// Population size, run length and persistence locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Number of policies per generation.
    pub population_size: usize,
    /// Generations to run per `train` invocation.
    pub generations: usize,
    /// Episodes averaged into one fitness score.
    pub runs_per_individual: usize,
    /// Step cap per episode.
    pub max_steps: usize,
    /// Canonical save slot.
    pub save_file: PathBuf,
    /// A checkpoint is written whenever the generation counter is a multiple of this.
    pub checkpoint_interval: usize,
    pub checkpoint_dir: PathBuf,
    /// Oldest checkpoints beyond this count are deleted.
    pub max_checkpoints: usize,
    /// Seed for the engine's random source; drawn from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            population_size: 20,
            generations: 20,
            runs_per_individual: 3,
            max_steps: 10_000,
            save_file: PathBuf::from("dino_population.json"),
            checkpoint_interval: 5,
            checkpoint_dir: PathBuf::from("checkpoints"),
            max_checkpoints: 10,
            seed: None,
        }
    }
}

/// Genetic operator parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneticParams {
    /// Per-gene mutation probability.
    pub mutation_rate: f64,
    /// Half-width of the uniform mutation noise.
    pub mutation_scale: f64,
    /// Members drawn per tournament.
    pub tournament_size: usize,
    /// Members carried over unchanged each generation.
    pub elite_count: usize,
    /// Minimum weight distance between two elites.
    pub elite_diversity_threshold: f64,
}

impl Default for GeneticParams {
    fn default() -> Self {
        Self {
            mutation_rate: 0.1,
            mutation_scale: 0.2,
            tournament_size: 3,
            elite_count: 3,
            elite_diversity_threshold: 0.1,
        }
    }
}

impl GeneticParams {
    #[must_use]
    pub fn mutation(&self) -> MutationParams {
        MutationParams {
            rate: self.mutation_rate,
            scale: self.mutation_scale,
        }
    }
}

/// Complete training configuration.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub training: TrainingParams,
    pub genetic: GeneticParams,
    pub simulation: SimulationParams,
}

impl TrainingConfig {
    /// Names accepted by [`Self::preset`].
    pub const PRESETS: [&'static str; 3] = ["quick", "standard", "intensive"];

    /// Returns a built-in configuration.
    ///
    /// - `quick`: small population, few generations, for smoke runs
    /// - `standard`: the defaults
    /// - `intensive`: large population, long run, stronger mutation and selection
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        match name {
            "quick" => {
                config.training.population_size = 10;
                config.training.generations = 5;
                config.training.runs_per_individual = 2;
                config.genetic.elite_count = 2;
            }
            "standard" => {}
            "intensive" => {
                config.training.population_size = 50;
                config.training.generations = 100;
                config.training.runs_per_individual = 5;
                config.genetic.mutation_rate = 0.15;
                config.genetic.mutation_scale = 0.3;
                config.genetic.tournament_size = 5;
                config.genetic.elite_count = 5;
            }
            _ => {
                return Err(ConfigError::UnknownPreset {
                    name: name.to_owned(),
                });
            }
        }
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let config: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`Self::load`], but falls back to the defaults when the file does not exist.
    pub fn load_or_default<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Checks every invariant the engine relies on.
    ///
    /// Invalid values are reported, never corrected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let TrainingParams {
            population_size,
            generations,
            runs_per_individual,
            max_steps,
            checkpoint_interval,
            max_checkpoints,
            ..
        } = self.training;
        let GeneticParams {
            mutation_rate,
            mutation_scale,
            tournament_size,
            elite_count,
            elite_diversity_threshold,
        } = self.genetic;
        let SimulationParams {
            tick_seconds,
            initial_speed,
            max_speed,
        } = self.simulation;

        if elite_count < 1 {
            return Err(ConfigError::NoElites);
        }
        if population_size < 2 * elite_count {
            return Err(ConfigError::PopulationTooSmall {
                population_size,
                elite_count,
            });
        }
        if !(0.0..=1.0).contains(&mutation_rate) {
            return Err(ConfigError::MutationRateOutOfRange {
                rate: mutation_rate,
            });
        }
        if !(mutation_scale.is_finite() && mutation_scale > 0.0) {
            return Err(ConfigError::InvalidMutationScale {
                scale: mutation_scale,
            });
        }
        if tournament_size < 2 {
            return Err(ConfigError::TournamentTooSmall { tournament_size });
        }
        if tournament_size > population_size {
            return Err(ConfigError::TournamentTooLarge {
                tournament_size,
                population_size,
            });
        }
        if !(elite_diversity_threshold.is_finite() && elite_diversity_threshold >= 0.0) {
            return Err(ConfigError::InvalidDiversityThreshold {
                threshold: elite_diversity_threshold,
            });
        }
        for (name, value) in [
            ("training.generations", generations),
            ("training.runs_per_individual", runs_per_individual),
            ("training.max_steps", max_steps),
            ("training.checkpoint_interval", checkpoint_interval),
            ("training.max_checkpoints", max_checkpoints),
        ] {
            if value < 1 {
                return Err(ConfigError::ZeroCount { name });
            }
        }
        if !(tick_seconds.is_finite() && tick_seconds > 0.0) {
            return Err(ConfigError::InvalidTick { tick_seconds });
        }
        if !(initial_speed > 0.0 && max_speed.is_finite() && max_speed >= initial_speed) {
            return Err(ConfigError::InvalidSpeed {
                initial_speed,
                max_speed,
            });
        }
        Ok(())
    }
}
