//! Per-generation training log.

use std::time::Duration;

use dinoga_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};

/// Distribution of one round's fitness scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessSpread {
    pub max: f64,
    pub min: f64,
    /// Population standard deviation.
    pub std: f64,
}

/// One completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Generation number reached by this step.
    pub generation: usize,
    /// Best fitness of the round.
    pub best_fitness: f64,
    /// Mean fitness of the round.
    pub mean_fitness: f64,
    pub spread: FitnessSpread,
    /// Wall-clock seconds spent on the round.
    pub duration_secs: f64,
    /// Whether the round best strictly beat the previous best-ever fitness.
    pub improved: bool,
}

impl TrainingRecord {
    /// Summarizes one round of fitness scores.
    ///
    /// Returns `None` if `fitness` is empty.
    #[must_use]
    pub fn new(
        generation: usize,
        fitness: &[f64],
        duration: Duration,
        best_fitness_ever: f64,
    ) -> Option<Self> {
        let stats = DescriptiveStats::new(fitness.iter().copied())?;
        Some(Self {
            generation,
            best_fitness: stats.max,
            mean_fitness: stats.mean,
            spread: FitnessSpread {
                max: stats.max,
                min: stats.min,
                std: stats.std_dev,
            },
            duration_secs: duration.as_secs_f64(),
            improved: stats.max > best_fitness_ever,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_fitness() {
        let record =
            TrainingRecord::new(4, &[10.0, 5.0, 8.0, 2.0, 1.0], Duration::from_secs(2), 9.0)
                .unwrap();
        assert_eq!(record.generation, 4);
        assert_eq!(record.best_fitness, 10.0);
        assert!((record.mean_fitness - 5.2).abs() < 1e-12);
        assert_eq!(record.spread.min, 1.0);
        assert_eq!(record.duration_secs, 2.0);
        assert!(record.improved);
    }

    #[test]
    fn test_tie_is_not_an_improvement() {
        let record = TrainingRecord::new(1, &[3.0, 3.0], Duration::ZERO, 3.0).unwrap();
        assert!(!record.improved);
        assert_eq!(record.spread.std, 0.0);
    }

    #[test]
    fn test_empty_round() {
        assert!(TrainingRecord::new(1, &[], Duration::ZERO, 0.0).is_none());
    }
}
