//! Summaries of a finished (or interrupted) training run.

use chrono::{DateTime, Utc};
use dinoga_stats::descriptive::DescriptiveStats;
use serde::{Deserialize, Serialize};

use crate::{config::TrainingConfig, history::TrainingRecord};

/// Generations compared at each end of the history for [`Trend`].
pub const TREND_WINDOW: usize = 5;

/// Direction of best fitness between the start and the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    #[display("rising")]
    Rising,
    #[display("falling")]
    Falling,
    #[display("flat")]
    Flat,
}

/// Mean best fitness of the first vs the last [`TREND_WINDOW`] generations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    pub early_mean_best: f64,
    pub recent_mean_best: f64,
}

impl Trend {
    #[must_use]
    pub fn change(&self) -> f64 {
        self.recent_mean_best - self.early_mean_best
    }

    #[must_use]
    pub fn direction(&self) -> TrendDirection {
        let change = self.change();
        if change > 0.0 {
            TrendDirection::Rising
        } else if change < 0.0 {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        }
    }
}

/// Aggregate statistics over a training history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub total_generations: usize,
    pub total_time_secs: f64,
    pub mean_time_secs: f64,
    pub fastest_time_secs: f64,
    pub slowest_time_secs: f64,
    pub time_std_secs: f64,
    /// Generations whose best beat the best-ever fitness.
    pub improvements: usize,
    /// `improvements / total_generations`, in `[0, 1]`.
    pub improvement_rate: f64,
    /// Highest per-generation best fitness.
    pub max_best_fitness: f64,
    /// Lowest per-generation best fitness.
    pub min_best_fitness: f64,
    /// Mean of the per-generation mean fitness.
    pub mean_fitness: f64,
    /// Standard deviation of the per-generation best fitness.
    pub best_fitness_std: f64,
    pub final_best_fitness: f64,
    /// Present once the history spans at least [`TREND_WINDOW`] generations.
    pub trend: Option<Trend>,
}

impl TrainingSummary {
    /// Summarizes `history`; `best_fitness` is the best-ever fitness at the end of it.
    ///
    /// Returns `None` for an empty history.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_history(history: &[TrainingRecord], best_fitness: f64) -> Option<Self> {
        let times = DescriptiveStats::new(history.iter().map(|r| r.duration_secs))?;
        let best = DescriptiveStats::new(history.iter().map(|r| r.best_fitness))?;
        let mean = DescriptiveStats::new(history.iter().map(|r| r.mean_fitness))?;
        let improvements = history.iter().filter(|r| r.improved).count();

        let trend = (history.len() >= TREND_WINDOW).then(|| {
            let mean_best = |records: &[TrainingRecord]| {
                records.iter().map(|r| r.best_fitness).sum::<f64>() / records.len() as f64
            };
            Trend {
                early_mean_best: mean_best(&history[..TREND_WINDOW]),
                recent_mean_best: mean_best(&history[history.len() - TREND_WINDOW..]),
            }
        });

        Some(Self {
            total_generations: history.len(),
            total_time_secs: history.iter().map(|r| r.duration_secs).sum(),
            mean_time_secs: times.mean,
            fastest_time_secs: times.min,
            slowest_time_secs: times.max,
            time_std_secs: times.std_dev,
            improvements,
            improvement_rate: improvements as f64 / history.len() as f64,
            max_best_fitness: best.max,
            min_best_fitness: best.min,
            mean_fitness: mean.mean,
            best_fitness_std: best.std_dev,
            final_best_fitness: best_fitness,
            trend,
        })
    }
}

/// Training report written after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub timestamp: DateTime<Utc>,
    pub generation: usize,
    pub best_fitness: f64,
    pub training_history: Vec<TrainingRecord>,
    pub summary: Option<TrainingSummary>,
    pub config: TrainingConfig,
}

impl TrainingReport {
    #[must_use]
    pub fn new(
        generation: usize,
        best_fitness: f64,
        training_history: Vec<TrainingRecord>,
        config: TrainingConfig,
    ) -> Self {
        let summary = TrainingSummary::from_history(&training_history, best_fitness);
        Self {
            timestamp: Utc::now(),
            generation,
            best_fitness,
            training_history,
            summary,
            config,
        }
    }

    /// `training_report_YYYYmmdd_HHMMSS.json`
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "training_report_{}.json",
            self.timestamp.format("%Y%m%d_%H%M%S")
        )
    }
}
