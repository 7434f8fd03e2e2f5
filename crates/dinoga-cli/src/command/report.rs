use anyhow::Context;
use dinoga_training::{persistence::CheckpointStore, report::TrainingReport};

use crate::util::ConfigArg;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ReportArg {
    #[clap(flatten)]
    config: ConfigArg,
}

pub(crate) fn run(arg: &ReportArg) -> anyhow::Result<()> {
    let config = arg.config.load()?;
    let store = CheckpointStore::new(
        &config.training.checkpoint_dir,
        config.training.max_checkpoints,
    );
    let Some((path, checkpoint)) = store
        .latest()
        .with_context(|| format!("Failed to read checkpoints in {}", store.dir().display()))?
    else {
        eprintln!("No checkpoints in {}", store.dir().display());
        return Ok(());
    };

    eprintln!("Report for {}", path.display());
    let report = TrainingReport::new(
        checkpoint.state.generation,
        checkpoint.state.best_fitness,
        checkpoint.training_history,
        checkpoint.config,
    );
    print_report(&report);
    Ok(())
}

pub(crate) fn print_report(report: &TrainingReport) {
    let Some(summary) = &report.summary else {
        eprintln!("No training history");
        return;
    };

    eprintln!();
    eprintln!("Training Report:");
    eprintln!("  Generations:       {}", summary.total_generations);
    eprintln!(
        "  Total time:        {:.2}s ({:.1} min)",
        summary.total_time_secs,
        summary.total_time_secs / 60.0
    );
    eprintln!("  Mean time/gen:     {:.2}s", summary.mean_time_secs);
    eprintln!("  Final best:        {:.2}", summary.final_best_fitness);

    eprintln!("  Improvements:");
    eprintln!(
        "    Count: {}/{}",
        summary.improvements, summary.total_generations
    );
    eprintln!("    Rate:  {:.1}%", summary.improvement_rate * 100.0);

    eprintln!("  Fitness:");
    eprintln!("    Max best:  {:.2}", summary.max_best_fitness);
    eprintln!("    Min best:  {:.2}", summary.min_best_fitness);
    eprintln!("    Mean:      {:.2}", summary.mean_fitness);
    eprintln!("    Best std:  {:.2}", summary.best_fitness_std);

    eprintln!("  Time:");
    eprintln!("    Fastest: {:.2}s", summary.fastest_time_secs);
    eprintln!("    Slowest: {:.2}s", summary.slowest_time_secs);
    eprintln!("    Std:     {:.2}s", summary.time_std_secs);

    if let Some(trend) = &summary.trend {
        eprintln!("  Trend (first vs last generations):");
        eprintln!("    Early mean best:  {:.2}", trend.early_mean_best);
        eprintln!("    Recent mean best: {:.2}", trend.recent_mean_best);
        eprintln!("    Direction:        {} ({:+.2})", trend.direction(), trend.change());
    }
}
