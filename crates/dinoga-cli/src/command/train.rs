use std::{path::PathBuf, time::Instant};

use anyhow::Context;
use dinoga_engine::SimulatedGame;
use dinoga_training::{
    engine::EvolutionEngine, evaluator::SessionEvaluator, genetic::rank_by_fitness,
    report::TrainingReport,
};

use crate::util;

/// Fitness values shown per generation.
const TOP_FITNESS_SHOWN: usize = 5;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Configuration file [default: dinoga_config.json, or built-in defaults if absent]
    #[arg(long)]
    config: Option<PathBuf>,
    /// Built-in configuration: quick, standard or intensive
    #[arg(long, conflicts_with = "config")]
    preset: Option<String>,
    /// Resume from the latest checkpoint instead of the save file
    #[arg(long)]
    resume: bool,
    /// Number of generations to run (overrides the configuration)
    #[arg(long)]
    generations: Option<usize>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        config,
        preset,
        resume,
        generations,
    } = arg;

    let mut config = util::load_config(config.as_deref(), preset.as_deref())?;
    if let Some(generations) = generations {
        config.training.generations = *generations;
    }
    let mut engine =
        EvolutionEngine::initialize(config.clone()).context("Invalid training configuration")?;

    let save_file = &config.training.save_file;
    let resumed = *resume
        && engine
            .resume_from_latest_checkpoint()
            .context("Failed to resume from checkpoint")?;
    if !resumed {
        engine
            .load(save_file)
            .with_context(|| format!("Failed to load population: {}", save_file.display()))?;
    }

    let evaluator = SessionEvaluator::from_params(&config.training);
    let mut game = SimulatedGame::with_seed(config.simulation, engine.seed());
    let generations = config.training.generations;
    let started = Instant::now();

    for round in 0..generations {
        eprintln!(
            "Generation #{} ({}/{generations}):",
            engine.generation() + 1,
            round + 1
        );
        let fitness = evaluator.evaluate_population(&mut game, engine.population());

        eprintln!("  Individuals:");
        let members = engine.population().individuals().iter().zip(&fitness);
        for (i, (policy, fitness)) in members.enumerate() {
            eprintln!(
                "  {i:2}: {:.3?} bias [{:.3}, {:.3}] => {fitness:.2}",
                policy.weights(),
                policy.jump_bias(),
                policy.duck_bias()
            );
        }
        let weight_stats = engine.population().compute_weight_stats();
        eprintln!("  Weights Stats:");
        eprintln!(
            "    Min:  {:.3?}",
            weight_stats.iter().map(|s| s.min).collect::<Vec<_>>()
        );
        eprintln!(
            "    Max:  {:.3?}",
            weight_stats.iter().map(|s| s.max).collect::<Vec<_>>()
        );
        eprintln!(
            "    Mean: {:.3?}",
            weight_stats.iter().map(|s| s.mean).collect::<Vec<_>>()
        );

        let record = engine
            .evaluate_and_record(&fitness)
            .context("Training step failed")?;
        let top = rank_by_fitness(&fitness)
            .into_iter()
            .take(TOP_FITNESS_SHOWN)
            .map(|i| fitness[i])
            .collect::<Vec<_>>();

        eprintln!("  Fitness Stats:");
        eprintln!("    Time:      {:.2}s", record.duration_secs);
        eprintln!(
            "    Best:      {:.2}{}",
            record.best_fitness,
            if record.improved { " (new best)" } else { "" }
        );
        eprintln!("    Mean:      {:.2}", record.mean_fitness);
        eprintln!("    Std:       {:.2}", record.spread.std);
        eprintln!("    Top:       {top:.1?}");
        eprintln!("    Best ever: {:.2}", engine.best_fitness());

        #[expect(clippy::cast_precision_loss)]
        let remaining =
            started.elapsed().as_secs_f64() / (round + 1) as f64 * (generations - round - 1) as f64;
        eprintln!("    Remaining: ~{:.1} min", remaining / 60.0);

        engine
            .save(save_file)
            .with_context(|| format!("Failed to save population: {}", save_file.display()))?;
    }

    engine
        .save(save_file)
        .with_context(|| format!("Failed to save population: {}", save_file.display()))?;
    eprintln!();
    eprintln!("Training completed");
    eprintln!("  Population saved to: {}", save_file.display());

    let report = TrainingReport::new(
        engine.generation(),
        engine.best_fitness(),
        engine.history().to_vec(),
        config,
    );
    let report_path = PathBuf::from(report.file_name());
    util::write_json(&report, Some(&report_path))?;
    eprintln!("  Report saved to: {}", report_path.display());
    super::report::print_report(&report);

    if let Some(best) = engine.best_policy() {
        let result = evaluator.play_session(&mut game, best);
        eprintln!();
        eprintln!("Best policy demo: score {:.0}", result.score);
    }

    Ok(())
}
