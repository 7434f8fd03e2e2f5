use anyhow::Context;
use dinoga_engine::SimulatedGame;
use dinoga_stats::descriptive::DescriptiveStats;
use dinoga_training::{engine::EvolutionEngine, evaluator::SessionEvaluator};

use crate::util::ConfigArg;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct DemoArg {
    #[clap(flatten)]
    config: ConfigArg,
    /// Number of episodes to play
    #[arg(long, default_value_t = 3)]
    runs: usize,
}

pub(crate) fn run(arg: &DemoArg) -> anyhow::Result<()> {
    let DemoArg { config, runs } = arg;
    let config = config.load()?;
    let save_file = config.training.save_file.clone();

    let mut engine =
        EvolutionEngine::initialize(config.clone()).context("Invalid training configuration")?;
    let loaded = engine
        .load(&save_file)
        .with_context(|| format!("Failed to load population: {}", save_file.display()))?;
    let Some(best) = engine.best_policy().filter(|_| loaded) else {
        eprintln!(
            "No best policy found in {}; train first.",
            save_file.display()
        );
        return Ok(());
    };

    eprintln!("Best policy (fitness {:.2}):", engine.best_fitness());
    eprintln!("  Weights:   {:.3?}", best.weights());
    eprintln!("  Jump bias: {:.3}", best.jump_bias());
    eprintln!("  Duck bias: {:.3}", best.duck_bias());

    let evaluator = SessionEvaluator::new(1, config.training.max_steps);
    let mut game = SimulatedGame::new(config.simulation);
    let mut scores = Vec::with_capacity(*runs);
    for run in 0..*runs {
        let result = evaluator.play_session(&mut game, best);
        eprintln!(
            "  Run {:2}: score {:.0} ({} steps{})",
            run + 1,
            result.score,
            result.steps,
            if result.terminated { "" } else { ", step limit" }
        );
        scores.push(result.score);
    }

    if let Some(stats) = DescriptiveStats::new(scores) {
        eprintln!();
        eprintln!("Demo Stats:");
        eprintln!("  Mean: {:.2}", stats.mean);
        eprintln!("  Max:  {:.0}", stats.max);
        eprintln!("  Min:  {:.0}", stats.min);
        eprintln!("  Range: {:.0}", stats.max - stats.min);
    }
    Ok(())
}
