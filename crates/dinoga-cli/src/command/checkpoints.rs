use anyhow::Context;
use dinoga_training::persistence::CheckpointStore;

use crate::util::ConfigArg;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct CheckpointsArg {
    #[clap(flatten)]
    config: ConfigArg,
}

pub(crate) fn run(arg: &CheckpointsArg) -> anyhow::Result<()> {
    let config = arg.config.load()?;
    let store = CheckpointStore::new(
        &config.training.checkpoint_dir,
        config.training.max_checkpoints,
    );
    let checkpoints = store.list().with_context(|| {
        format!(
            "Failed to list checkpoints in {}",
            store.dir().display()
        )
    })?;

    if checkpoints.is_empty() {
        eprintln!("No checkpoints in {}", store.dir().display());
        return Ok(());
    }

    eprintln!("Checkpoints in {}:", store.dir().display());
    eprintln!("  {:>10}  {:>12}  {:<27}  File", "Generation", "Best", "Saved at");
    for info in &checkpoints {
        eprintln!(
            "  {:>10}  {:>12.2}  {:<27}  {}",
            info.generation,
            info.best_fitness,
            info.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            info.file_name
        );
    }
    Ok(())
}
