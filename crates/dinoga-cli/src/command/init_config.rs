use std::path::PathBuf;

use dinoga_training::config::TrainingConfig;

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct InitConfigArg {
    /// Built-in configuration: quick, standard or intensive
    #[arg(long, default_value = "standard")]
    preset: String,
    /// Output file path [default: stdout]
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &InitConfigArg) -> anyhow::Result<()> {
    let InitConfigArg { preset, output } = arg;
    let config = TrainingConfig::preset(preset)?;
    util::write_json(&config, output.as_deref())?;
    if let Some(path) = output {
        eprintln!("Config '{preset}' written to {}", path.display());
    }
    Ok(())
}
