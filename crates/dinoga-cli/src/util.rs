use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use dinoga_training::config::TrainingConfig;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "dinoga_config.json";

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ConfigArg {
    /// Configuration file [default: dinoga_config.json, or built-in defaults if absent]
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ConfigArg {
    pub fn load(&self) -> anyhow::Result<TrainingConfig> {
        load_config(self.config.as_deref(), None)
    }
}

/// Resolves the configuration: an explicit file, else a preset, else the default file.
pub fn load_config(path: Option<&Path>, preset: Option<&str>) -> anyhow::Result<TrainingConfig> {
    let config = match (path, preset) {
        (Some(path), _) => TrainingConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        (None, Some(name)) => TrainingConfig::preset(name)?,
        (None, None) => TrainingConfig::load_or_default(DEFAULT_CONFIG_PATH)
            .with_context(|| format!("Failed to load config: {DEFAULT_CONFIG_PATH}"))?,
    };
    Ok(config)
}

/// Writes `value` as pretty JSON to `path`, or to stdout if `path` is `None`.
pub fn write_json<T>(value: &T, path: Option<&Path>) -> anyhow::Result<()>
where
    T: serde::Serialize,
{
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            write_pretty(BufWriter::new(file), value)
                .with_context(|| format!("Failed to write JSON to {}", path.display()))
        }
        None => write_pretty(io::stdout().lock(), value).context("Failed to write JSON to stdout"),
    }
}

fn write_pretty<W, T>(mut writer: W, value: &T) -> io::Result<()>
where
    W: Write,
    T: serde::Serialize,
{
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()
}
