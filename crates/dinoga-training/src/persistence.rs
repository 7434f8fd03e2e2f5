//! On-disk training state.
//!
//! Two kinds of files are written, both as pretty-printed JSON:
//!
//! - The **save file**: a single canonical slot holding [`SavedPopulation`]
//!   (generation, best-ever fitness and policy, full population). Every save
//!   truncates and rewrites it; the write is not atomic.
//! - **Checkpoints**: timestamped [`Checkpoint`] snapshots that additionally
//!   carry the training history and the configuration they were produced with.
//!   A [`CheckpointStore`] keeps at most `max_checkpoints` of them, deleting the
//!   oldest by creation time.
//!
//! Policies are stored as `{"weights": [w0, .., w4], "bias": [jump, duck]}`.
//! Mutation parameters are not persisted; they come from the configuration in
//! effect when the state is loaded.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
    time::SystemTime,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    config::TrainingConfig,
    history::TrainingRecord,
    policy::{MutationParams, Policy},
    weights::Weights,
};

const CHECKPOINT_PREFIX: &str = "checkpoint_";
const CHECKPOINT_EXTENSION: &str = ".json";

/// Failure to read or write training state.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum PersistenceError {
    #[display("I/O error on {}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[display("malformed training state in {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display("failed to serialize training state to {}", path.display())]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[display(
        "{} holds {actual} policies but the configured population size is {expected}",
        path.display()
    )]
    PopulationSize {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

/// Serialized form of a [`Policy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub weights: Weights,
    /// `[jump_bias, duck_bias]`
    pub bias: [f64; 2],
}

impl From<&Policy> for PolicyRecord {
    fn from(policy: &Policy) -> Self {
        Self {
            weights: *policy.weights(),
            bias: [policy.jump_bias(), policy.duck_bias()],
        }
    }
}

impl PolicyRecord {
    #[must_use]
    pub fn to_policy(&self, mutation: MutationParams) -> Policy {
        let [jump_bias, duck_bias] = self.bias;
        Policy::new(self.weights, jump_bias, duck_bias, mutation)
    }
}

/// Contents of the save file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPopulation {
    pub generation: usize,
    pub best_fitness: f64,
    /// `None` until some round beats the initial best fitness.
    pub best_individual: Option<PolicyRecord>,
    pub population: Vec<PolicyRecord>,
}

/// A full point-in-time snapshot of training state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(flatten)]
    pub state: SavedPopulation,
    #[serde(default)]
    pub training_history: Vec<TrainingRecord>,
    pub config: TrainingConfig,
    pub timestamp: DateTime<Utc>,
}

impl Checkpoint {
    /// File name used for this checkpoint inside a [`CheckpointStore`].
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{CHECKPOINT_PREFIX}gen_{:06}_{}{CHECKPOINT_EXTENSION}",
            self.state.generation,
            self.timestamp.format("%Y%m%dT%H%M%S%6f")
        )
    }
}

/// Summary of one checkpoint file, as returned by [`CheckpointStore::list`].
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub generation: usize,
    pub best_fitness: f64,
    pub timestamp: DateTime<Utc>,
}

/// The fields of a checkpoint needed for listing; the rest of the file is skipped.
#[derive(Debug, Deserialize)]
struct CheckpointHeader {
    generation: usize,
    best_fitness: f64,
    timestamp: DateTime<Utc>,
}

/// Returns `true` for file names managed by [`CheckpointStore`].
#[must_use]
pub fn is_checkpoint_file_name(name: &str) -> bool {
    name.starts_with(CHECKPOINT_PREFIX) && name.ends_with(CHECKPOINT_EXTENSION)
}

/// Writes `value` as pretty JSON, replacing any existing file.
///
/// Missing parent directories are created.
pub fn write_json<T, P>(path: P, value: &T) -> Result<(), PersistenceError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let io_error = |source| PersistenceError::Io {
        path: path.to_owned(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| {
        PersistenceError::Serialize {
            path: path.to_owned(),
            source,
        }
    })?;
    writeln!(writer).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    Ok(())
}

/// Reads a JSON file.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn read_json<T, P>(path: P) -> Result<Option<T>, PersistenceError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(PersistenceError::Io {
                path: path.to_owned(),
                source,
            });
        }
    };
    let value = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        PersistenceError::Parse {
            path: path.to_owned(),
            source,
        }
    })?;
    Ok(Some(value))
}

/// A directory of rotating checkpoint files.
///
/// Only files whose names match [`is_checkpoint_file_name`] are read or deleted.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    max_checkpoints: usize,
}

/// A checkpoint-named file and the time used to order it.
#[derive(Debug)]
struct CheckpointFile {
    created: SystemTime,
    file_name: String,
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new<P>(dir: P, max_checkpoints: usize) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            dir: dir.into(),
            max_checkpoints,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes a new checkpoint file, then prunes the oldest ones.
    ///
    /// Pruning failures are logged and do not fail the write.
    pub fn write(&self, checkpoint: &Checkpoint) -> Result<PathBuf, PersistenceError> {
        let path = self.dir.join(checkpoint.file_name());
        write_json(&path, checkpoint)?;
        tracing::info!(
            path = %path.display(),
            generation = checkpoint.state.generation,
            "checkpoint saved"
        );

        if let Err(e) = self.prune() {
            tracing::warn!(error = %e, "failed to prune old checkpoints");
        }
        Ok(path)
    }

    /// Deletes the oldest checkpoint files beyond `max_checkpoints`.
    ///
    /// Returns the paths that were removed.
    pub fn prune(&self) -> Result<Vec<PathBuf>, PersistenceError> {
        let files = self.checkpoint_files()?;
        let excess = files.len().saturating_sub(self.max_checkpoints);

        let mut removed = Vec::with_capacity(excess);
        for file in files.into_iter().take(excess) {
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    tracing::info!(file = %file.file_name, "removed old checkpoint");
                    removed.push(file.path);
                }
                Err(e) => {
                    tracing::warn!(file = %file.file_name, error = %e, "failed to remove old checkpoint");
                }
            }
        }
        Ok(removed)
    }

    /// Loads the most recently created checkpoint.
    ///
    /// Returns `Ok(None)` if the directory holds no checkpoint files. A malformed
    /// newest checkpoint is an error; older files are not tried instead.
    pub fn latest(&self) -> Result<Option<(PathBuf, Checkpoint)>, PersistenceError> {
        let Some(newest) = self.checkpoint_files()?.pop() else {
            return Ok(None);
        };
        let checkpoint: Checkpoint = read_json(&newest.path)?.ok_or_else(|| PersistenceError::Io {
            path: newest.path.clone(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })?;
        Ok(Some((newest.path, checkpoint)))
    }

    /// Lists every readable checkpoint, highest generation first.
    ///
    /// Files that cannot be read or parsed are skipped.
    pub fn list(&self) -> Result<Vec<CheckpointInfo>, PersistenceError> {
        let mut infos = self
            .checkpoint_files()?
            .into_iter()
            .filter_map(|file| match read_json::<CheckpointHeader, _>(&file.path) {
                Ok(Some(header)) => Some(CheckpointInfo {
                    file_name: file.file_name,
                    path: file.path,
                    generation: header.generation,
                    best_fitness: header.best_fitness,
                    timestamp: header.timestamp,
                }),
                Ok(None) => None,
                Err(e) => {
                    tracing::debug!(file = %file.file_name, error = %e, "skipping unreadable checkpoint");
                    None
                }
            })
            .collect::<Vec<_>>();
        infos.sort_by(|a, b| b.generation.cmp(&a.generation));
        Ok(infos)
    }

    /// Checkpoint-named files, oldest first.
    ///
    /// Ordered by creation time (modification time where the filesystem does not
    /// record creation), then by file name. A missing directory has no files.
    fn checkpoint_files(&self) -> Result<Vec<CheckpointFile>, PersistenceError> {
        let io_error = |source| PersistenceError::Io {
            path: self.dir.clone(),
            source,
        };

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => return Err(io_error(source)),
        };

        let mut files = vec![];
        for entry in entries {
            let entry = entry.map_err(io_error)?;
            let Ok(file_name) = entry.file_name().into_string() else {
                continue;
            };
            if !is_checkpoint_file_name(&file_name) {
                continue;
            }
            let metadata = entry.metadata().map_err(io_error)?;
            if !metadata.is_file() {
                continue;
            }
            let created = metadata
                .created()
                .or_else(|_| metadata.modified())
                .map_err(io_error)?;
            files.push(CheckpointFile {
                created,
                file_name,
                path: entry.path(),
            });
        }
        files.sort_by(|a, b| {
            a.created
                .cmp(&b.created)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(files)
    }
}
