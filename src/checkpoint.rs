//! Checkpoint persistence for the last processed mention id.
//!
//! The checkpoint is a single decimal integer in a text file. There is no
//! locking and no atomic rename: exactly one bot process is expected to own
//! the file.

use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{BotError, BotResult};

/// File name of the checkpoint inside the variable-data directory.
pub const CHECKPOINT_FILENAME: &str = "last_seen_id.txt";

/// Value written when no checkpoint exists yet.
pub const DEFAULT_MENTION_ID: u64 = 1;

/// Reads and writes the last processed mention id.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
    default_id: u64,
}

impl CheckpointStore {
    /// Creates a store backed by `<var_dir>/last_seen_id.txt`.
    pub fn in_dir(var_dir: &Path) -> Self {
        Self::new(var_dir.join(CHECKPOINT_FILENAME))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            default_id: DEFAULT_MENTION_ID,
        }
    }

    pub fn with_default(mut self, default_id: u64) -> Self {
        self.default_id = default_id;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the directory holding the checkpoint file if it is missing.
    pub fn ensure_dir(&self) -> BotResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("Creating variable data directory {}", parent.display());
                fs::create_dir_all(parent).map_err(|e| BotError::io(parent, e))?;
            }
        }
        Ok(())
    }

    /// Returns the stored mention id.
    ///
    /// If the file does not exist, the default id is written first and then
    /// read back.
    pub fn retrieve(&self) -> BotResult<u64> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "No checkpoint at {}, initializing it with {}",
                    self.path.display(),
                    self.default_id
                );
                self.store(self.default_id)?;
                fs::read_to_string(&self.path).map_err(|e| BotError::io(&self.path, e))?
            }
            Err(e) => return Err(BotError::io(&self.path, e)),
        };

        content
            .trim()
            .parse::<u64>()
            .map_err(|_| BotError::Checkpoint {
                path: self.path.clone(),
                content: content.clone(),
            })
    }

    /// Overwrites the checkpoint with `id`.
    pub fn store(&self, id: u64) -> BotResult<()> {
        debug!("Storing checkpoint {} to {}", id, self.path.display());
        fs::write(&self.path, id.to_string()).map_err(|e| BotError::io(&self.path, e))
    }
}
