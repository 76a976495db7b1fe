//! Durable ledger of open spread positions.
//!
//! Every mutation is written to disk before it returns, so a restart picks up
//! exactly the positions that were recorded.
//!
//! # File Format
//!
//! Pretty-printed JSON object mapping `position_id` to the [`Position`] record.
//!
//! # Example
//!
//! ```ignore
//! let mut tracker = PositionTracker::load("logs/positions.json")?;
//! tracker.add(position)?;
//! tracker.update("IRON_CONDOR_20261016_140509", &update)?;
//! tracker.remove("IRON_CONDOR_20261016_140509")?;
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{Position, PositionUpdate};

/// Errors from reading or writing the ledger file.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("position already recorded: {0}")]
    DuplicatePosition(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Map from `position_id` to [`Position`], persisted after every mutation.
///
/// A failed write rolls the in-memory change back, so memory and disk never
/// disagree about a mutation that returned an error.
#[derive(Debug)]
pub struct PositionTracker {
    path: PathBuf,
    positions: BTreeMap<String, Position>,
}

impl PositionTracker {
    /// Opens the ledger at `path`.
    ///
    /// A missing file yields an empty ledger. A file that cannot be parsed is
    /// renamed to `<path>.corrupt-<timestamp>` and an empty ledger is started.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or backed up.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "No position ledger found, starting empty");
                return Ok(Self {
                    path,
                    positions: BTreeMap::new(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_reader::<_, BTreeMap<String, Position>>(BufReader::new(file)) {
            Ok(positions) => {
                info!(
                    path = %path.display(),
                    count = positions.len(),
                    "Loaded position ledger"
                );
                Ok(Self { path, positions })
            }
            Err(e) => {
                let backup = backup_path(&path);
                fs::rename(&path, &backup)?;
                warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "Position ledger unreadable, moved aside and starting empty"
                );
                Ok(Self {
                    path,
                    positions: BTreeMap::new(),
                })
            }
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn get(&self, position_id: &str) -> Option<&Position> {
        self.positions.get(position_id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Records a new position.
    ///
    /// # Errors
    /// [`LedgerError::DuplicatePosition`] if the id is already present, or the
    /// write error if persisting failed (the position is then not recorded).
    pub fn add(&mut self, position: Position) -> Result<()> {
        let id = position.position_id.clone();
        if self.positions.contains_key(&id) {
            return Err(LedgerError::DuplicatePosition(id));
        }
        self.positions.insert(id.clone(), position);
        if let Err(e) = self.persist() {
            self.positions.remove(&id);
            return Err(e);
        }
        info!(position_id = %id, "Position recorded");
        Ok(())
    }

    /// Merges `update` into the position. Returns `Ok(false)` without touching
    /// the ledger when the id is unknown.
    ///
    /// # Errors
    /// Returns the write error if persisting failed; the merge is undone.
    pub fn update(&mut self, position_id: &str, update: &PositionUpdate) -> Result<bool> {
        let Some(position) = self.positions.get_mut(position_id) else {
            debug!(position_id, "Update for unknown position ignored");
            return Ok(false);
        };
        let previous = position.clone();
        update.apply(position);
        if let Err(e) = self.persist() {
            self.positions.insert(position_id.to_string(), previous);
            return Err(e);
        }
        Ok(true)
    }

    /// Removes and returns the position, if present.
    ///
    /// # Errors
    /// Returns the write error if persisting failed; the position is restored.
    pub fn remove(&mut self, position_id: &str) -> Result<Option<Position>> {
        let Some(position) = self.positions.remove(position_id) else {
            return Ok(None);
        };
        if let Err(e) = self.persist() {
            self.positions.insert(position_id.to_string(), position);
            return Err(e);
        }
        info!(position_id, "Position removed");
        Ok(Some(position))
    }

    /// Drops the position from memory without writing. The file keeps it until
    /// the next successful write.
    pub(crate) fn forget(&mut self, position_id: &str) -> Option<Position> {
        self.positions.remove(position_id)
    }

    /// Writes the whole map to a sibling temp file and renames it over the ledger.
    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &self.positions)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(
            path = %self.path.display(),
            count = self.positions.len(),
            "Saved position ledger"
        );
        Ok(())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%d%H%M%S")));
    PathBuf::from(name)
}
