mod config;
pub mod database;

pub use config::{AlertsConfig, Config, StatsConfig, TimerConfig};
pub use database::{Database, Note, SessionRecord};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::{ConfigError, Result};

/// Returns the data directory, creating it if needed.
///
/// `STUDYCLOCK_DATA_DIR` wins when set. Otherwise `~/.config/studyclock/`,
/// or `~/.config/studyclock-dev/` when `STUDYCLOCK_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("STUDYCLOCK_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYCLOCK_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studyclock-dev")
            } else {
                base_dir.join("studyclock")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Append-only sink for completed session records.
///
/// This is the only part of the record store the session engine sees.
pub trait SessionLog {
    /// Persist one record and return it as stored.
    fn append_completed_session(&mut self, record: &SessionRecord) -> Result<SessionRecord>;
}

impl SessionLog for Database {
    fn append_completed_session(&mut self, record: &SessionRecord) -> Result<SessionRecord> {
        self.append_session(record)?;
        Ok(record.clone())
    }
}

/// In-memory session log. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<SessionRecord>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<SessionRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionLog for MemoryLog {
    fn append_completed_session(&mut self, record: &SessionRecord) -> Result<SessionRecord> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| crate::error::DatabaseError::Locked)?;
        guard.push(record.clone());
        Ok(record.clone())
    }
}
