//! Resumable transfer sessions
//!
//! A [`SessionContext`] owns one directory holding a JSON record per session
//! (`<id>.json`). Records are rewritten whole on every checkpoint through a
//! temporary file and a rename, so an interrupted write leaves the previous
//! record in place. [`Session`] is the handle the execution driver holds while
//! a plan runs.

mod record;
mod workdir;

use std::path::{Path, PathBuf};
use std::time::Duration;

use jiff::Timestamp;

pub use record::{CommandArgs, CommandType, Counters, SessionHeader, SessionRecord, FORMAT_VERSION};
pub use workdir::WorkdirGuard;

#[cfg(test)]
pub(crate) use workdir::cwd_lock;

use crate::config::{Config, ConfigManager};
use crate::error::{Error, Result};

/// Length of a session ID in hex characters
const ID_LEN: usize = 8;

/// Attempts at drawing an unused ID before giving up
const MAX_ID_ATTEMPTS: usize = 16;

/// Default number of extra attempts for a failed checkpoint write
pub const DEFAULT_CHECKPOINT_RETRIES: u32 = 3;

/// First pause between checkpoint attempts
const CHECKPOINT_BACKOFF: Duration = Duration::from_millis(25);

const RECORD_EXT: &str = "json";

/// Where sessions live and how they are written
#[derive(Debug, Clone)]
pub struct SessionContext {
    dir: PathBuf,
    checkpoint_retries: u32,
}

/// Lifecycle of a [`Session`] handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Checkpointed,
    Closed,
}

/// Outcome of [`SessionContext::clear`]
#[derive(Debug, Default)]
pub struct ClearReport {
    pub closed: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl ClearReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl SessionContext {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            checkpoint_retries: DEFAULT_CHECKPOINT_RETRIES,
        }
    }

    /// Session directory and retry policy from the loaded configuration
    pub fn from_config(manager: &ConfigManager, config: &Config) -> Self {
        Self::new(manager.session_dir(config))
            .with_checkpoint_retries(config.session.checkpoint_retries)
    }

    pub fn with_checkpoint_retries(mut self, retries: u32) -> Self {
        self.checkpoint_retries = retries;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Allocate a fresh session and persist its initial record
    pub fn create(
        &self,
        command: CommandType,
        root_path: impl Into<PathBuf>,
        args: CommandArgs,
    ) -> Result<Session> {
        let id = self.allocate_id()?;
        let header = SessionHeader {
            id,
            version: FORMAT_VERSION,
            command,
            root_path: root_path.into(),
            args,
            created: Timestamp::now(),
        };
        let mut session = Session {
            ctx: self.clone(),
            record: SessionRecord::new(header),
            state: SessionState::Created,
        };
        self.checkpoint(&session.record)?;
        session.state = SessionState::Active;
        tracing::debug!(id = %session.id(), command = %command, "session created");
        Ok(session)
    }

    /// IDs of every persisted session, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
                continue;
            }
            match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) if is_valid_id(stem) => ids.push(stem.to_string()),
                _ => {}
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Read and validate one record
    pub fn load(&self, id: &str) -> Result<SessionRecord> {
        let path = self.record_path(id)?;
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::SessionNotFound(id.to_string()));
            }
            Err(e) => return Err(corrupt(id, e)),
        };

        let record: SessionRecord = serde_json::from_slice(&data).map_err(|e| corrupt(id, e))?;
        if record.header.version != FORMAT_VERSION {
            return Err(corrupt(
                id,
                format!(
                    "format version {} is not supported (expected {FORMAT_VERSION})",
                    record.header.version
                ),
            ));
        }
        if record.header.id != id {
            return Err(corrupt(id, format!("record belongs to session '{}'", record.header.id)));
        }
        Ok(record)
    }

    /// Load a session as an active handle
    pub fn open(&self, id: &str) -> Result<Session> {
        let record = self.load(id)?;
        Ok(Session {
            ctx: self.clone(),
            record,
            state: SessionState::Active,
        })
    }

    /// Atomically replace the persisted record
    ///
    /// Failed writes are retried; the caller keeps its in-memory record
    /// either way.
    pub fn checkpoint(&self, record: &SessionRecord) -> Result<()> {
        let path = self.record_path(record.id())?;
        let mut attempt = 0;
        loop {
            match self.write_atomic(&path, record) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.checkpoint_retries => {
                    attempt += 1;
                    tracing::warn!(id = %record.id(), attempt, "checkpoint failed, retrying: {e}");
                    std::thread::sleep(retry_delay(attempt));
                }
                Err(e) => {
                    return Err(Error::CheckpointWrite {
                        id: record.id().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    /// Delete a persisted record
    pub fn close(&self, id: &str) -> Result<()> {
        let path = self.record_path(id)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(id, "session closed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::SessionNotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Close one session, or every session with `"all"`
    ///
    /// A single ID must load cleanly first, so a missing or corrupt record
    /// is an error. With `"all"` each session is closed on its own and
    /// failures are collected in the report.
    pub fn clear(&self, target: &str) -> Result<ClearReport> {
        let mut report = ClearReport::default();
        if target != "all" {
            self.load(target)?;
            self.close(target)?;
            report.closed.push(target.to_string());
            return Ok(report);
        }

        for id in self.list()? {
            match self.close(&id) {
                Ok(()) => report.closed.push(id),
                Err(e) => {
                    tracing::warn!(id = %id, "unable to clear session: {e}");
                    report.failed.push((id, e));
                }
            }
        }
        Ok(report)
    }

    fn allocate_id(&self) -> Result<String> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(ID_LEN)
                .collect();
            if !self.dir.join(format!("{id}.{RECORD_EXT}")).exists() {
                return Ok(id);
            }
        }
        Err(Error::General("unable to allocate a free session ID".into()))
    }

    fn record_path(&self, id: &str) -> Result<PathBuf> {
        if !is_valid_id(id) {
            return Err(Error::SessionNotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.{RECORD_EXT}")))
    }

    fn write_atomic(&self, path: &Path, record: &SessionRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(".")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), record)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Exactly the shape `allocate_id` produces: lowercase hex of `ID_LEN` characters
fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Pause before checkpoint retry number `attempt` (1-based), doubling each time
fn retry_delay(attempt: u32) -> Duration {
    CHECKPOINT_BACKOFF.saturating_mul(1 << attempt.saturating_sub(1).min(6))
}

fn corrupt(id: &str, reason: impl ToString) -> Error {
    Error::SessionCorrupt {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

/// An open session held by the execution driver
#[derive(Debug)]
pub struct Session {
    ctx: SessionContext,
    record: SessionRecord,
    state: SessionState,
}

impl Session {
    pub fn id(&self) -> &str {
        self.record.id()
    }

    pub fn header(&self) -> &SessionHeader {
        &self.record.header
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_complete(&self, key: &str) -> bool {
        self.record.is_complete(key)
    }

    /// Mark a pair complete and persist the ledger
    ///
    /// On a write failure the pair stays marked in memory and the next
    /// checkpoint carries it.
    pub fn checkpoint(&mut self, key: &str, bytes: u64) -> Result<()> {
        self.record.mark_complete(key, bytes);
        self.save()
    }

    /// Persist the current ledger
    pub fn save(&mut self) -> Result<()> {
        self.ctx.checkpoint(&self.record)?;
        self.state = SessionState::Checkpointed;
        Ok(())
    }

    /// Delete the persisted record
    pub fn close(mut self) -> Result<SessionRecord> {
        self.ctx.close(self.record.id())?;
        self.state = SessionState::Closed;
        Ok(self.record)
    }
}
