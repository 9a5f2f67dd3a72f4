use std::collections::BTreeSet;
use std::path::PathBuf;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Version of the persisted session format
///
/// Records written with any other version are rejected as corrupt, never
/// upgraded in place.
pub const FORMAT_VERSION: u32 = 1;

/// The command a session replays on resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Cp,
    Sync,
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandType::Cp => f.write_str("cp"),
            CommandType::Sync => f.write_str("sync"),
        }
    }
}

/// Locators as given on the original command line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandArgs {
    pub sources: Vec<String>,
    pub targets: Vec<String>,
}

impl CommandArgs {
    pub fn new(sources: Vec<String>, targets: Vec<String>) -> Self {
        Self { sources, targets }
    }

    /// Every locator, sources first
    pub fn locators(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().chain(&self.targets).map(String::as_str)
    }
}

/// Immutable description of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub id: String,
    pub version: u32,
    pub command: CommandType,
    /// Working directory relative locators are resolved against
    pub root_path: PathBuf,
    pub args: CommandArgs,
    pub created: Timestamp,
}

impl std::fmt::Display for SessionHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} {} -> {}",
            self.id,
            self.created.strftime("%Y-%m-%d %H:%M:%S"),
            self.command,
            self.args.sources.join(" "),
            self.args.targets.join(" ")
        )
    }
}

/// Cumulative progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub objects: u64,
    pub bytes: u64,
}

/// Everything persisted for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub header: SessionHeader,
    /// Ledger keys of completed pairs
    #[serde(default)]
    pub completed: BTreeSet<String>,
    #[serde(default)]
    pub counters: Counters,
}

impl SessionRecord {
    pub fn new(header: SessionHeader) -> Self {
        Self {
            header,
            completed: BTreeSet::new(),
            counters: Counters::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.header.id
    }

    pub fn is_complete(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    /// Record a completed pair; counters move only the first time
    pub fn mark_complete(&mut self, key: impl Into<String>, bytes: u64) -> bool {
        let fresh = self.completed.insert(key.into());
        if fresh {
            self.counters.objects += 1;
            self.counters.bytes += bytes;
        }
        fresh
    }
}
