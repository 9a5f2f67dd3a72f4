//! resync-core: planning and resumable sessions for the resync client
//!
//! This crate holds everything that does not talk to a storage service:
//! - Locator parsing and copy topology classification
//! - Lazy copy and sync plans over a [`ContentSource`]
//! - Session records, checkpoints and resume
//! - The execution driver that ties a plan to a session
//!
//! Storage access goes through the [`ObjectStore`] trait so the crate stays
//! independent of any S3 SDK.

pub mod config;
pub mod content;
pub mod error;
pub mod exec;
pub mod locator;
pub mod path;
pub mod plan;
pub mod session;
pub mod source;
pub mod topology;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::{Alias, Config, ConfigManager, SessionSettings};
pub use content::{Content, ContentKind, TransferStatus};
pub use error::{Error, Result};
pub use exec::{resume, resume_session, run_session, DriverEvent, PlannedTransfer, RunSummary, Transfer};
pub use locator::Locator;
pub use path::{parse_path, ParsedPath, RemotePath};
pub use plan::{
    normalize_targets, plan_copy, plan_sync, CopyPair, PlanEntry, PlanStream, SyncPair, SyncTarget,
};
pub use session::{
    ClearReport, CommandArgs, CommandType, Session, SessionContext, SessionHeader, SessionRecord,
    SessionState, WorkdirGuard,
};
pub use source::{ContentSource, LocalFs, ObjectSource, Router};
pub use topology::{classify, Topology};
pub use traits::{ListOptions, ListPage, ObjectInfo, ObjectStore};
