//! Execution driver
//!
//! Re-derives the plan recorded in a session, transfers every pair the
//! ledger does not already hold, and checkpoints after each one. The same
//! path serves fresh runs and resumes: a resumed session repeats
//! classification and enumeration and filters against its ledger.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use crate::content::Content;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::plan::{normalize_targets, plan_copy, plan_sync, CopyPair, PlanStream, SyncPair};
use crate::session::{CommandType, Session, SessionContext, WorkdirGuard};
use crate::source::ContentSource;
use crate::topology::classify;

/// Moves the bytes of one planned transfer
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Copy `source` to `target`, returning the bytes written
    async fn transfer(&self, source: &Content, target: &Content) -> Result<u64>;
}

/// What the driver needs from a planned pair
pub trait PlannedTransfer: Send + 'static {
    fn source(&self) -> &Content;

    /// Target slots in request order, with the error of slots that cannot be written
    fn targets(&self) -> Vec<(&Content, Option<&Error>)>;

    /// Pair-level error, taken out so it can be returned or reported
    fn take_error(&mut self) -> Option<Error>;

    /// Deterministic identity of this pair in a session ledger
    fn ledger_key(&self) -> String {
        let targets = self
            .targets()
            .iter()
            .map(|(content, _)| content.url.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} -> {}", self.source().url, targets)
    }
}

impl PlannedTransfer for CopyPair {
    fn source(&self) -> &Content {
        &self.source
    }

    fn targets(&self) -> Vec<(&Content, Option<&Error>)> {
        vec![(&self.target, None)]
    }

    fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

impl PlannedTransfer for SyncPair {
    fn source(&self) -> &Content {
        &self.source
    }

    fn targets(&self) -> Vec<(&Content, Option<&Error>)> {
        self.targets
            .iter()
            .map(|slot| (&slot.content, slot.error.as_ref()))
            .collect()
    }

    fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }
}

/// Progress notifications emitted while a session runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Already in the ledger
    Skipped { key: String },
    Transferred { key: String, bytes: u64 },
    Failed { key: String, message: String },
}

/// Totals for one run of a session
#[derive(Debug, Default)]
pub struct RunSummary {
    pub session_id: String,
    pub transferred: u64,
    pub skipped: u64,
    pub bytes: u64,
    /// Ledger key and message of every pair that did not complete
    pub failed: Vec<(String, String)>,
    /// Whether the session record was deleted at the end
    pub closed: bool,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run the plan recorded in `session` to completion
///
/// The session is closed when every pair completed and kept otherwise. A
/// structural error or a resolved `shutdown` checkpoints the ledger before
/// returning; the pair in flight at shutdown is not marked complete.
pub async fn run_session(
    mut session: Session,
    backend: Arc<dyn ContentSource>,
    transfer: &dyn Transfer,
    capacity: usize,
    shutdown: impl Future<Output = ()>,
    mut on_event: impl FnMut(DriverEvent),
) -> Result<RunSummary> {
    let shutdown = std::pin::pin!(shutdown);
    let mut summary = RunSummary {
        session_id: session.id().to_string(),
        ..RunSummary::default()
    };

    let header = session.header().clone();
    tracing::debug!(id = %header.id, command = %header.command, "running session");

    let sources = Locator::parse_all(&header.args.sources)?;
    let targets = normalize_targets(backend.as_ref(), Locator::parse_all(&header.args.targets)?).await;

    let mut driver = Driver {
        session: &mut session,
        transfer,
        shutdown,
        on_event: &mut on_event,
        summary: &mut summary,
    };
    let outcome = match header.command {
        CommandType::Cp => match classify(&sources, &targets) {
            Ok(topology) => {
                let plan = plan_copy(backend, topology, sources, targets, capacity);
                driver.consume(plan).await
            }
            Err(e) => Err(e),
        },
        CommandType::Sync => match <[Locator; 1]>::try_from(sources) {
            Ok([from]) => driver.consume(plan_sync(backend, from, targets, capacity)).await,
            Err(sources) => Err(Error::invalid_topology(
                "sync takes exactly one source",
                &sources,
                &targets,
            )),
        },
    };

    if let Err(e) = outcome {
        if let Err(save) = session.save() {
            tracing::warn!(id = %summary.session_id, "final checkpoint failed: {save}");
        }
        return Err(e);
    }

    if summary.is_success() {
        session.close()?;
        summary.closed = true;
    } else {
        session.save()?;
        tracing::warn!(
            id = %summary.session_id,
            failed = summary.failed.len(),
            "session kept for resume"
        );
    }
    Ok(summary)
}

/// Load a session and run it from its recorded working directory
pub async fn resume(
    ctx: &SessionContext,
    id: &str,
    backend: Arc<dyn ContentSource>,
    transfer: &dyn Transfer,
    capacity: usize,
    shutdown: impl Future<Output = ()>,
    on_event: impl FnMut(DriverEvent),
) -> Result<RunSummary> {
    let session = ctx.open(id)?;
    resume_session(session, backend, transfer, capacity, shutdown, on_event).await
}

/// Run an open session from its recorded working directory
///
/// The caller's working directory is back in place when this returns,
/// whatever the outcome.
pub async fn resume_session(
    session: Session,
    backend: Arc<dyn ContentSource>,
    transfer: &dyn Transfer,
    capacity: usize,
    shutdown: impl Future<Output = ()>,
    on_event: impl FnMut(DriverEvent),
) -> Result<RunSummary> {
    let _workdir = WorkdirGuard::enter(&session.header().root_path)?;
    run_session(session, backend, transfer, capacity, shutdown, on_event).await
}

struct Driver<'a, S> {
    session: &'a mut Session,
    transfer: &'a dyn Transfer,
    shutdown: Pin<&'a mut S>,
    on_event: &'a mut dyn FnMut(DriverEvent),
    summary: &'a mut RunSummary,
}

impl<S: Future<Output = ()>> Driver<'_, S> {
    async fn consume<P: PlannedTransfer>(&mut self, mut plan: PlanStream<P>) -> Result<()> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.as_mut() => return Err(self.interrupted()),
                next = plan.next() => next,
            };
            let Some(mut pair) = next else {
                return Ok(());
            };

            if let Some(err) = pair.take_error() {
                if err.is_structural() {
                    tracing::warn!(id = %self.summary.session_id, "plan ended: {err}");
                    return Err(err);
                }
                self.fail(pair.ledger_key(), err.to_string());
                continue;
            }

            let key = pair.ledger_key();
            if self.session.is_complete(&key) {
                tracing::debug!(key = %key, "already transferred");
                self.summary.skipped += 1;
                (self.on_event)(DriverEvent::Skipped { key });
                continue;
            }

            let outcome = tokio::select! {
                biased;
                _ = self.shutdown.as_mut() => return Err(self.interrupted()),
                outcome = transfer_pair(self.transfer, &pair) => outcome,
            };
            match outcome {
                Ok(bytes) => {
                    if let Err(e) = self.session.checkpoint(&key, bytes) {
                        tracing::warn!(key = %key, "{e}");
                    }
                    self.summary.transferred += 1;
                    self.summary.bytes += bytes;
                    (self.on_event)(DriverEvent::Transferred { key, bytes });
                }
                Err(message) => self.fail(key, message),
            }
        }
    }

    fn fail(&mut self, key: String, message: String) {
        tracing::warn!(key = %key, "transfer failed: {message}");
        (self.on_event)(DriverEvent::Failed {
            key: key.clone(),
            message: message.clone(),
        });
        self.summary.failed.push((key, message));
    }

    fn interrupted(&self) -> Error {
        tracing::debug!(id = %self.summary.session_id, "interrupted");
        Error::Interrupted(self.summary.session_id.clone())
    }
}

/// Transfer to every target slot; any failed slot fails the pair
async fn transfer_pair<P: PlannedTransfer>(
    transfer: &dyn Transfer,
    pair: &P,
) -> std::result::Result<u64, String> {
    let mut bytes = 0;
    let mut errors = Vec::new();
    for (target, error) in pair.targets() {
        if let Some(e) = error {
            errors.push(e.to_string());
            continue;
        }
        match transfer.transfer(pair.source(), target).await {
            Ok(n) => bytes += n,
            Err(e) => errors.push(format!("{}: {e}", target.url)),
        }
    }
    if errors.is_empty() {
        Ok(bytes)
    } else {
        Err(errors.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{cwd_lock, CommandArgs};
    use crate::testing::MemorySource;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn context() -> (SessionContext, TempDir) {
        let dir = TempDir::new().unwrap();
        (SessionContext::new(dir.path().join("session")), dir)
    }

    fn tree() -> Arc<dyn ContentSource> {
        Arc::new(
            MemorySource::new()
                .with_file("./src/a", 3)
                .with_file("./src/b/c", 4),
        )
    }

    fn cp_args() -> CommandArgs {
        CommandArgs::new(vec!["./src...".into()], vec!["./dst/".into()])
    }

    async fn run(session: Session, backend: Arc<dyn ContentSource>, transfer: &dyn Transfer) -> Result<RunSummary> {
        run_session(session, backend, transfer, 4, std::future::pending(), |_| {}).await
    }

    #[tokio::test]
    async fn test_fresh_run_transfers_and_closes() {
        let (ctx, _dir) = context();
        let session = ctx.create(CommandType::Cp, "", cp_args()).unwrap();

        let mut transfer = MockTransfer::new();
        transfer
            .expect_transfer()
            .times(2)
            .returning(|source, _| Ok(source.size));

        let summary = run(session, tree(), &transfer).await.unwrap();
        assert_eq!(summary.transferred, 2);
        assert_eq!(summary.bytes, 7);
        assert!(summary.closed);
        assert!(ctx.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_item_keeps_session() {
        let (ctx, _dir) = context();
        let session = ctx.create(CommandType::Cp, "", cp_args()).unwrap();
        let id = session.id().to_string();

        let mut transfer = MockTransfer::new();
        transfer.expect_transfer().returning(|source, _| {
            if source.url.ends_with("/c") {
                Err(Error::Network("connection reset".into()))
            } else {
                Ok(source.size)
            }
        });

        let summary = run(session, tree(), &transfer).await.unwrap();
        assert!(!summary.closed);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "./src/b/c -> ./dst/b/c");

        let record = ctx.load(&id).unwrap();
        assert!(record.is_complete("./src/a -> ./dst/a"));
        assert!(!record.is_complete("./src/b/c -> ./dst/b/c"));
    }

    #[tokio::test]
    async fn test_resume_only_retries_missing_pairs() {
        let (ctx, _dir) = context();
        let mut session = ctx.create(CommandType::Cp, "", cp_args()).unwrap();
        session.checkpoint("./src/a -> ./dst/a", 3).unwrap();

        let mut transfer = MockTransfer::new();
        transfer
            .expect_transfer()
            .withf(|source, target| source.url == "./src/b/c" && target.url == "./dst/b/c")
            .times(1)
            .returning(|source, _| Ok(source.size));

        let events = Mutex::new(Vec::new());
        let summary = run_session(session, tree(), &transfer, 4, std::future::pending(), |e| {
            events.lock().unwrap().push(e)
        })
        .await
        .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.transferred, 1);
        assert_eq!(
            events.into_inner().unwrap()[0],
            DriverEvent::Skipped {
                key: "./src/a -> ./dst/a".into()
            }
        );
    }

    #[tokio::test]
    async fn test_complete_ledger_transfers_nothing() {
        let (ctx, _dir) = context();
        let mut session = ctx.create(CommandType::Cp, "", cp_args()).unwrap();
        session.checkpoint("./src/a -> ./dst/a", 3).unwrap();
        session.checkpoint("./src/b/c -> ./dst/b/c", 4).unwrap();
        let id = session.id().to_string();
        drop(session);

        let mut transfer = MockTransfer::new();
        transfer.expect_transfer().times(0);

        let summary = resume(&ctx, &id, tree(), &transfer, 4, std::future::pending(), |_| {})
            .await
            .unwrap();
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.transferred, 0);
        assert!(summary.closed);
        assert!(matches!(ctx.load(&id), Err(Error::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_sync_ledger_key_covers_all_targets() {
        let (ctx, _dir) = context();
        let args = CommandArgs::new(vec!["./src...".into()], vec!["./t1/".into(), "./t2/".into()]);
        let session = ctx.create(CommandType::Sync, "", args).unwrap();
        let id = session.id().to_string();

        let mut transfer = MockTransfer::new();
        transfer.expect_transfer().returning(|source, target| {
            if target.url == "./t2/b/c" {
                Err(Error::General("disk full".into()))
            } else {
                Ok(source.size)
            }
        });

        let summary = run(session, tree(), &transfer).await.unwrap();
        assert_eq!(summary.transferred, 1);
        assert_eq!(summary.failed[0].0, "./src/b/c -> ./t1/b/c, ./t2/b/c");
        assert!(ctx.load(&id).unwrap().is_complete("./src/a -> ./t1/a, ./t2/a"));
    }

    #[tokio::test]
    async fn test_structural_error_is_returned_and_session_kept() {
        let (ctx, _dir) = context();
        let args = CommandArgs::new(vec!["./src...".into()], vec!["./out.txt".into()]);
        let session = ctx.create(CommandType::Cp, "", args).unwrap();
        let id = session.id().to_string();

        let transfer = MockTransfer::new();
        let err = run(session, tree(), &transfer).await.unwrap_err();
        assert!(matches!(err, Error::InvalidTopology { .. }));
        assert!(ctx.load(&id).is_ok());
    }

    #[tokio::test]
    async fn test_listing_failure_ends_run() {
        let (ctx, _dir) = context();
        let session = ctx.create(CommandType::Cp, "", cp_args()).unwrap();
        let id = session.id().to_string();
        let backend: Arc<dyn ContentSource> = Arc::new(
            MemorySource::new()
                .with_file("./src/a", 3)
                .with_file("./src/b/c", 4)
                .failing_after(1),
        );

        let mut transfer = MockTransfer::new();
        transfer.expect_transfer().times(1).returning(|s, _| Ok(s.size));

        let err = run(session, backend, &transfer).await.unwrap_err();
        assert!(matches!(err, Error::ListingEnumeration { .. }));
        assert!(ctx.load(&id).unwrap().is_complete("./src/a -> ./dst/a"));
    }

    struct Stall {
        started: Arc<Notify>,
    }

    #[async_trait]
    impl Transfer for Stall {
        async fn transfer(&self, _: &Content, _: &Content) -> Result<u64> {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_interrupt_does_not_mark_in_flight_pair() {
        let (ctx, _dir) = context();
        let session = ctx.create(CommandType::Cp, "", cp_args()).unwrap();
        let id = session.id().to_string();

        let started = Arc::new(Notify::new());
        let transfer = Stall {
            started: Arc::clone(&started),
        };
        let shutdown = async move { started.notified().await };

        let err = run_session(session, tree(), &transfer, 4, shutdown, |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Interrupted(ref i) if *i == id));
        assert_eq!(err.exit_code(), 130);

        let record = ctx.load(&id).unwrap();
        assert!(record.completed.is_empty());
    }

    #[tokio::test]
    async fn test_resume_restores_working_directory() {
        let _lock = cwd_lock();
        let before = std::env::current_dir().unwrap();
        let (ctx, dir) = context();
        let root = dir.path().join("root");
        std::fs::create_dir_all(&root).unwrap();

        let session = ctx.create(CommandType::Cp, &root, cp_args()).unwrap();
        let id = session.id().to_string();
        drop(session);

        let mut transfer = MockTransfer::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_in = Arc::clone(&seen);
        transfer.expect_transfer().returning(move |source, _| {
            *seen_in.lock().unwrap() = Some(std::env::current_dir().unwrap());
            Ok(source.size)
        });

        resume(&ctx, &id, tree(), &transfer, 4, std::future::pending(), |_| {})
            .await
            .unwrap();
        assert_eq!(
            seen.lock().unwrap().as_ref().unwrap().canonicalize().unwrap(),
            root.canonicalize().unwrap()
        );
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[tokio::test]
    async fn test_resume_restores_working_directory_on_failure() {
        let _lock = cwd_lock();
        let before = std::env::current_dir().unwrap();
        let (ctx, dir) = context();

        let args = CommandArgs::new(vec!["./src...".into()], vec!["./out.txt".into()]);
        let session = ctx.create(CommandType::Cp, dir.path(), args).unwrap();
        let id = session.id().to_string();
        drop(session);

        let transfer = MockTransfer::new();
        let result = resume(&ctx, &id, tree(), &transfer, 4, std::future::pending(), |_| {}).await;
        assert!(result.is_err());
        assert_eq!(std::env::current_dir().unwrap(), before);

        let missing = resume(&ctx, "feedface", tree(), &transfer, 4, std::future::pending(), |_| {}).await;
        assert!(matches!(missing, Err(Error::SessionNotFound(_))));
        assert_eq!(std::env::current_dir().unwrap(), before);
    }
}
