//! CLI command definitions and execution

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use resync_core::{
    Config, ConfigManager, ContentSource, Error, PlanEntry, RunSummary, Session, SessionContext,
};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Progress};
use crate::transfer::StorageTransfer;

pub mod cp;
pub mod session;
pub mod sync;

/// resync - resumable copy and sync for files and S3-compatible storage
///
/// Every transfer runs inside a session that is checkpointed after each
/// object; an interrupted or partly failed transfer can be resumed later.
#[derive(Parser, Debug)]
#[command(name = "resync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress display
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy a file or a directory tree (SOURCE TARGET)
    Cp(cp::CpArgs),

    /// Copy one source to one or more target directories (SOURCE TARGET...)
    Sync(sync::SyncArgs),

    /// List, resume or clear saved sessions
    #[command(subcommand)]
    Session(session::SessionCommands),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let fallback = Formatter::new(OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    });
    let env = match Env::load(&cli) {
        Ok(env) => env,
        Err(e) => {
            fallback.error(&e.to_string());
            return ExitCode::from(&e);
        }
    };

    match cli.command {
        Commands::Cp(args) => cp::execute(args, &env).await,
        Commands::Sync(args) => sync::execute(args, &env).await,
        Commands::Session(cmd) => session::execute(cmd, &env).await,
    }
}

/// Configuration and session context shared by every command
pub struct Env {
    pub config: Config,
    pub sessions: SessionContext,
    pub formatter: Formatter,
}

impl Env {
    fn load(cli: &Cli) -> resync_core::Result<Self> {
        let manager = ConfigManager::new()?;
        let config = manager.load()?;
        let sessions = SessionContext::from_config(&manager, &config);
        let output = OutputConfig::from_flags(
            cli.json,
            cli.no_color,
            cli.no_progress,
            cli.quiet,
            &config.defaults,
        );
        Ok(Self {
            config,
            sessions,
            formatter: Formatter::new(output),
        })
    }

    pub fn capacity(&self) -> usize {
        self.config.session.queue_capacity
    }

    /// Report an error and map it to its exit code
    pub fn fail(&self, err: &Error) -> ExitCode {
        self.formatter.error(&err.to_string());
        ExitCode::from(err)
    }
}

#[derive(Debug, Serialize)]
struct RunOutput<'a> {
    session: &'a str,
    status: &'static str,
    transferred: u64,
    skipped: u64,
    bytes: u64,
    bytes_human: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<FailedItem<'a>>,
}

#[derive(Debug, Serialize)]
struct FailedItem<'a> {
    pair: &'a str,
    error: &'a str,
}

/// Future resolving on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("unable to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

/// Drive `session` and report the outcome
///
/// `resumed` selects whether the recorded working directory is entered
/// first.
pub(crate) async fn drive(
    env: &Env,
    session: Session,
    source: Arc<dyn ContentSource>,
    transfer: StorageTransfer,
    resumed: bool,
) -> ExitCode {
    let id = session.id().to_string();
    let mut progress = Progress::new(env.formatter.config(), &id);
    let on_event = |event: resync_core::DriverEvent| progress.on_event(&event);

    let result = if resumed {
        resync_core::resume_session(session, source, &transfer, env.capacity(), interrupted(), on_event).await
    } else {
        resync_core::run_session(session, source, &transfer, env.capacity(), interrupted(), on_event).await
    };
    progress.finish();

    match result {
        Ok(summary) => report(env, &summary),
        Err(e) => {
            let code = env.fail(&e);
            if !matches!(e, Error::SessionNotFound(_) | Error::SessionCorrupt { .. }) {
                resume_hint(env, &id);
            }
            code
        }
    }
}

fn report(env: &Env, summary: &RunSummary) -> ExitCode {
    let formatter = &env.formatter;
    let bytes_human = humansize::format_size(summary.bytes, humansize::BINARY);

    if formatter.is_json() {
        formatter.json(&RunOutput {
            session: &summary.session_id,
            status: if summary.closed { "complete" } else { "incomplete" },
            transferred: summary.transferred,
            skipped: summary.skipped,
            bytes: summary.bytes,
            bytes_human,
            failed: summary
                .failed
                .iter()
                .map(|(pair, error)| FailedItem { pair, error })
                .collect(),
        });
    } else {
        for (pair, error) in &summary.failed {
            formatter.error(&format!("{pair}: {error}"));
        }
        let skipped = if summary.skipped > 0 {
            format!(", {} already done", summary.skipped)
        } else {
            String::new()
        };
        let line = format!(
            "Transferred {} object(s), {bytes_human}{skipped}.",
            summary.transferred
        );
        if summary.is_success() {
            formatter.success(&line);
        } else {
            formatter.warning(&format!("{line} {} failed.", summary.failed.len()));
        }
    }

    if summary.is_success() {
        ExitCode::Success
    } else {
        resume_hint(env, &summary.session_id);
        ExitCode::GeneralError
    }
}

fn resume_hint(env: &Env, id: &str) {
    if env.formatter.is_json() {
        return;
    }
    eprintln!(
        "{}",
        env.formatter
            .dim(&format!("Session {id} was saved. Resume with: resync session resume {id}"))
    );
}

/// Print a dry-run plan; `true` when no entry carries an error
pub(crate) fn print_plan(formatter: &Formatter, entries: &[PlanEntry]) -> bool {
    if formatter.is_json() {
        formatter.json(&entries);
    } else {
        for entry in entries {
            match &entry.error {
                Some(error) => formatter.error(&format!("{}: {error}", entry.source)),
                None => formatter.println(&format!("{} -> {}", entry.source, entry.targets.join(", "))),
            }
        }
    }
    entries.iter().all(|e| e.error.is_none())
}
