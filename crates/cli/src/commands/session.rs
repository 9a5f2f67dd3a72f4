//! Session administration: list, resume and clear
//!
//! A missing or corrupt session is fatal for `resume` and `clear <id>`;
//! `list` with no sessions prints nothing.

use clap::Subcommand;
use comfy_table::{presets, ContentArrangement, Table};
use serde::Serialize;

use resync_core::{Result, SessionRecord};

use super::{drive, Env};
use crate::backend::Backend;
use crate::exit_code::ExitCode;

/// Session subcommands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List saved sessions
    List,

    /// Resume a saved session from where it stopped
    Resume(ResumeArgs),

    /// Delete one saved session, or all of them
    Clear(ClearArgs),
}

#[derive(clap::Args, Debug)]
pub struct ResumeArgs {
    /// Session ID as shown by `resync session list`
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    /// Session ID, or `all`
    pub target: String,
}

/// One row of `session list`
#[derive(Debug, Serialize)]
struct SessionItem {
    id: String,
    command: String,
    created: String,
    root: String,
    sources: Vec<String>,
    targets: Vec<String>,
    objects: u64,
    bytes: u64,
}

impl From<&SessionRecord> for SessionItem {
    fn from(record: &SessionRecord) -> Self {
        let header = &record.header;
        Self {
            id: header.id.clone(),
            command: header.command.to_string(),
            created: header.created.strftime("%Y-%m-%d %H:%M:%S").to_string(),
            root: header.root_path.display().to_string(),
            sources: header.args.sources.clone(),
            targets: header.args.targets.clone(),
            objects: record.counters.objects,
            bytes: record.counters.bytes,
        }
    }
}

#[derive(Debug, Serialize)]
struct ClearOutput<'a> {
    closed: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failed: Vec<ClearFailure>,
}

#[derive(Debug, Serialize)]
struct ClearFailure {
    id: String,
    error: String,
}

/// Execute a session subcommand
pub async fn execute(cmd: SessionCommands, env: &Env) -> ExitCode {
    let result = match cmd {
        SessionCommands::List => list(env),
        SessionCommands::Resume(args) => resume(args, env).await,
        SessionCommands::Clear(args) => clear(args, env),
    };
    result.unwrap_or_else(|e| env.fail(&e))
}

fn list(env: &Env) -> Result<ExitCode> {
    let mut items = Vec::new();
    for id in env.sessions.list()? {
        match env.sessions.load(&id) {
            Ok(record) => items.push(SessionItem::from(&record)),
            Err(e) => env.formatter.warning(&e.to_string()),
        }
    }

    if items.is_empty() {
        return Ok(ExitCode::Success);
    }
    if env.formatter.is_json() {
        env.formatter.json(&items);
    } else {
        env.formatter.println(&render_table(&items));
    }
    Ok(ExitCode::Success)
}

fn render_table(items: &[SessionItem]) -> String {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Created", "Command", "Source", "Target", "Done", "Size"]);
    for item in items {
        table.add_row(vec![
            item.id.clone(),
            item.created.clone(),
            item.command.clone(),
            item.sources.join("\n"),
            item.targets.join("\n"),
            item.objects.to_string(),
            humansize::format_size(item.bytes, humansize::BINARY),
        ]);
    }
    table.to_string()
}

async fn resume(args: ResumeArgs, env: &Env) -> Result<ExitCode> {
    let session = env.sessions.open(&args.id)?;
    let backend = Backend::connect(&env.config, session.header().args.locators()).await?;
    tracing::debug!(id = %args.id, root = %session.header().root_path.display(), "resuming");
    Ok(drive(env, session, backend.source(), backend.transfer(), true).await)
}

fn clear(args: ClearArgs, env: &Env) -> Result<ExitCode> {
    let report = env.sessions.clear(&args.target)?;

    if env.formatter.is_json() {
        env.formatter.json(&ClearOutput {
            closed: &report.closed,
            failed: report
                .failed
                .iter()
                .map(|(id, e)| ClearFailure {
                    id: id.clone(),
                    error: e.to_string(),
                })
                .collect(),
        });
    } else {
        for (id, e) in &report.failed {
            env.formatter.error(&format!("Unable to clear session {id}: {e}"));
        }
        if !report.closed.is_empty() {
            env.formatter
                .success(&format!("Cleared {} session(s).", report.closed.len()));
        }
    }

    Ok(if report.is_clean() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use resync_core::{CommandArgs, CommandType, SessionHeader};

    fn record() -> SessionRecord {
        let header = SessionHeader {
            id: "0a1b2c3d".into(),
            version: resync_core::session::FORMAT_VERSION,
            command: CommandType::Sync,
            root_path: "/work".into(),
            args: CommandArgs::new(vec!["./photos...".into()], vec!["./a/".into(), "minio/backup/".into()]),
            created: jiff::Timestamp::from_second(1_700_000_000).unwrap(),
        };
        let mut record = SessionRecord::new(header);
        record.mark_complete("./photos/x.jpg -> ./a/x.jpg, minio/backup/x.jpg", 4096);
        record
    }

    #[test]
    fn test_session_item_json() {
        let item = SessionItem::from(&record());
        insta::assert_json_snapshot!(item, @r#"
        {
          "id": "0a1b2c3d",
          "command": "sync",
          "created": "2023-11-14 22:13:20",
          "root": "/work",
          "sources": [
            "./photos..."
          ],
          "targets": [
            "./a/",
            "minio/backup/"
          ],
          "objects": 1,
          "bytes": 4096
        }
        "#);
    }

    #[test]
    fn test_table_lists_each_session() {
        let rendered = render_table(&[SessionItem::from(&record())]);
        assert!(rendered.contains("0a1b2c3d"));
        assert!(rendered.contains("sync"));
        assert!(rendered.contains("4 KiB"));
    }
}
