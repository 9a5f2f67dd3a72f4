//! cp command - Copy a file or a directory tree
//!
//! `resync cp ./photos... minio/backup/photos/` copies every file below
//! `./photos`; without the trailing `...` a single file is copied.

use clap::Args;
use resync_core::{
    classify, normalize_targets, plan_copy, CommandArgs, CommandType, Locator, PlanEntry, Result,
};

use super::{drive, print_plan, Env};
use crate::backend::Backend;
use crate::exit_code::ExitCode;

/// Copy a file or a directory tree
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source locator; a trailing `...` copies the tree below it
    ///
    /// Local paths start with `/`, `./` or `../`; remote ones are
    /// `alias/bucket[/key]`.
    pub source: String,

    /// Target locator; a trailing `/` marks a directory
    pub target: String,

    /// Print the planned transfers without copying anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, env: &Env) -> ExitCode {
    match run(args, env).await {
        Ok(code) => code,
        Err(e) => env.fail(&e),
    }
}

async fn run(args: CpArgs, env: &Env) -> Result<ExitCode> {
    let backend = Backend::connect(&env.config, [args.source.as_str(), args.target.as_str()]).await?;
    let source = backend.source();

    // Classify before a session exists so a bad invocation leaves nothing behind.
    let from = vec![Locator::parse(&args.source)?];
    let targets = normalize_targets(source.as_ref(), vec![Locator::parse(&args.target)?]).await;
    let topology = classify(&from, &targets)?;

    if args.dry_run {
        let pairs = plan_copy(source, topology, from, targets, env.capacity())
            .collect_all()
            .await;
        let entries: Vec<PlanEntry> = pairs.iter().map(PlanEntry::from).collect();
        return Ok(if print_plan(&env.formatter, &entries) {
            ExitCode::Success
        } else {
            ExitCode::GeneralError
        });
    }

    let session = env.sessions.create(
        CommandType::Cp,
        std::env::current_dir()?,
        CommandArgs::new(vec![args.source], vec![args.target]),
    )?;
    Ok(drive(env, session, source, backend.transfer(), false).await)
}
