//! sync command - Copy one source to several target directories

use clap::Args;
use resync_core::{
    classify, normalize_targets, plan_sync, CommandArgs, CommandType, Locator, PlanEntry, Result,
};

use super::{drive, print_plan, Env};
use crate::backend::Backend;
use crate::exit_code::ExitCode;

/// Copy one source to one or more targets
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source locator; add a trailing `...` for a directory tree
    pub source: String,

    /// Target locators; with more than one, every target must be a directory
    #[arg(required = true, num_args = 1..)]
    pub targets: Vec<String>,

    /// Print the planned transfers without copying anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the sync command
pub async fn execute(args: SyncArgs, env: &Env) -> ExitCode {
    match run(args, env).await {
        Ok(code) => code,
        Err(e) => env.fail(&e),
    }
}

async fn run(args: SyncArgs, env: &Env) -> Result<ExitCode> {
    let locators = std::iter::once(args.source.as_str()).chain(args.targets.iter().map(String::as_str));
    let backend = Backend::connect(&env.config, locators).await?;
    let source = backend.source();

    let from = Locator::parse(&args.source)?;
    let targets = normalize_targets(source.as_ref(), Locator::parse_all(&args.targets)?).await;
    classify(std::slice::from_ref(&from), &targets)?;

    if args.dry_run {
        let pairs = plan_sync(source, from, targets, env.capacity()).collect_all().await;
        let entries: Vec<PlanEntry> = pairs.iter().map(PlanEntry::from).collect();
        return Ok(if print_plan(&env.formatter, &entries) {
            ExitCode::Success
        } else {
            ExitCode::GeneralError
        });
    }

    let session = env.sessions.create(
        CommandType::Sync,
        std::env::current_dir()?,
        CommandArgs::new(vec![args.source], args.targets),
    )?;
    Ok(drive(env, session, source, backend.transfer(), false).await)
}
