//! Copy and sync planning
//!
//! Planners turn classified locators into lazy sequences of [`CopyPair`]s or
//! [`SyncPair`]s. Each sequence is produced by its own task; see
//! [`PlanStream`].

mod copy;
mod pair;
mod stream;
mod sync;

pub use copy::plan_copy;
pub use pair::{CopyPair, PlanEntry, SyncPair, SyncTarget};
pub use stream::{PlanSender, PlanStream, DEFAULT_CAPACITY};
pub use sync::plan_sync;

use crate::locator::Locator;
use crate::source::ContentSource;

/// Promote targets that name existing directories to directory-like
///
/// `./backup` and `alias/bucket/prefix` only read as directories once the
/// source has confirmed it, so this runs before classification.
pub async fn normalize_targets(source: &dyn ContentSource, targets: Vec<Locator>) -> Vec<Locator> {
    let mut normalized = Vec::with_capacity(targets.len());
    for target in targets {
        if target.is_directory_like() || target.is_glob() {
            normalized.push(target);
            continue;
        }
        match source.resolve(&target).await {
            Ok(content) if content.is_dir() => normalized.push(target.as_directory()),
            _ => normalized.push(target),
        }
    }
    normalized
}
