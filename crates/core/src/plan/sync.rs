use std::sync::Arc;

use super::copy::plan_copy;
use super::pair::{CopyPair, SyncPair, SyncTarget};
use super::stream::{PlanSender, PlanStream};
use crate::content::Content;
use crate::error::Error;
use crate::locator::Locator;
use crate::source::ContentSource;
use crate::topology::{classify, Topology};

/// Plan one source against several targets
///
/// Each emitted [`SyncPair`] holds one slot per target, in target order. For
/// recursive sources every target gets its own copy plan over the same tree
/// and the plans are merged in lockstep; if they stop agreeing on the source
/// object at some position, a terminal `ListingEnumeration` pair ends the
/// sequence. A rejected shape yields one terminal `InvalidTopology` pair.
pub fn plan_sync(
    source: Arc<dyn ContentSource>,
    from: Locator,
    targets: Vec<Locator>,
    capacity: usize,
) -> PlanStream<SyncPair> {
    PlanStream::spawn(capacity, move |tx| async move {
        let sources = vec![from];
        let topology = match classify(&sources, &targets) {
            Ok(topology) => topology,
            Err(e) => {
                tx.send(SyncPair::failed(e)).await;
                return;
            }
        };

        match topology {
            Topology::SingleFileToFile | Topology::SingleFileToDir | Topology::SingleFileToMultiDir => {
                zip_single(source, topology, sources, &targets, &tx).await;
            }
            Topology::RecursiveDirToDir | Topology::RecursiveDirToMultiDir => {
                merge_trees(source, sources, &targets, capacity, &tx).await;
            }
        }
    })
}

async fn zip_single(
    source: Arc<dyn ContentSource>,
    topology: Topology,
    sources: Vec<Locator>,
    targets: &[Locator],
    tx: &PlanSender<SyncPair>,
) {
    let mut pair = SyncPair::default();
    for target in targets {
        let mut plan = plan_copy(
            Arc::clone(&source),
            topology.per_target(),
            sources.clone(),
            vec![target.clone()],
            1,
        );
        let copy = plan.next().await.unwrap_or_else(|| {
            let err = Error::resolution(target.as_str(), "nothing was planned");
            CopyPair::failed(Content::default(), Content::default(), err)
        });
        if pair.source.url.is_empty() {
            pair.source = copy.source.clone();
        }
        pair.targets.push(SyncTarget::from(copy));
    }
    tx.send(pair).await;
}

async fn merge_trees(
    source: Arc<dyn ContentSource>,
    sources: Vec<Locator>,
    targets: &[Locator],
    capacity: usize,
    tx: &PlanSender<SyncPair>,
) {
    let name = sources[0].as_str().to_string();
    let mut plans: Vec<PlanStream<CopyPair>> = targets
        .iter()
        .map(|target| {
            plan_copy(
                Arc::clone(&source),
                Topology::RecursiveDirToDir,
                sources.clone(),
                vec![target.clone()],
                capacity,
            )
        })
        .collect();

    let mut merged = 0usize;
    loop {
        let mut row = Vec::with_capacity(plans.len());
        for plan in &mut plans {
            row.push(plan.next().await);
        }
        if row.iter().all(Option::is_none) {
            break;
        }

        if let Some(pos) = row
            .iter()
            .position(|p| p.as_ref().is_some_and(CopyPair::is_terminal))
        {
            let err = row
                .swap_remove(pos)
                .and_then(|p| p.error)
                .unwrap_or_else(|| Error::listing(name.as_str(), "listing failed"));
            tx.send(SyncPair::failed(err)).await;
            return;
        }

        let Some(row) = row.into_iter().collect::<Option<Vec<CopyPair>>>() else {
            let err = Error::listing(
                name.as_str(),
                format!("per-target listings ended at different lengths after {merged} objects"),
            );
            tx.send(SyncPair::failed(err)).await;
            return;
        };

        if let Some(stray) = row.iter().find(|p| p.source.url != row[0].source.url) {
            let err = Error::listing(
                name.as_str(),
                format!(
                    "per-target listings diverged after {merged} objects: '{}' vs '{}'",
                    row[0].source.url, stray.source.url
                ),
            );
            tx.send(SyncPair::failed(err)).await;
            return;
        }

        let pair = SyncPair {
            source: row[0].source.clone(),
            targets: row.into_iter().map(SyncTarget::from).collect(),
            error: None,
        };
        if !tx.send(pair).await {
            return;
        }
        merged += 1;
    }

    tracing::debug!(source = %name, merged, targets = targets.len(), "sync plan finished");
}
