use std::sync::Arc;

use futures::StreamExt;

use super::pair::CopyPair;
use super::stream::{PlanSender, PlanStream};
use crate::content::Content;
use crate::error::Error;
use crate::locator::Locator;
use crate::source::ContentSource;
use crate::topology::Topology;

/// Plan the copy pairs of a classified request
///
/// Single-file topologies emit one pair per target. Recursive topologies emit
/// one pair per leaf below the source and per target, in listing order. A
/// pair that cannot be planned carries its error and the sequence goes on; a
/// listing failure is emitted as a terminal pair and ends it.
pub fn plan_copy(
    source: Arc<dyn ContentSource>,
    topology: Topology,
    sources: Vec<Locator>,
    targets: Vec<Locator>,
    capacity: usize,
) -> PlanStream<CopyPair> {
    PlanStream::spawn(capacity, move |tx| async move {
        let [from] = sources.as_slice() else {
            let err = Error::invalid_topology("a copy plan takes exactly one source", &sources, &targets);
            tx.send(CopyPair::failed(Content::default(), Content::default(), err))
                .await;
            return;
        };

        if topology.is_recursive() {
            plan_tree(source.as_ref(), from, &targets, &tx).await;
        } else {
            plan_single(source.as_ref(), topology, from, &targets, &tx).await;
        }
    })
}

/// Reason carried by a resolution failure, without the locator prefix
fn reason_of(err: Error) -> String {
    match err {
        Error::LocatorResolution { reason, .. } => reason,
        other => other.to_string(),
    }
}

async fn plan_single(
    source: &dyn ContentSource,
    topology: Topology,
    from: &Locator,
    targets: &[Locator],
    tx: &PlanSender<CopyPair>,
) {
    let resolved = match source.resolve(from).await {
        Ok(content) if content.is_dir() => {
            Err("is a directory, add '...' to copy it recursively".to_string())
        }
        Ok(content) => Ok(content),
        Err(e) => Err(reason_of(e)),
    };

    for target in targets {
        let pair = match &resolved {
            Err(reason) => {
                CopyPair::failed(Content::default(), Content::default(), Error::resolution(from.as_str(), reason))
            }
            Ok(content) => single_pair(source, topology, from, content, target).await,
        };
        if !tx.send(pair).await {
            return;
        }
    }
}

async fn single_pair(
    source: &dyn ContentSource,
    topology: Topology,
    from: &Locator,
    content: &Content,
    target: &Locator,
) -> CopyPair {
    let url = match topology {
        Topology::SingleFileToFile => target.base().to_string(),
        _ => match from.basename() {
            Some(name) => target.child_url(name),
            None => {
                let err = Error::resolution(from.as_str(), "cannot derive a file name");
                return CopyPair::failed(content.clone(), Content::default(), err);
            }
        },
    };

    match source.validate_target(target).await {
        Ok(()) => CopyPair::new(content.clone(), Content::target(url)),
        Err(e) => CopyPair::failed(content.clone(), Content::default(), e),
    }
}

async fn plan_tree(
    source: &dyn ContentSource,
    from: &Locator,
    targets: &[Locator],
    tx: &PlanSender<CopyPair>,
) {
    // Target roots are checked once, not per object.
    let mut roots = Vec::with_capacity(targets.len());
    for target in targets {
        roots.push(source.validate_target(target).await.map_err(reason_of));
    }

    let mut children = source.list_children(from);
    let mut planned = 0usize;
    while let Some(item) = children.next().await {
        let content = match item {
            Ok(content) if content.is_dir() => continue,
            Ok(content) => content,
            Err(e) => {
                let err = match e {
                    e @ Error::ListingEnumeration { .. } => e,
                    other => Error::listing(from.as_str(), other),
                };
                tracing::warn!(source = %from, planned, "listing failed: {err}");
                tx.send(CopyPair::failed(Content::default(), Content::default(), err))
                    .await;
                return;
            }
        };

        let relative = from.relative_path(&content.url);
        for (target, root) in targets.iter().zip(&roots) {
            let pair = match (&relative, root) {
                (None, _) => {
                    let err = Error::resolution(
                        content.url.clone(),
                        format!("not below {}", from.base()),
                    );
                    CopyPair::failed(content.clone(), Content::default(), err)
                }
                (Some(_), Err(reason)) => CopyPair::failed(
                    content.clone(),
                    Content::default(),
                    Error::resolution(target.as_str(), reason),
                ),
                (Some(rel), Ok(())) => {
                    CopyPair::new(content.clone(), Content::target(target.child_url(rel)))
                }
            };
            if !tx.send(pair).await {
                return;
            }
        }
        planned += 1;
    }

    tracing::debug!(source = %from, planned, targets = targets.len(), "enumeration finished");
}
