use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use jiff::Timestamp;
use tokio::sync::mpsc;
use walkdir::WalkDir;

use super::ContentSource;
use crate::content::Content;
use crate::error::{Error, Result};
use crate::locator::Locator;

/// Local filesystem source
///
/// Enumeration walks depth-first with entries sorted by file name, so two walks
/// of an unchanged tree yield the same sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

fn modified(meta: &std::fs::Metadata) -> Option<Timestamp> {
    meta.modified().ok().and_then(|t| Timestamp::try_from(t).ok())
}

/// Entries buffered between the walk and the consumer
const WALK_BUFFER: usize = 64;

/// Send every file below `root` until the tree is exhausted or the receiver is gone
fn walk(root: &Path, prefix: &str, name: &str, tx: &mpsc::Sender<Result<Content>>) {
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let item = match entry {
            Ok(entry) if entry.file_type().is_dir() => continue,
            Ok(entry) => {
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                let url = format!("{prefix}{}", relative.to_string_lossy().replace('\\', "/"));
                entry
                    .metadata()
                    .map(|meta| Content::file(url, meta.len()).modified_at(modified(&meta)))
                    .map_err(|e| Error::listing(name, e))
            }
            Err(e) => Err(Error::listing(name, e)),
        };
        if tx.blocking_send(item).is_err() {
            return;
        }
    }
}

#[async_trait]
impl ContentSource for LocalFs {
    async fn resolve(&self, locator: &Locator) -> Result<Content> {
        let meta = tokio::fs::metadata(locator.base())
            .await
            .map_err(|e| Error::resolution(locator.as_str(), e))?;

        let content = if meta.is_dir() {
            Content::directory(locator.base())
        } else {
            Content::file(locator.base(), meta.len())
        };
        Ok(content.modified_at(modified(&meta)))
    }

    fn list_children(&self, locator: &Locator) -> BoxStream<'static, Result<Content>> {
        let root = PathBuf::from(locator.base());
        let prefix = locator.dir_prefix();
        let name = locator.as_str().to_string();

        // The walk runs on the blocking pool; the stream drains its channel.
        stream::once(async move {
            let (tx, rx) = mpsc::channel(WALK_BUFFER);
            tokio::task::spawn_blocking(move || walk(&root, &prefix, &name, &tx));
            stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
        })
        .flatten()
        .boxed()
    }

    async fn validate_target(&self, locator: &Locator) -> Result<()> {
        if !locator.is_directory_like() {
            return Ok(());
        }
        match tokio::fs::metadata(locator.base()).await {
            Ok(meta) if !meta.is_dir() => Err(Error::resolution(
                locator.as_str(),
                "target exists and is not a directory",
            )),
            _ => Ok(()),
        }
    }
}
