//! In-memory content source for tests

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use crate::content::Content;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::source::ContentSource;

/// Files keyed by URL; directories exist implicitly below them
#[derive(Default)]
pub(crate) struct MemorySource {
    files: BTreeMap<String, u64>,
    invalid_targets: BTreeSet<String>,
    fail_after: Option<usize>,
    diverging: bool,
    listings: AtomicUsize,
}

impl MemorySource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_file(mut self, url: &str, size: u64) -> Self {
        self.files.insert(url.to_string(), size);
        self
    }

    pub(crate) fn with_invalid_target(mut self, target: &str) -> Self {
        self.invalid_targets.insert(target.to_string());
        self
    }

    /// Listings fail after yielding `n` entries
    pub(crate) fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Every listing after the first comes back in reverse order
    pub(crate) fn diverging(mut self) -> Self {
        self.diverging = true;
        self
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn resolve(&self, locator: &Locator) -> Result<Content> {
        if let Some(size) = self.files.get(locator.base()) {
            return Ok(Content::file(locator.base(), *size));
        }
        let prefix = locator.dir_prefix();
        if self.files.keys().any(|url| url.starts_with(&prefix)) {
            return Ok(Content::directory(locator.base()));
        }
        Err(Error::resolution(locator.as_str(), "no such file"))
    }

    fn list_children(&self, locator: &Locator) -> BoxStream<'static, Result<Content>> {
        let prefix = locator.dir_prefix();
        let mut items: Vec<Result<Content>> = self
            .files
            .iter()
            .filter(|(url, _)| url.starts_with(&prefix))
            .map(|(url, size)| Ok(Content::file(url.clone(), *size)))
            .collect();

        let call = self.listings.fetch_add(1, Ordering::SeqCst);
        if self.diverging && call > 0 {
            items.reverse();
        }
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(Error::listing(locator.as_str(), "injected failure")));
        }
        stream::iter(items).boxed()
    }

    async fn validate_target(&self, locator: &Locator) -> Result<()> {
        if self.invalid_targets.contains(locator.as_str()) {
            return Err(Error::resolution(locator.as_str(), "target rejected"));
        }
        Ok(())
    }
}
