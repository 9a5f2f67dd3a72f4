use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::{ContentSource, LocalFs};
use crate::content::Content;
use crate::error::{Error, Result};
use crate::locator::Locator;

/// Dispatches local locators to [`LocalFs`] and remote ones by alias
#[derive(Clone, Default)]
pub struct Router {
    local: LocalFs,
    remotes: HashMap<String, Arc<dyn ContentSource>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the source serving `alias`
    pub fn with_remote(mut self, alias: impl Into<String>, source: Arc<dyn ContentSource>) -> Self {
        self.remotes.insert(alias.into(), source);
        self
    }

    fn pick(&self, locator: &Locator) -> Result<&dyn ContentSource> {
        match locator.alias() {
            None => Ok(&self.local),
            Some(alias) => self
                .remotes
                .get(alias)
                .map(|s| s.as_ref())
                .ok_or_else(|| Error::AliasNotFound(alias.to_string())),
        }
    }
}

#[async_trait]
impl ContentSource for Router {
    async fn resolve(&self, locator: &Locator) -> Result<Content> {
        self.pick(locator)
            .map_err(|e| Error::resolution(locator.as_str(), e))?
            .resolve(locator)
            .await
    }

    fn list_children(&self, locator: &Locator) -> BoxStream<'static, Result<Content>> {
        match self.pick(locator) {
            Ok(source) => source.list_children(locator),
            Err(e) => {
                let err = Error::listing(locator.as_str(), e);
                stream::once(async move { Err(err) }).boxed()
            }
        }
    }

    async fn validate_target(&self, locator: &Locator) -> Result<()> {
        self.pick(locator)
            .map_err(|e| Error::resolution(locator.as_str(), e))?
            .validate_target(locator)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MockContentSource;

    #[tokio::test]
    async fn test_routes_by_alias() {
        let mut remote = MockContentSource::new();
        remote
            .expect_resolve()
            .times(1)
            .returning(|loc| Ok(Content::file(loc.as_str(), 7)));
        let router = Router::new().with_remote("minio", Arc::new(remote));

        let content = router
            .resolve(&Locator::parse("minio/bucket/a").unwrap())
            .await
            .unwrap();
        assert_eq!(content.size, 7);
    }

    #[tokio::test]
    async fn test_unknown_alias() {
        let router = Router::new();
        let loc = Locator::parse("nowhere/bucket/a").unwrap();

        let err = router.resolve(&loc).await.unwrap_err();
        assert!(matches!(err, Error::LocatorResolution { .. }));

        let items: Vec<_> = router.list_children(&loc).collect().await;
        assert!(matches!(items[..], [Err(Error::ListingEnumeration { .. })]));
    }
}
