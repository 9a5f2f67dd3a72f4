//! Storage wiring for a command
//!
//! Connects one S3 client per alias named by the command's locators and
//! exposes them as a content source for planning and as a transfer for
//! execution.

use std::collections::HashMap;
use std::sync::Arc;

use resync_core::{Config, ContentSource, Locator, ObjectSource, ObjectStore, Result, Router};
use resync_s3::S3Client;

use crate::transfer::StorageTransfer;

/// Connected stores keyed by alias
pub struct Backend {
    stores: HashMap<String, Arc<dyn ObjectStore>>,
}

impl Backend {
    /// Connect every alias referenced by `locators`
    ///
    /// Local locators need no connection; an alias missing from the
    /// configuration is an error.
    pub async fn connect<'a>(config: &Config, locators: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let mut stores: HashMap<String, Arc<dyn ObjectStore>> = HashMap::new();
        for locator in locators {
            let locator = Locator::parse(locator)?;
            let Some(name) = locator.alias() else {
                continue;
            };
            if stores.contains_key(name) {
                continue;
            }
            let client = S3Client::new(config.alias(name)?).await?;
            stores.insert(name.to_string(), Arc::new(client));
        }
        Ok(Self { stores })
    }

    /// Resolution and listing across the filesystem and every connected alias
    pub fn source(&self) -> Arc<dyn ContentSource> {
        let router = self.stores.iter().fold(Router::new(), |router, (alias, store)| {
            router.with_remote(alias.clone(), Arc::new(ObjectSource::new(Arc::clone(store))))
        });
        Arc::new(router)
    }

    pub fn transfer(&self) -> StorageTransfer {
        StorageTransfer::new(self.stores.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_locators_need_no_alias() {
        let backend = Backend::connect(&Config::default(), ["./src...", "/tmp/out/"])
            .await
            .unwrap();
        assert!(backend.stores.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_alias_is_an_error() {
        let result = Backend::connect(&Config::default(), ["./a.txt", "nowhere/bucket/"]).await;
        assert!(matches!(result, Err(resync_core::Error::AliasNotFound(_))));
    }
}
