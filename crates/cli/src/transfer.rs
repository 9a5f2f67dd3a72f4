//! Byte movement for planned pairs
//!
//! Local files are read and written with tokio; remote objects go through
//! the alias's store, using a server-side copy when both ends share it.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use resync_core::{parse_path, Content, Error, ObjectStore, ParsedPath, RemotePath, Transfer};

/// [`Transfer`] over the local filesystem and connected aliases
#[derive(Clone)]
pub struct StorageTransfer {
    stores: HashMap<String, Arc<dyn ObjectStore>>,
}

impl StorageTransfer {
    pub fn new(stores: HashMap<String, Arc<dyn ObjectStore>>) -> Self {
        Self { stores }
    }

    fn store(&self, path: &RemotePath) -> anyhow::Result<&dyn ObjectStore> {
        self.stores
            .get(&path.alias)
            .map(|s| s.as_ref())
            .ok_or_else(|| anyhow!("alias '{}' is not connected", path.alias))
    }

    async fn copy(&self, source: &Content, target: &Content) -> anyhow::Result<u64> {
        let from = parse_path(&source.url).with_context(|| format!("invalid source '{}'", source.url))?;
        let to = parse_path(&target.url).with_context(|| format!("invalid target '{}'", target.url))?;

        match (from, to) {
            (ParsedPath::Local(src), ParsedPath::Local(dst)) => {
                prepare_parent(&dst).await?;
                tokio::fs::copy(&src, &dst)
                    .await
                    .with_context(|| format!("copying {} to {}", src.display(), dst.display()))
            }
            (ParsedPath::Local(src), ParsedPath::Remote(dst)) => {
                let data = tokio::fs::read(&src)
                    .await
                    .with_context(|| format!("reading {}", src.display()))?;
                let size = data.len() as u64;
                let content_type = mime_guess::from_path(&src)
                    .first()
                    .map(|m| m.essence_str().to_string());
                self.store(&dst)?
                    .put_object(&dst, data, content_type)
                    .await
                    .with_context(|| format!("uploading to {dst}"))?;
                Ok(size)
            }
            (ParsedPath::Remote(src), ParsedPath::Local(dst)) => {
                let data = self
                    .store(&src)?
                    .get_object(&src)
                    .await
                    .with_context(|| format!("downloading {src}"))?;
                prepare_parent(&dst).await?;
                tokio::fs::write(&dst, &data)
                    .await
                    .with_context(|| format!("writing {}", dst.display()))?;
                Ok(data.len() as u64)
            }
            (ParsedPath::Remote(src), ParsedPath::Remote(dst)) if src.alias == dst.alias => {
                let info = self
                    .store(&src)?
                    .copy_object(&src, &dst)
                    .await
                    .with_context(|| format!("copying {src} to {dst}"))?;
                Ok(info.size)
            }
            (ParsedPath::Remote(src), ParsedPath::Remote(dst)) => {
                let data = self
                    .store(&src)?
                    .get_object(&src)
                    .await
                    .with_context(|| format!("downloading {src}"))?;
                let size = data.len() as u64;
                self.store(&dst)?
                    .put_object(&dst, data, None)
                    .await
                    .with_context(|| format!("uploading to {dst}"))?;
                Ok(size)
            }
        }
    }
}

async fn prepare_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

#[async_trait]
impl Transfer for StorageTransfer {
    async fn transfer(&self, source: &Content, target: &Content) -> resync_core::Result<u64> {
        let bytes = self
            .copy(source, target)
            .await
            .map_err(|e| Error::General(format!("{e:#}")))?;
        tracing::debug!(source = %source.url, target = %target.url, bytes, "transferred");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_copy_creates_parents() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, b"hello").unwrap();
        let dst = dir.path().join("out/nested/a.txt");

        let transfer = StorageTransfer::new(HashMap::new());
        let bytes = transfer
            .transfer(
                &Content::file(src.to_string_lossy(), 5),
                &Content::target(dst.to_string_lossy()),
            )
            .await
            .unwrap();

        assert_eq!(bytes, 5);
        assert_eq!(std::fs::read(&dst).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_missing_source_names_the_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("gone.txt");

        let transfer = StorageTransfer::new(HashMap::new());
        let err = transfer
            .transfer(
                &Content::file(src.to_string_lossy(), 0),
                &Content::target(dir.path().join("x").to_string_lossy()),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("gone.txt"));
    }

    #[tokio::test]
    async fn test_unconnected_alias() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        std::fs::write(&src, b"x").unwrap();

        let transfer = StorageTransfer::new(HashMap::new());
        let err = transfer
            .transfer(
                &Content::file(src.to_string_lossy(), 1),
                &Content::target("minio/bucket/a.txt"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("alias 'minio' is not connected"));
    }
}
