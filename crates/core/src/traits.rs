//! Storage collaborator
//!
//! Only the bucket and object operations that planning and transfer need.
//! `resync-s3` implements [`ObjectStore`]; tests use the generated mock.

use async_trait::async_trait;
use jiff::Timestamp;
use serde::Serialize;

use crate::error::Result;
use crate::path::RemotePath;

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    /// Entity tag without the surrounding quotes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

impl ObjectInfo {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified: None,
            etag: None,
        }
    }

    pub fn modified_at(mut self, timestamp: Option<Timestamp>) -> Self {
        self.last_modified = timestamp;
        self
    }

    pub fn with_etag(mut self, etag: Option<String>) -> Self {
        self.etag = etag;
        self
    }
}

/// One page of a listing
///
/// `prefixes` is only filled by delimited (non-recursive) listings.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<ObjectInfo>,
    pub prefixes: Vec<String>,
    /// Token for the next page; `None` on the last one
    pub next_token: Option<String>,
}

impl ListPage {
    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub page_size: Option<i32>,
    pub continuation_token: Option<String>,
    /// Every key below the prefix instead of a single level
    pub recursive: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// One page of the objects below `path`
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListPage>;

    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>>;

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<ObjectInfo>;

    /// Server-side copy between two paths of the same endpoint
    async fn copy_object(&self, src: &RemotePath, dst: &RemotePath) -> Result<ObjectInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_info_builders() {
        let info = ObjectInfo::new("photos/a.jpg", 2048).with_etag(Some("abc".into()));
        assert_eq!(info.size, 2048);
        assert_eq!(info.etag.as_deref(), Some("abc"));
        assert!(info.last_modified.is_none());
    }

    #[test]
    fn test_last_page() {
        let page = ListPage {
            objects: vec![ObjectInfo::new("a", 1)],
            prefixes: Vec::new(),
            next_token: None,
        };
        assert!(page.is_last());
        assert!(!ListPage {
            next_token: Some("t".into()),
            ..page
        }
        .is_last());
    }
}
