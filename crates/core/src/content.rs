//! Resolved descriptions of addressable units

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Whether a content is a leaf object or a container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    File,
    Directory,
}

/// Transfer status of a content
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Pending,
    Done,
}

/// One resolved file, object, directory or prefix
///
/// `Content::default()` is the zero value carried by the failed side of a pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Locator string of this content
    pub url: String,
    pub kind: ContentKind,
    /// Size in bytes, zero for directories and unresolved targets
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    pub status: TransferStatus,
}

impl Content {
    /// A file with a known size
    pub fn file(url: impl Into<String>, size: u64) -> Self {
        Self {
            url: url.into(),
            kind: ContentKind::File,
            size,
            last_modified: None,
            status: TransferStatus::Pending,
        }
    }

    /// A directory or prefix
    pub fn directory(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: ContentKind::Directory,
            ..Self::default()
        }
    }

    /// A transfer destination that has not been written yet
    pub fn target(url: impl Into<String>) -> Self {
        Self::file(url, 0)
    }

    pub fn modified_at(mut self, timestamp: Option<Timestamp>) -> Self {
        self.last_modified = timestamp;
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == ContentKind::Directory
    }

    /// Human-readable size
    pub fn size_human(&self) -> String {
        humansize::format_size(self.size, humansize::BINARY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_constructors() {
        let file = Content::file("./a.txt", 2048);
        assert!(!file.is_dir());
        assert_eq!(file.status, TransferStatus::Pending);
        assert_eq!(file.size_human(), "2 KiB");

        let dir = Content::directory("minio/bucket/dir/");
        assert!(dir.is_dir());
        assert_eq!(dir.size, 0);
    }

    #[test]
    fn test_zero_value() {
        let zero = Content::default();
        assert!(zero.url.is_empty());
        assert_eq!(zero.kind, ContentKind::File);
    }
}
