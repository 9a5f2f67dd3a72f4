//! Path parsing
//!
//! Remote paths have the form `alias/bucket[/key]`; everything else is a local
//! filesystem path. Locators ([`crate::locator::Locator`]) are built on top of
//! this split.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// A parsed remote path pointing to an S3 location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    /// Alias name
    pub alias: String,
    /// Bucket name
    pub bucket: String,
    /// Object key (empty for bucket root)
    pub key: String,
    /// Whether the path ends with a slash or names a bucket
    pub is_dir: bool,
}

impl RemotePath {
    pub fn new(
        alias: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let is_dir = key.is_empty() || key.ends_with('/');
        Self {
            alias: alias.into(),
            bucket: bucket.into(),
            key,
            is_dir,
        }
    }

    /// Key prefix to list everything below this path
    ///
    /// Empty for the bucket root, otherwise the key with exactly one trailing slash.
    pub fn listing_prefix(&self) -> String {
        let key = self.key.trim_end_matches('/');
        if key.is_empty() {
            String::new()
        } else {
            format!("{key}/")
        }
    }

    /// Path of an object key inside the same bucket
    pub fn with_key(&self, key: impl Into<String>) -> Self {
        Self::new(self.alias.clone(), self.bucket.clone(), key)
    }
}

impl std::fmt::Display for RemotePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.key.is_empty() {
            write!(f, "{}/{}", self.alias, self.bucket)
        } else {
            write!(f, "{}/{}/{}", self.alias, self.bucket, self.key)
        }
    }
}

/// Parsed path that can be either local or remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPath {
    /// Local filesystem path
    Local(PathBuf),
    /// Remote S3 path
    Remote(RemotePath),
}

impl ParsedPath {
    pub fn is_remote(&self) -> bool {
        matches!(self, ParsedPath::Remote(_))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ParsedPath::Local(_))
    }

    pub fn as_remote(&self) -> Option<&RemotePath> {
        match self {
            ParsedPath::Remote(p) => Some(p),
            ParsedPath::Local(_) => None,
        }
    }

    pub fn as_local(&self) -> Option<&PathBuf> {
        match self {
            ParsedPath::Local(p) => Some(p),
            ParsedPath::Remote(_) => None,
        }
    }
}

/// Parse a path string into a [`ParsedPath`]
///
/// Local paths are absolute, start with `./` or `../`, are `.`/`..`, or are a
/// single component containing a dot (`notes.txt`). A first component that is
/// a valid alias name followed by a bucket makes a remote path.
pub fn parse_path(path: &str) -> Result<ParsedPath> {
    if path.is_empty() {
        return Err(Error::InvalidPath("Path cannot be empty".into()));
    }

    if path.starts_with('/')
        || path.starts_with("./")
        || path.starts_with("../")
        || path == "."
        || path == ".."
    {
        return Ok(ParsedPath::Local(PathBuf::from(path)));
    }

    #[cfg(windows)]
    if path.len() >= 2 && path.chars().nth(1) == Some(':') {
        return Ok(ParsedPath::Local(PathBuf::from(path)));
    }

    let mut parts = path.splitn(3, '/');
    let alias = parts.next().unwrap_or_default();
    let bucket = parts.next();
    let key = parts.next().unwrap_or_default();

    let Some(bucket) = bucket else {
        if alias.contains('.') || alias.contains('\\') {
            return Ok(ParsedPath::Local(PathBuf::from(path)));
        }
        return Err(Error::InvalidPath(format!(
            "Path '{path}' is incomplete. Use format: alias/bucket[/key] or ./local/path"
        )));
    };

    if !is_valid_alias_name(alias) {
        return Ok(ParsedPath::Local(PathBuf::from(path)));
    }

    if bucket.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Bucket name cannot be empty in '{path}'"
        )));
    }

    Ok(ParsedPath::Remote(RemotePath::new(alias, bucket, key)))
}

/// Alias names are ASCII alphanumerics, underscores and hyphens
pub fn is_valid_alias_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_object() {
        let path = parse_path("minio/bucket/dir/file.txt").unwrap();
        let remote = path.as_remote().unwrap();
        assert_eq!(remote.alias, "minio");
        assert_eq!(remote.bucket, "bucket");
        assert_eq!(remote.key, "dir/file.txt");
        assert!(!remote.is_dir);
    }

    #[test]
    fn test_parse_remote_prefix_and_bucket() {
        let prefix = parse_path("minio/bucket/dir/").unwrap();
        assert!(prefix.as_remote().unwrap().is_dir);

        let bucket = parse_path("minio/bucket").unwrap();
        let remote = bucket.as_remote().unwrap();
        assert_eq!(remote.key, "");
        assert!(remote.is_dir);
    }

    #[test]
    fn test_parse_local_paths() {
        for raw in ["/home/user/file.txt", "./file.txt", "../up", ".", "..", "notes.txt"] {
            assert!(parse_path(raw).unwrap().is_local(), "{raw} should be local");
        }
    }

    #[test]
    fn test_parse_rejects_empty_and_alias_only() {
        assert!(matches!(parse_path(""), Err(Error::InvalidPath(_))));
        assert!(matches!(parse_path("minio"), Err(Error::InvalidPath(_))));
        assert!(matches!(parse_path("minio/"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_listing_prefix() {
        assert_eq!(RemotePath::new("m", "b", "").listing_prefix(), "");
        assert_eq!(RemotePath::new("m", "b", "dir").listing_prefix(), "dir/");
        assert_eq!(RemotePath::new("m", "b", "dir/").listing_prefix(), "dir/");
    }

    #[test]
    fn test_remote_path_display() {
        assert_eq!(RemotePath::new("m", "b", "").to_string(), "m/b");
        assert_eq!(
            RemotePath::new("m", "b", "k/file.txt").with_key("other").to_string(),
            "m/b/other"
        );
    }
}
