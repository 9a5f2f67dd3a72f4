//! Source and target locators
//!
//! A locator is the user-supplied string naming what to copy from or to.
//! Everything the classifier needs is derived once at parse time:
//!
//! - `dir...` or `alias/bucket/prefix...`: recursive (the `...` marker)
//! - trailing `/`, a bare bucket, `.` or `..`: directory-like
//! - `*`, `?` or `[` in the path: glob

use crate::error::Result;
use crate::path::{parse_path, ParsedPath};

/// Suffix that marks a recursive locator
pub const RECURSIVE_MARKER: &str = "...";

/// A parsed, immutable locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    raw: String,
    base: String,
    parsed: ParsedPath,
    recursive: bool,
    directory: bool,
    glob: bool,
}

impl Locator {
    /// Parse a locator string
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (base, recursive) = match raw.strip_suffix(RECURSIVE_MARKER) {
            Some("") => (".", true),
            Some(base) => (base, true),
            None => (raw, false),
        };

        let parsed = parse_path(base)?;
        let directory = recursive
            || base.ends_with('/')
            || base.ends_with(std::path::MAIN_SEPARATOR)
            || base == "."
            || base == ".."
            || parsed.as_remote().is_some_and(|r| r.key.is_empty());
        let glob = glob::Pattern::escape(base) != base;

        Ok(Self {
            raw: raw.to_string(),
            base: base.to_string(),
            parsed,
            recursive,
            directory,
            glob,
        })
    }

    /// Parse a list of locator strings, failing on the first invalid one
    pub fn parse_all<S: AsRef<str>>(raws: &[S]) -> Result<Vec<Self>> {
        raws.iter().map(|r| Self::parse(r.as_ref())).collect()
    }

    /// The string as given by the user
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The path without the recursive marker
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn parsed(&self) -> &ParsedPath {
        &self.parsed
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn is_directory_like(&self) -> bool {
        self.directory
    }

    pub fn is_glob(&self) -> bool {
        self.glob
    }

    pub fn is_remote(&self) -> bool {
        self.parsed.is_remote()
    }

    /// Alias of a remote locator
    pub fn alias(&self) -> Option<&str> {
        self.parsed.as_remote().map(|r| r.alias.as_str())
    }

    /// Same locator, known to name an existing directory
    pub fn as_directory(&self) -> Self {
        Self {
            directory: true,
            ..self.clone()
        }
    }

    /// Last path component of the base
    pub fn basename(&self) -> Option<&str> {
        self.base
            .trim_end_matches(['/', std::path::MAIN_SEPARATOR])
            .rsplit(['/', std::path::MAIN_SEPARATOR])
            .next()
            .filter(|name| !name.is_empty() && *name != "." && *name != "..")
    }

    /// The base with exactly one trailing separator
    ///
    /// Every URL enumerated below a directory locator starts with this prefix.
    pub fn dir_prefix(&self) -> String {
        format!("{}/", self.base.trim_end_matches('/'))
    }

    /// URL of `relative` below this directory locator
    ///
    /// Built as a plain string: an entry named `x...` must not turn recursive.
    pub fn child_url(&self, relative: &str) -> String {
        format!("{}{}", self.dir_prefix(), relative.trim_start_matches('/'))
    }

    /// Path of `url` relative to this directory locator
    pub fn relative_path(&self, url: &str) -> Option<String> {
        url.strip_prefix(&self.dir_prefix())
            .filter(|rel| !rel.is_empty())
            .map(|rel| rel.replace('\\', "/"))
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file() {
        let loc = Locator::parse("./notes.txt").unwrap();
        assert!(!loc.is_recursive());
        assert!(!loc.is_directory_like());
        assert!(!loc.is_glob());
        assert_eq!(loc.basename(), Some("notes.txt"));
    }

    #[test]
    fn test_recursive_marker() {
        let loc = Locator::parse("./photos...").unwrap();
        assert!(loc.is_recursive());
        assert!(loc.is_directory_like());
        assert_eq!(loc.base(), "./photos");
        assert_eq!(loc.as_str(), "./photos...");

        let loc = Locator::parse("minio/bucket/photos/...").unwrap();
        assert!(loc.is_recursive());
        assert_eq!(loc.base(), "minio/bucket/photos/");

        let loc = Locator::parse("...").unwrap();
        assert!(loc.is_recursive());
        assert_eq!(loc.base(), ".");
    }

    #[test]
    fn test_directory_like() {
        assert!(Locator::parse("./out/").unwrap().is_directory_like());
        assert!(Locator::parse("minio/bucket").unwrap().is_directory_like());
        assert!(Locator::parse(".").unwrap().is_directory_like());
        assert!(!Locator::parse("minio/bucket/key").unwrap().is_directory_like());
        assert!(
            Locator::parse("minio/bucket/key")
                .unwrap()
                .as_directory()
                .is_directory_like()
        );
    }

    #[test]
    fn test_glob_detection() {
        assert!(Locator::parse("./logs/*.txt").unwrap().is_glob());
        assert!(Locator::parse("minio/bucket/file?").unwrap().is_glob());
        assert!(Locator::parse("./data[0]").unwrap().is_glob());
        assert!(!Locator::parse("./plain-name_1.txt").unwrap().is_glob());
    }

    #[test]
    fn test_child_url_and_relative() {
        let dir = Locator::parse("minio/bucket/photos...").unwrap();
        assert_eq!(dir.dir_prefix(), "minio/bucket/photos/");
        assert_eq!(
            dir.relative_path("minio/bucket/photos/2024/a.jpg").as_deref(),
            Some("2024/a.jpg")
        );
        assert_eq!(dir.relative_path("minio/bucket/other/a.jpg"), None);

        let target = Locator::parse("./backup/").unwrap();
        assert_eq!(target.child_url("2024/a.jpg"), "./backup/2024/a.jpg");
        assert_eq!(target.child_url("notes..."), "./backup/notes...");

        let bucket = Locator::parse("minio/bucket").unwrap();
        assert_eq!(bucket.child_url("/a"), "minio/bucket/a");
    }

    #[test]
    fn test_invalid_locator() {
        assert!(Locator::parse("").is_err());
        assert!(Locator::parse("minio").is_err());
    }
}
