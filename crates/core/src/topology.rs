//! Copy topology classification
//!
//! Every copy or sync request reduces to one of five shapes:
//!
//! | topology                 | source          | targets                 |
//! |--------------------------|-----------------|-------------------------|
//! | `SingleFileToFile`       | one file        | one file                |
//! | `SingleFileToDir`        | one file        | one directory           |
//! | `SingleFileToMultiDir`   | one file        | several directories     |
//! | `RecursiveDirToDir`      | one `dir...`    | one directory           |
//! | `RecursiveDirToMultiDir` | one `dir...`    | several directories     |
//!
//! Anything else is rejected before a single byte moves.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::locator::Locator;

/// The classified shape of a copy or sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    SingleFileToFile,
    SingleFileToDir,
    SingleFileToMultiDir,
    RecursiveDirToDir,
    RecursiveDirToMultiDir,
}

impl Topology {
    pub const fn is_recursive(self) -> bool {
        matches!(self, Topology::RecursiveDirToDir | Topology::RecursiveDirToMultiDir)
    }

    /// The single-target topology each target of this one is planned with
    pub const fn per_target(self) -> Self {
        match self {
            Topology::SingleFileToMultiDir => Topology::SingleFileToDir,
            Topology::RecursiveDirToMultiDir => Topology::RecursiveDirToDir,
            other => other,
        }
    }
}

/// Classify a request
///
/// The shape is decided against the first target; every further target must
/// be a directory consistent with it.
pub fn classify(sources: &[Locator], targets: &[Locator]) -> Result<Topology> {
    let reject = |reason: &str| Error::invalid_topology(reason, sources, targets);

    let (source, first) = match (sources, targets) {
        ([], _) => return Err(reject("no source given")),
        (_, []) => return Err(reject("no target given")),
        ([source], [first, ..]) => (source, first),
        _ => return Err(reject("only one source can be copied at a time")),
    };

    if source.is_glob() {
        return Err(reject("wildcard sources are not supported"));
    }
    if targets.iter().any(Locator::is_glob) {
        return Err(reject("targets cannot contain wildcards"));
    }

    let multi = targets.len() > 1;
    if multi && targets.iter().any(|t| !t.is_directory_like()) {
        return Err(reject(if source.is_recursive() {
            "a recursive source cannot be copied to files"
        } else {
            "several targets must all be directories"
        }));
    }

    let topology = match (source.is_recursive(), first.is_directory_like(), multi) {
        (true, false, _) => return Err(reject("a recursive source cannot be copied to a file")),
        (true, true, false) => Topology::RecursiveDirToDir,
        (true, true, true) => Topology::RecursiveDirToMultiDir,
        (false, _, _) if source.is_directory_like() => {
            return Err(reject(
                "source is a directory, add '...' to copy it recursively",
            ));
        }
        (false, false, _) => Topology::SingleFileToFile,
        (false, true, false) => Topology::SingleFileToDir,
        (false, true, true) => Topology::SingleFileToMultiDir,
    };

    tracing::debug!(?topology, source = %source, targets = targets.len(), "classified");
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locs(raws: &[&str]) -> Vec<Locator> {
        Locator::parse_all(raws).unwrap()
    }

    fn shape(sources: &[&str], targets: &[&str]) -> Result<Topology> {
        classify(&locs(sources), &locs(targets))
    }

    #[test]
    fn test_single_file_to_file() {
        assert_eq!(
            shape(&["./a.txt"], &["minio/bucket/b.txt"]).unwrap(),
            Topology::SingleFileToFile
        );
        assert_eq!(
            shape(&["minio/bucket/a"], &["./b"]).unwrap(),
            Topology::SingleFileToFile
        );
    }

    #[test]
    fn test_single_file_to_dirs() {
        assert_eq!(
            shape(&["./a.txt"], &["minio/bucket"]).unwrap(),
            Topology::SingleFileToDir
        );
        assert_eq!(
            shape(&["./a.txt"], &["./d1/", "./d2/", "minio/bucket"]).unwrap(),
            Topology::SingleFileToMultiDir
        );
    }

    #[test]
    fn test_recursive() {
        assert_eq!(
            shape(&["./photos..."], &["minio/bucket/photos/"]).unwrap(),
            Topology::RecursiveDirToDir
        );
        assert_eq!(
            shape(&["./photos..."], &["./t1/", "./t2/"]).unwrap(),
            Topology::RecursiveDirToMultiDir
        );
    }

    #[test]
    fn test_recursive_to_file_is_always_rejected() {
        for targets in [
            vec!["./out.txt"],
            vec!["./out.txt", "./other.txt"],
            vec!["./dir/", "./file.txt"],
            vec!["./file.txt", "./dir/"],
        ] {
            let err = shape(&["./src..."], &targets).unwrap_err();
            assert!(matches!(err, Error::InvalidTopology { .. }), "{targets:?}");
        }
    }

    #[test]
    fn test_glob_rejections() {
        assert!(matches!(
            shape(&["./src..."], &["./out/*"]),
            Err(Error::InvalidTopology { .. })
        ));
        assert!(matches!(
            shape(&["./*.txt"], &["./out/"]),
            Err(Error::InvalidTopology { .. })
        ));
        assert!(matches!(
            shape(&["./*.txt"], &["./a.txt", "./b.txt"]),
            Err(Error::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_mixed_and_multi_file_targets() {
        assert!(matches!(
            shape(&["./a.txt"], &["./d1/", "./b.txt"]),
            Err(Error::InvalidTopology { .. })
        ));
        assert!(matches!(
            shape(&["./a.txt"], &["./b.txt", "./c.txt"]),
            Err(Error::InvalidTopology { .. })
        ));
    }

    #[test]
    fn test_plain_directory_source_needs_marker() {
        let err = shape(&["./photos/"], &["./backup/"]).unwrap_err();
        assert!(err.to_string().contains("'...'"));
    }

    #[test]
    fn test_source_and_target_counts() {
        assert!(shape(&[], &["./a"]).is_err());
        assert!(shape(&["./a.txt"], &[]).is_err());
        assert!(shape(&["./a.txt", "./b.txt"], &["./out/"]).is_err());
    }

    #[test]
    fn test_per_target() {
        assert_eq!(
            Topology::SingleFileToMultiDir.per_target(),
            Topology::SingleFileToDir
        );
        assert_eq!(
            Topology::RecursiveDirToMultiDir.per_target(),
            Topology::RecursiveDirToDir
        );
        assert_eq!(
            Topology::SingleFileToFile.per_target(),
            Topology::SingleFileToFile
        );
    }
}
