//! Error types for resync-core
//!
//! One error type covers planning, sessions and the storage collaborators.
//! Each variant maps to a CLI exit code, and [`Error::is_structural`] tells the
//! execution driver whether a failure ends the current plan or only one pair.

use thiserror::Error;

/// Result type alias for resync-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for resync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The source/target shape is not one of the supported topologies
    #[error("Invalid copy topology: {reason} (sources: [{}], targets: [{}])", .sources.join(", "), .targets.join(", "))]
    InvalidTopology {
        reason: String,
        sources: Vec<String>,
        targets: Vec<String>,
    },

    /// One source or target of a single pair could not be resolved
    #[error("Unable to resolve '{locator}': {reason}")]
    LocatorResolution { locator: String, reason: String },

    /// The listing collaborator failed mid-enumeration
    #[error("Listing '{locator}' failed: {reason}")]
    ListingEnumeration { locator: String, reason: String },

    /// No persisted record for this session ID
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The persisted record exists but cannot be used
    #[error("Session '{id}' is corrupt: {reason}")]
    SessionCorrupt { id: String, reason: String },

    /// Persisting the session record failed
    #[error("Unable to save session '{id}': {reason}")]
    CheckpointWrite { id: String, reason: String },

    /// The transfer was interrupted and the session checkpointed
    #[error("Session '{0}' interrupted")]
    Interrupted(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid path format
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Alias not found
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Build an [`Error::InvalidTopology`] naming the offending locators
    pub fn invalid_topology<S, T>(reason: impl Into<String>, sources: S, targets: T) -> Self
    where
        S: IntoIterator,
        S::Item: ToString,
        T: IntoIterator,
        T::Item: ToString,
    {
        Error::InvalidTopology {
            reason: reason.into(),
            sources: sources.into_iter().map(|s| s.to_string()).collect(),
            targets: targets.into_iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Build an [`Error::LocatorResolution`]
    pub fn resolution(locator: impl Into<String>, reason: impl ToString) -> Self {
        Error::LocatorResolution {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    /// Build an [`Error::ListingEnumeration`]
    pub fn listing(locator: impl Into<String>, reason: impl ToString) -> Self {
        Error::ListingEnumeration {
            locator: locator.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error ends the whole plan rather than a single pair
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::InvalidTopology { .. }
                | Error::ListingEnumeration { .. }
                | Error::SessionCorrupt { .. }
        )
    }

    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidPath(_) | Error::Config(_) | Error::InvalidTopology { .. } => 2,
            Error::Network(_) | Error::ListingEnumeration { .. } => 3,
            Error::Auth(_) => 4,
            Error::NotFound(_)
            | Error::AliasNotFound(_)
            | Error::SessionNotFound(_)
            | Error::LocatorResolution { .. } => 5,
            Error::SessionCorrupt { .. } => 6,
            Error::Interrupted(_) => 130,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(Error::InvalidPath("test".into()).exit_code(), 2);
        assert_eq!(
            Error::invalid_topology("bad", ["a"], ["b"]).exit_code(),
            2
        );
        assert_eq!(Error::Network("test".into()).exit_code(), 3);
        assert_eq!(Error::listing("a/", "boom").exit_code(), 3);
        assert_eq!(Error::Auth("test".into()).exit_code(), 4);
        assert_eq!(Error::SessionNotFound("abc".into()).exit_code(), 5);
        assert_eq!(Error::AliasNotFound("test".into()).exit_code(), 5);
        assert_eq!(
            Error::SessionCorrupt {
                id: "abc".into(),
                reason: "bad json".into()
            }
            .exit_code(),
            6
        );
        assert_eq!(Error::Interrupted("abc".into()).exit_code(), 130);
        assert_eq!(Error::General("test".into()).exit_code(), 1);
    }

    #[test]
    fn test_invalid_topology_names_locators() {
        let err = Error::invalid_topology("recursive source to a file", ["src..."], ["out.txt"]);
        assert_eq!(
            err.to_string(),
            "Invalid copy topology: recursive source to a file (sources: [src...], targets: [out.txt])"
        );
    }

    #[test]
    fn test_structural_errors() {
        assert!(Error::invalid_topology("x", ["a"], ["b"]).is_structural());
        assert!(Error::listing("a/", "x").is_structural());
        assert!(!Error::resolution("a", "gone").is_structural());
        assert!(!Error::Network("x".into()).is_structural());
    }
}
