use serde::Serialize;

use crate::content::Content;
use crate::error::Error;

/// One planned object-to-object transfer
#[derive(Debug, Default)]
pub struct CopyPair {
    pub source: Content,
    pub target: Content,
    /// Set when this pair could not be planned; the other side stays filled
    pub error: Option<Error>,
}

impl CopyPair {
    pub fn new(source: Content, target: Content) -> Self {
        Self {
            source,
            target,
            error: None,
        }
    }

    /// A pair whose failing side is left as the zero value
    pub fn failed(source: Content, target: Content, error: Error) -> Self {
        Self {
            source,
            target,
            error: Some(error),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.error.as_ref().is_some_and(Error::is_structural)
    }
}

/// One target slot of a [`SyncPair`]
#[derive(Debug, Default)]
pub struct SyncTarget {
    pub content: Content,
    /// Why this target cannot be written for this source
    pub error: Option<Error>,
}

/// One source planned against every requested target
#[derive(Debug, Default)]
pub struct SyncPair {
    pub source: Content,
    /// One slot per requested target, in request order
    pub targets: Vec<SyncTarget>,
    pub error: Option<Error>,
}

impl SyncPair {
    /// A pair that ends the sequence
    pub fn failed(error: Error) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.error.as_ref().is_some_and(Error::is_structural)
    }
}

impl From<CopyPair> for SyncTarget {
    fn from(pair: CopyPair) -> Self {
        Self {
            content: pair.target,
            error: pair.error,
        }
    }
}

/// Serializable view of a planned transfer, used for dry runs
#[derive(Debug, Serialize)]
pub struct PlanEntry {
    pub source: String,
    pub targets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&CopyPair> for PlanEntry {
    fn from(pair: &CopyPair) -> Self {
        Self {
            source: pair.source.url.clone(),
            targets: vec![pair.target.url.clone()],
            error: pair.error.as_ref().map(ToString::to_string),
        }
    }
}

impl From<&SyncPair> for PlanEntry {
    fn from(pair: &SyncPair) -> Self {
        let slot_errors = pair
            .targets
            .iter()
            .filter_map(|t| t.error.as_ref().map(ToString::to_string));
        let error = pair
            .error
            .as_ref()
            .map(ToString::to_string)
            .into_iter()
            .chain(slot_errors)
            .collect::<Vec<_>>();
        Self {
            source: pair.source.url.clone(),
            targets: pair.targets.iter().map(|t| t.content.url.clone()).collect(),
            error: (!error.is_empty()).then(|| error.join("; ")),
        }
    }
}
