//! Content sources
//!
//! The collaborator the planners talk to for resolving locators and
//! enumerating directories. [`LocalFs`] covers the filesystem,
//! [`ObjectSource`] adapts any [`crate::ObjectStore`], and [`Router`] picks
//! between them per locator.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::content::Content;
use crate::error::Result;
use crate::locator::Locator;

mod local;
mod object;
mod router;

pub use local::LocalFs;
pub use object::{is_valid_bucket, ObjectSource};
pub use router::Router;

/// Resolution and listing of locators
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Describe the file, object, directory or prefix named by `locator`
    async fn resolve(&self, locator: &Locator) -> Result<Content>;

    /// Every leaf below a directory locator, in a stable order
    ///
    /// A failed enumeration yields one `ListingEnumeration` error; callers stop
    /// reading after it.
    fn list_children(&self, locator: &Locator) -> BoxStream<'static, Result<Content>>;

    /// Check that `locator` can be written to
    async fn validate_target(&self, locator: &Locator) -> Result<()>;
}
