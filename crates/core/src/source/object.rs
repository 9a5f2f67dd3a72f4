use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::ContentSource;
use crate::content::Content;
use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::path::RemotePath;
use crate::traits::{ListOptions, ObjectInfo, ObjectStore};

/// Keys requested per listing page
const PAGE_SIZE: i32 = 1000;

/// Reports whether `bucket` is a bucket name this client accepts
///
/// 3 to 63 characters, starting with a letter, ending with a letter or digit,
/// letters, digits and `-` in between. Dotted names are not supported.
pub fn is_valid_bucket(bucket: &str) -> bool {
    let bytes = bucket.as_bytes();
    (3..=63).contains(&bytes.len())
        && bytes[0].is_ascii_alphabetic()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

/// Content source over an [`ObjectStore`] endpoint
#[derive(Clone)]
pub struct ObjectSource {
    store: Arc<dyn ObjectStore>,
}

impl ObjectSource {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

fn remote<'a>(locator: &'a Locator) -> Result<&'a RemotePath> {
    locator
        .parsed()
        .as_remote()
        .ok_or_else(|| Error::resolution(locator.as_str(), "not a remote path"))
}

fn to_content(root: &RemotePath, info: ObjectInfo) -> Content {
    let url = root.with_key(info.key).to_string();
    Content::file(url, info.size).modified_at(info.last_modified)
}

/// Lazily unrolled paginated listing
struct Pager {
    store: Arc<dyn ObjectStore>,
    root: RemotePath,
    name: String,
    token: Option<String>,
    pending: VecDeque<ObjectInfo>,
    exhausted: bool,
}

impl Pager {
    async fn next_item(mut self) -> Option<(Result<Content>, Option<Self>)> {
        loop {
            if let Some(info) = self.pending.pop_front() {
                // Folder markers ("photos/", "photos/sub/") hold no data.
                if info.key.ends_with('/') {
                    continue;
                }
                let content = to_content(&self.root, info);
                return Some((Ok(content), Some(self)));
            }
            if self.exhausted {
                return None;
            }

            let options = ListOptions {
                page_size: Some(PAGE_SIZE),
                continuation_token: self.token.take(),
                recursive: true,
            };
            match self.store.list_objects(&self.root, options).await {
                Ok(page) => {
                    tracing::debug!(
                        prefix = %self.root,
                        objects = page.objects.len(),
                        last = page.is_last(),
                        "listed page"
                    );
                    self.exhausted = page.is_last();
                    self.token = page.next_token;
                    self.pending.extend(page.objects);
                }
                Err(e) => return Some((Err(Error::listing(self.name, e)), None)),
            }
        }
    }
}

#[async_trait]
impl ContentSource for ObjectSource {
    async fn resolve(&self, locator: &Locator) -> Result<Content> {
        let path = remote(locator)?;
        if path.key.is_empty() {
            return match self.store.bucket_exists(&path.bucket).await {
                Ok(true) => Ok(Content::directory(locator.base())),
                Ok(false) => Err(Error::resolution(locator.as_str(), "bucket does not exist")),
                Err(e) => Err(Error::resolution(locator.as_str(), e)),
            };
        }

        if !path.is_dir {
            match self.store.head_object(path).await {
                Ok(info) => {
                    return Ok(Content::file(locator.base(), info.size)
                        .modified_at(info.last_modified));
                }
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(Error::resolution(locator.as_str(), e)),
            }
        }

        // No object under that exact key: it is a directory if anything lives below it.
        let prefix = path.with_key(path.listing_prefix());
        let options = ListOptions {
            page_size: Some(1),
            continuation_token: None,
            recursive: true,
        };
        match self.store.list_objects(&prefix, options).await {
            Ok(page) if !page.objects.is_empty() => Ok(Content::directory(locator.base())),
            Ok(_) => Err(Error::resolution(locator.as_str(), "no such object or prefix")),
            Err(e) => Err(Error::resolution(locator.as_str(), e)),
        }
    }

    fn list_children(&self, locator: &Locator) -> BoxStream<'static, Result<Content>> {
        let Some(path) = locator.parsed().as_remote() else {
            let err = Error::listing(locator.as_str(), "not a remote path");
            return stream::once(async move { Err(err) }).boxed();
        };

        let pager = Pager {
            store: Arc::clone(&self.store),
            root: path.with_key(path.listing_prefix()),
            name: locator.as_str().to_string(),
            token: None,
            pending: VecDeque::new(),
            exhausted: false,
        };

        stream::unfold(Some(pager), |state| async move { state?.next_item().await }).boxed()
    }

    async fn validate_target(&self, locator: &Locator) -> Result<()> {
        let path = remote(locator)?;
        if !is_valid_bucket(&path.bucket) {
            return Err(Error::resolution(
                locator.as_str(),
                format!("invalid bucket name '{}'", path.bucket),
            ));
        }
        match self.store.bucket_exists(&path.bucket).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::resolution(
                locator.as_str(),
                format!("bucket '{}' does not exist", path.bucket),
            )),
            Err(e) => Err(Error::resolution(locator.as_str(), e)),
        }
    }
}
