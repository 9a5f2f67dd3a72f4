//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the ObjectStore trait from resync-core.

use async_trait::async_trait;
use aws_smithy_types::DateTime;

use resync_core::{Alias, Error, ListOptions, ListPage, ObjectInfo, ObjectStore, RemotePath, Result};

/// S3 client bound to one alias
#[derive(Clone)]
pub struct S3Client {
    inner: aws_sdk_s3::Client,
    alias: String,
}

impl S3Client {
    /// Create a new S3 client from an alias configuration
    pub async fn new(alias: &Alias) -> Result<Self> {
        alias.validate()?;

        let credentials = aws_credential_types::Credentials::new(
            alias.access_key.clone(),
            alias.secret_key.clone(),
            None,
            None,
            "resync-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(alias.region.clone()))
            .endpoint_url(&alias.endpoint)
            .load()
            .await;

        // Path-style addressing unless the alias asks for virtual hosts
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(alias.bucket_lookup != "dns")
            .build();

        tracing::debug!(alias = %alias.name, endpoint = %alias.endpoint, "S3 client ready");
        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
            alias: alias.name.clone(),
        })
    }

    /// Name of the alias this client serves
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

/// Convert an SDK timestamp, keeping sub-second precision
fn to_timestamp(value: &DateTime) -> Option<jiff::Timestamp> {
    jiff::Timestamp::new(value.secs(), value.subsec_nanos() as i32).ok()
}

/// Classify an SDK error by its rendered message
fn classify_error(message: String, missing: impl FnOnce() -> String) -> Error {
    if message.contains("NotFound") || message.contains("NoSuchKey") || message.contains("NoSuchBucket") {
        Error::NotFound(missing())
    } else if message.contains("AccessDenied")
        || message.contains("InvalidAccessKeyId")
        || message.contains("SignatureDoesNotMatch")
    {
        Error::Auth(message)
    } else {
        Error::Network(message)
    }
}

/// Negative or missing lengths count as empty
fn to_size(length: Option<i64>) -> u64 {
    length.and_then(|n| u64::try_from(n).ok()).unwrap_or(0)
}

fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_objects(&self, path: &RemotePath, options: ListOptions) -> Result<ListPage> {
        let mut request = self.inner.list_objects_v2().bucket(&path.bucket);

        let prefix = path.listing_prefix();
        if !prefix.is_empty() {
            request = request.prefix(prefix);
        }
        if !options.recursive {
            request = request.delimiter("/");
        }
        if let Some(max) = options.page_size {
            request = request.max_keys(max);
        }
        if let Some(token) = &options.continuation_token {
            request = request.continuation_token(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| classify_error(e.to_string(), || path.to_string()))?;

        let objects = response
            .contents()
            .iter()
            .map(|object| {
                ObjectInfo::new(object.key().unwrap_or_default(), to_size(object.size()))
                    .modified_at(object.last_modified().and_then(to_timestamp))
                    .with_etag(object.e_tag().map(trim_etag))
            })
            .collect();
        let prefixes = response
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix().map(str::to_string))
            .collect();

        let next_token = if response.is_truncated().unwrap_or(false) {
            response.next_continuation_token().map(str::to_string)
        } else {
            None
        };
        Ok(ListPage {
            objects,
            prefixes,
            next_token,
        })
    }

    async fn head_object(&self, path: &RemotePath) -> Result<ObjectInfo> {
        let response = self
            .inner
            .head_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| classify_error(e.to_string(), || path.to_string()))?;

        Ok(ObjectInfo::new(&path.key, to_size(response.content_length()))
            .modified_at(response.last_modified().and_then(to_timestamp))
            .with_etag(response.e_tag().map(trim_etag)))
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        match self.inner.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(e) => match classify_error(e.to_string(), || bucket.to_string()) {
                Error::NotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn get_object(&self, path: &RemotePath) -> Result<Vec<u8>> {
        let response = self
            .inner
            .get_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .send()
            .await
            .map_err(|e| classify_error(e.to_string(), || path.to_string()))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn put_object(
        &self,
        path: &RemotePath,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<ObjectInfo> {
        let size = data.len() as u64;
        let body = aws_sdk_s3::primitives::ByteStream::from(data);

        let response = self
            .inner
            .put_object()
            .bucket(&path.bucket)
            .key(&path.key)
            .set_content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| classify_error(e.to_string(), || path.to_string()))?;

        Ok(ObjectInfo::new(&path.key, size)
            .modified_at(Some(jiff::Timestamp::now()))
            .with_etag(response.e_tag().map(trim_etag)))
    }

    async fn copy_object(&self, src: &RemotePath, dst: &RemotePath) -> Result<ObjectInfo> {
        let copy_source = format!("{}/{}", src.bucket, src.key);

        let response = self
            .inner
            .copy_object()
            .copy_source(&copy_source)
            .bucket(&dst.bucket)
            .key(&dst.key)
            .send()
            .await
            .map_err(|e| classify_error(e.to_string(), || src.to_string()))?;

        // The copy response carries no size.
        let mut info = self.head_object(dst).await?;
        if let Some(etag) = response.copy_object_result().and_then(|r| r.e_tag()) {
            info.etag = Some(trim_etag(etag));
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_timestamp_keeps_nanos() {
        let value = DateTime::from_fractional_secs(1_700_000_000, 0.5);
        let ts = to_timestamp(&value).unwrap();
        assert_eq!(ts.as_second(), 1_700_000_000);
        assert_eq!(ts.subsec_millisecond(), 500);
    }

    #[test]
    fn test_classify_error() {
        let missing = || "minio/bucket/key".to_string();
        assert!(matches!(
            classify_error("service error: NoSuchKey".into(), missing),
            Error::NotFound(ref p) if p == "minio/bucket/key"
        ));
        assert!(matches!(
            classify_error("AccessDenied: nope".into(), missing),
            Error::Auth(_)
        ));
        assert!(matches!(
            classify_error("dispatch failure".into(), missing),
            Error::Network(_)
        ));
    }

    #[test]
    fn test_to_size() {
        assert_eq!(to_size(Some(42)), 42);
        assert_eq!(to_size(Some(-1)), 0);
        assert_eq!(to_size(None), 0);
    }

    #[test]
    fn test_trim_etag() {
        assert_eq!(trim_etag("\"abc\""), "abc");
    }
}
