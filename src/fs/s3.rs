use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use opendal::{services::S3, Operator};
use tracing::debug;

use crate::fs::backend::{ByteStream, ListPage, ObjectStore, PutRequest};

/// Region used when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

/// S3 and S3-compatible object store using OpenDAL
pub struct S3Store {
    operator: Operator,
    bucket: String,
    /// URL prefix that object keys are appended to when reporting locations.
    location_base: String,
}

impl S3Store {
    /// Create a store for `bucket` with explicit credentials.
    ///
    /// `endpoint` overrides the AWS endpoint for S3-compatible providers
    /// (MinIO, R2, Spaces, ...). Without it the regional AWS endpoint is used.
    pub fn new(
        bucket: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        endpoint: Option<&str>,
    ) -> Result<Self> {
        let mut builder = S3::default()
            .bucket(bucket)
            .region(region)
            .access_key_id(access_key)
            .secret_access_key(secret_key);

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .context("Failed to build S3 operator")?
            .finish();

        Ok(Self::from_operator(
            operator,
            bucket,
            &location_base(bucket, region, endpoint),
        ))
    }

    /// Wrap an already configured operator.
    pub fn from_operator(operator: Operator, bucket: &str, location_base: &str) -> Self {
        Self {
            operator,
            bucket: bucket.to_string(),
            location_base: location_base.trim_end_matches('/').to_string(),
        }
    }

    /// Public URL of `key`.
    pub fn location(&self, key: &str) -> String {
        format!("{}/{}", self.location_base, key.trim_start_matches('/'))
    }
}

/// Compute the URL prefix objects in `bucket` are reachable under.
pub fn location_base(bucket: &str, region: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) => {
            let endpoint = endpoint.trim_end_matches('/');
            if endpoint.contains("://") {
                format!("{}/{}", endpoint, bucket)
            } else {
                format!("https://{}/{}", endpoint, bucket)
            }
        }
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

/// Split a raw key prefix into the directory OpenDAL lists and the prefix
/// every returned key must start with.
///
/// `reports/2024.csv` lists `reports/`, `dist` lists the bucket root so that
/// `dist-old/...` matches as well.
fn list_scope(prefix: &str) -> (&str, &str) {
    let prefix = prefix.trim_start_matches('/');
    let dir = match prefix.rfind('/') {
        Some(index) => &prefix[..=index],
        None => "",
    };
    (dir, prefix)
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, request: PutRequest) -> Result<String> {
        let PutRequest {
            key,
            content_type,
            access_policy,
            mut body,
        } = request;

        // OpenDAL has no canned-ACL write option; public access comes from the bucket policy.
        debug!(key = %key, acl = access_policy.as_str(), "requested access policy");

        let mut future = self.operator.writer_with(&key);
        if self
            .operator
            .info()
            .full_capability()
            .write_with_content_type
        {
            future = future.content_type(&content_type);
        }
        let mut writer = future
            .await
            .with_context(|| format!("Failed to open upload for {}", key))?;

        let written = async {
            while let Some(chunk) = body.try_next().await? {
                writer.write(chunk).await?;
            }
            writer.close().await?;
            anyhow::Ok(())
        }
        .await;

        if let Err(err) = written {
            let _ = writer.abort().await;
            return Err(err.context(format!("Failed to upload {}", key)));
        }

        Ok(self.location(&key))
    }

    async fn get(&self, key: &str) -> Result<ByteStream> {
        let reader = self
            .operator
            .reader(key)
            .await
            .with_context(|| format!("Failed to open {}", key))?;

        let stream = reader
            .into_bytes_stream(..)
            .await
            .with_context(|| format!("Failed to stream {}", key))?;

        Ok(stream.boxed())
    }

    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage> {
        let (dir, prefix) = list_scope(prefix);
        let page_size = page_size.max(1);
        let sorted = self
            .operator
            .info()
            .full_capability()
            .list_with_start_after;

        let mut lister = match continuation {
            Some(token) if sorted => {
                self.operator
                    .lister_with(dir)
                    .recursive(true)
                    .start_after(token)
                    .await
            }
            _ => self.operator.lister_with(dir).recursive(true).await,
        }
        .with_context(|| format!("Failed to list {}", self.display_path(prefix)))?;

        let mut keys = Vec::new();
        while let Some(entry) = lister
            .try_next()
            .await
            .with_context(|| format!("Failed to list {}", self.display_path(prefix)))?
        {
            // Directory markers are not objects
            if entry.metadata().mode().is_dir() {
                continue;
            }
            let key = entry.path();
            if !key.starts_with(prefix) || continuation.is_some_and(|token| key <= token) {
                continue;
            }
            keys.push(key.to_string());

            // S3 lists in key order, so a full page can stop early
            if sorted && keys.len() > page_size {
                break;
            }
        }

        // Page tokens are the last key, so the page must be in key order
        if !sorted {
            keys.sort();
        }

        let more = keys.len() > page_size;
        keys.truncate(page_size);
        let next_token = if more { keys.last().cloned() } else { None };
        Ok(ListPage { keys, next_token })
    }

    fn bucket(&self) -> &str {
        &self.bucket
    }
}
