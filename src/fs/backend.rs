use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde::Serialize;
use std::fmt;
use std::io;

/// Streamed object body, used in both directions.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Canned access policy requested for an uploaded object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AccessPolicy {
    #[default]
    Private,
    PublicRead,
}

impl AccessPolicy {
    /// Header value used by S3 (`x-amz-acl`).
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessPolicy::Private => "private",
            AccessPolicy::PublicRead => "public-read",
        }
    }
}

/// A single object upload.
pub struct PutRequest {
    pub key: String,
    pub content_type: String,
    pub access_policy: AccessPolicy,
    pub body: ByteStream,
}

impl fmt::Debug for PutRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PutRequest")
            .field("key", &self.key)
            .field("content_type", &self.content_type)
            .field("access_policy", &self.access_policy)
            .finish_non_exhaustive()
    }
}

/// One page of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Token for the next page; `None` once the listing is exhausted.
    pub next_token: Option<String>,
}

/// Object storage capability consumed by the transfer engine.
///
/// One store is bound to one bucket. Implementations share their connection
/// pool across concurrent calls; the engine never sizes it.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    // ========== Transfer ==========

    /// Upload an object and return its public location URL.
    async fn put(&self, request: PutRequest) -> Result<String>;

    /// Open a read stream for an object.
    async fn get(&self, key: &str) -> Result<ByteStream>;

    // ========== Listing ==========

    /// Fetch one page of keys under `prefix`, resuming after `continuation`.
    async fn list_page(
        &self,
        prefix: &str,
        continuation: Option<&str>,
        page_size: usize,
    ) -> Result<ListPage>;

    // ========== Info ==========

    /// Bucket this store writes to.
    fn bucket(&self) -> &str;

    /// Get display path for a key
    fn display_path(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket(), key)
    }
}
