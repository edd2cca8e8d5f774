//! Concurrent execution of individual uploads and downloads.
//!
//! Every item gets exactly one attempt and exactly one [`TransferOutcome`].
//! A failing item is recorded and never cancels its siblings; outcomes come
//! back in the order the items were enumerated.

use anyhow::{Context, Result};
use bytes::Bytes;
use futures::future::join_all;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use std::future::Future;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::error::SyncResult;
use crate::fs::{AccessPolicy, ByteStream, FileEntry, ObjectEntry, ObjectStore, PutRequest};
use crate::sync::content_type::ContentTyper;
use crate::sync::mapper::{relative_key, to_key, to_local_path, RemoteListing};

/// Read size used when streaming local files into a put.
const READ_CHUNK: usize = 256 * 1024;

/// Upper bound on in-flight operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Concurrency(Option<NonZeroUsize>);

impl Concurrency {
    /// Launch everything at once.
    pub fn unbounded() -> Self {
        Self(None)
    }

    /// At most `limit` operations in flight; `0` means unbounded.
    pub fn limited(limit: usize) -> Self {
        Self(NonZeroUsize::new(limit))
    }

    pub fn limit(&self) -> Option<usize> {
        self.0.map(NonZeroUsize::get)
    }
}

/// The thing a transfer was attempted for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransferItem {
    File(FileEntry),
    Object(ObjectEntry),
}

impl TransferItem {
    /// Source path (upload) or key (download), for logs and reports.
    pub fn source(&self) -> String {
        match self {
            TransferItem::File(entry) => entry.absolute_path.display().to_string(),
            TransferItem::Object(entry) => entry.key.clone(),
        }
    }
}

/// Result of one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TransferResult {
    Uploaded { key: String, location: String },
    Downloaded { path: PathBuf, bytes: u64 },
    Failed { cause: String },
}

impl TransferResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, TransferResult::Failed { .. })
    }

    /// Location URL of an uploaded object.
    pub fn location(&self) -> Option<&str> {
        match self {
            TransferResult::Uploaded { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// One attempted transfer and how it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferOutcome {
    pub item: TransferItem,
    pub result: TransferResult,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// Runs puts and gets against an [`ObjectStore`].
pub struct TransferExecutor {
    store: Arc<dyn ObjectStore>,
    uploads: Concurrency,
    downloads: Concurrency,
}

impl TransferExecutor {
    /// Unbounded uploads, one download at a time.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            uploads: Concurrency::unbounded(),
            downloads: Concurrency::limited(1),
        }
    }

    pub fn with_concurrency(mut self, uploads: Concurrency, downloads: Concurrency) -> Self {
        self.uploads = uploads;
        self.downloads = downloads;
        self
    }

    // ========== Upload ==========

    /// Upload every entry below `destination_root` with a public-read policy.
    pub async fn run_upload(
        &self,
        entries: Vec<FileEntry>,
        destination_root: &str,
        typer: &dyn ContentTyper,
    ) -> Vec<TransferOutcome> {
        let tasks = entries
            .into_iter()
            .map(|entry| self.upload_one(entry, destination_root, typer));
        fan_out(tasks, self.uploads).await
    }

    async fn upload_one(
        &self,
        entry: FileEntry,
        destination_root: &str,
        typer: &dyn ContentTyper,
    ) -> TransferOutcome {
        let key = to_key(&entry.relative_path, destination_root);
        let content_type = typer.infer(&entry.absolute_path);

        let result = match self
            .put_file(&entry.absolute_path, key.clone(), content_type.clone())
            .await
        {
            Ok(location) => {
                info!(
                    file = %relative_key(&entry.relative_path),
                    key = %key,
                    content_type = %content_type,
                    location = %location,
                    "uploaded"
                );
                TransferResult::Uploaded { key, location }
            }
            Err(err) => {
                warn!(
                    file = %entry.absolute_path.display(),
                    key = %key,
                    error = %format!("{:#}", err),
                    "upload failed"
                );
                TransferResult::Failed {
                    cause: format!("{:#}", err),
                }
            }
        };

        TransferOutcome {
            item: TransferItem::File(entry),
            result,
        }
    }

    async fn put_file(&self, path: &Path, key: String, content_type: String) -> Result<String> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;

        self.store
            .put(PutRequest {
                key,
                content_type,
                access_policy: AccessPolicy::PublicRead,
                body: file_stream(file),
            })
            .await
    }

    // ========== Download ==========

    /// Download every object a listing yields into `local_root`.
    ///
    /// Pages are fetched one after another; the objects of a page fan out.
    /// A failing page fetch aborts the run.
    pub async fn run_download(
        &self,
        listing: &mut RemoteListing<'_>,
        local_root: &Path,
    ) -> SyncResult<Vec<TransferOutcome>> {
        let mut outcomes = Vec::new();
        while let Some(page) = listing.next_page().await? {
            outcomes.extend(self.download_entries(page, local_root).await);
        }
        Ok(outcomes)
    }

    /// Download an already enumerated set of objects into `local_root`.
    pub async fn download_entries(
        &self,
        entries: Vec<ObjectEntry>,
        local_root: &Path,
    ) -> Vec<TransferOutcome> {
        let tasks = entries
            .into_iter()
            .map(|entry| self.download_one(entry, local_root));
        fan_out(tasks, self.downloads).await
    }

    async fn download_one(&self, entry: ObjectEntry, local_root: &Path) -> TransferOutcome {
        let path = to_local_path(&entry.key, local_root);

        let result = match self.fetch_to(&entry.key, &path).await {
            Ok(bytes) => {
                info!(key = %entry.key, path = %path.display(), bytes, "downloaded");
                TransferResult::Downloaded { path, bytes }
            }
            Err(err) => {
                warn!(
                    key = %entry.key,
                    path = %path.display(),
                    error = %format!("{:#}", err),
                    "download failed"
                );
                TransferResult::Failed {
                    cause: format!("{:#}", err),
                }
            }
        };

        TransferOutcome {
            item: TransferItem::Object(entry),
            result,
        }
    }

    /// Stream one object to disk. Partial files are left in place on failure.
    async fn fetch_to(&self, key: &str, path: &Path) -> Result<u64> {
        if let Some(parent) = path.parent() {
            // Already existing directories are fine
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut stream = self.store.get(key).await?;
        let mut file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let mut written = 0u64;
        while let Some(chunk) = stream
            .try_next()
            .await
            .with_context(|| format!("Failed to read {}", self.store.display_path(key)))?
        {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(written)
    }
}

/// Run `tasks` with at most `concurrency` in flight, keeping input order.
async fn fan_out<F>(tasks: impl Iterator<Item = F>, concurrency: Concurrency) -> Vec<TransferOutcome>
where
    F: Future<Output = TransferOutcome>,
{
    match concurrency.limit() {
        Some(limit) => stream::iter(tasks).buffered(limit).collect().await,
        None => join_all(tasks).await,
    }
}

/// Chunked read stream over a local file.
fn file_stream(file: tokio::fs::File) -> ByteStream {
    stream::try_unfold(file, |mut file| async move {
        let mut buf = vec![0u8; READ_CHUNK];
        let read = file.read(&mut buf).await?;
        if read == 0 {
            return Ok(None);
        }
        buf.truncate(read);
        Ok::<_, std::io::Error>(Some((Bytes::from(buf), file)))
    })
    .boxed()
}
