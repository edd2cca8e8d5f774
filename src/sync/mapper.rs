//! Path discovery and key mapping.
//!
//! Local trees are enumerated eagerly (and sorted), remote prefixes lazily,
//! one listing page at a time. The key mapping functions are pure.

use anyhow::anyhow;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::fs::{FileEntry, ObjectEntry, ObjectStore};
use crate::sync::ignore::IgnorePatterns;

/// Default number of keys requested per listing page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// How the local source tree is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalScan {
    /// Recursive directory walk.
    #[default]
    Walk,
    /// Wildcard expansion of `<root>/**/*`.
    Glob,
}

/// Enumerate every file below `source_root` that no ignore pattern matches.
///
/// Entries are sorted by their `/`-joined relative path so the order is stable
/// across runs. An empty result is only an error when `require_files` is set.
pub fn enumerate_local(
    source_root: &Path,
    ignore: &IgnorePatterns,
    scan: LocalScan,
    require_files: bool,
) -> SyncResult<Vec<FileEntry>> {
    if !source_root.exists() {
        return Err(SyncError::NotFound {
            path: source_root.to_path_buf(),
        });
    }
    if !source_root.is_dir() {
        return Err(SyncError::enumeration(
            source_root.display().to_string(),
            anyhow!("not a directory"),
        ));
    }

    let files = match scan {
        LocalScan::Walk => walk_files(source_root)?,
        LocalScan::Glob => glob_files(source_root)?,
    };

    let mut entries: Vec<(String, FileEntry)> = Vec::with_capacity(files.len());
    for absolute_path in files {
        let Some(relative_path) = relative_to(&absolute_path, source_root) else {
            warn!(path = %absolute_path.display(), "skipping path outside source root");
            continue;
        };
        let key = relative_key(&relative_path);
        if key.is_empty() {
            continue;
        }
        if ignore.is_ignored(&key) {
            debug!(path = %key, "ignored");
            continue;
        }
        entries.push((
            key,
            FileEntry {
                absolute_path,
                relative_path,
            },
        ));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries.dedup_by(|a, b| a.0 == b.0);

    if require_files && entries.is_empty() {
        return Err(SyncError::NoFiles {
            path: source_root.to_path_buf(),
        });
    }

    Ok(entries.into_iter().map(|(_, entry)| entry).collect())
}

fn walk_files(root: &Path) -> SyncResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in jwalk::WalkDir::new(root).skip_hidden(false).sort(true) {
        let entry = entry.map_err(|e| SyncError::enumeration(root.display().to_string(), e))?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let path = entry.path();
        // Symlinks count when they resolve to a regular file
        if file_type.is_symlink() && !path.is_file() {
            continue;
        }
        files.push(path);
    }

    Ok(files)
}

fn glob_files(root: &Path) -> SyncResult<Vec<PathBuf>> {
    let base = root.to_string_lossy();
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(base.trim_end_matches(['/', '\\']))
    );

    let paths = glob::glob(&pattern)
        .map_err(|e| SyncError::enumeration(root.display().to_string(), e))?;

    let mut files = Vec::new();
    for path in paths {
        let path = path.map_err(|e| SyncError::enumeration(root.display().to_string(), e))?;
        if path.is_file() {
            files.push(path);
        }
    }

    Ok(files)
}

/// Strip `root` from `path`, ignoring `.` components on either side.
fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    if let Ok(relative) = path.strip_prefix(root) {
        return Some(relative.to_path_buf());
    }

    let clean = |p: &Path| -> PathBuf {
        p.components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect()
    };
    clean(path)
        .strip_prefix(clean(root))
        .ok()
        .map(Path::to_path_buf)
}

/// Render a relative path with `/` separators regardless of host OS.
///
/// Separators come from path components only; characters inside a file name,
/// including a literal `\` on Unix, are kept as they are.
pub fn relative_key(relative_path: &Path) -> String {
    relative_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Bucket key for an uploaded file: `destination_root/relative_path`.
pub fn to_key(relative_path: &Path, destination_root: &str) -> String {
    let relative = relative_key(relative_path);
    let root = destination_root.replace('\\', "/");
    let root = root.trim_end_matches('/');

    match (root.is_empty(), relative.is_empty()) {
        (true, _) => relative,
        (false, true) => root.to_string(),
        (false, false) => format!("{}/{}", root, relative),
    }
}

/// Local path for a downloaded object: the full key below `local_root`.
pub fn to_local_path(key: &str, local_root: &Path) -> PathBuf {
    key.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(local_root.to_path_buf(), |path, segment| path.join(segment))
}

/// Lazily paged listing of the objects under a prefix.
///
/// Pages are fetched on demand; [`RemoteListing::restart`] rewinds to the
/// first page.
pub struct RemoteListing<'a> {
    store: &'a dyn ObjectStore,
    prefix: String,
    page_size: usize,
    token: Option<String>,
    exhausted: bool,
    pages_fetched: usize,
}

/// Start a paged listing of `prefix`.
pub fn enumerate_remote<'a>(
    store: &'a dyn ObjectStore,
    prefix: &str,
    page_size: usize,
) -> RemoteListing<'a> {
    RemoteListing {
        store,
        prefix: prefix.trim_start_matches('/').to_string(),
        page_size: page_size.max(1),
        token: None,
        exhausted: false,
        pages_fetched: 0,
    }
}

impl<'a> RemoteListing<'a> {
    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> SyncResult<Option<Vec<ObjectEntry>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .store
            .list_page(&self.prefix, self.token.as_deref(), self.page_size)
            .await
            .map_err(|e| SyncError::enumeration(self.store.display_path(&self.prefix), e))?;
        self.pages_fetched += 1;

        if page.next_token.is_some() && page.next_token == self.token {
            return Err(SyncError::enumeration(
                self.store.display_path(&self.prefix),
                anyhow!(
                    "listing did not advance past {:?} on page {}",
                    page.next_token.unwrap_or_default(),
                    self.pages_fetched
                ),
            ));
        }
        self.exhausted = page.next_token.is_none();
        self.token = page.next_token;

        let mut entries = Vec::with_capacity(page.keys.len());
        for key in page.keys {
            if !key.starts_with(&self.prefix) {
                warn!(key = %key, prefix = %self.prefix, "listing returned key outside prefix");
                continue;
            }
            entries.push(ObjectEntry::new(key));
        }

        debug!(
            prefix = %self.prefix,
            page = self.pages_fetched,
            keys = entries.len(),
            "listed page"
        );
        Ok(Some(entries))
    }

    /// Rewind to the first page.
    pub fn restart(&mut self) {
        self.token = None;
        self.exhausted = false;
        self.pages_fetched = 0;
    }

    /// Drain every remaining page into one vector.
    pub async fn collect_all(&mut self) -> SyncResult<Vec<ObjectEntry>> {
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            all.extend(page);
        }
        Ok(all)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
