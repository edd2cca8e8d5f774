use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::SyncError;

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Upload,
    Download,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Upload => "upload",
            Mode::Download => "download",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(Mode::Upload),
            "download" => Ok(Mode::Download),
            other => Err(SyncError::Mode {
                mode: other.to_string(),
            }),
        }
    }
}

/// Everything one run needs to know about what to move where.
///
/// Built once, after the mode is known, and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TransferSpec {
    /// Local directory (upload) or bucket prefix (download).
    pub source_root: String,
    /// Bucket prefix (upload) or local directory (download), before resolution.
    pub destination_root: String,
    pub mode: Mode,
    /// Glob patterns relative to `source_root`; upload only.
    pub ignore_patterns: Vec<String>,
    pub bucket: String,
}

/// A local file discovered for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub absolute_path: PathBuf,
    /// Path relative to the source root, as found on disk.
    pub relative_path: PathBuf,
}

/// A remote object discovered for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectEntry {
    pub key: String,
}

impl ObjectEntry {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}
