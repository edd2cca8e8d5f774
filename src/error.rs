//! Run-level error taxonomy.
//!
//! Fatal errors abort a run before (or instead of) any transfer. Failures of a
//! single put/get never show up here: they are captured in that item's
//! [`TransferResult`](crate::sync::TransferResult) instead.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for fatal run errors.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A required configuration value is missing or unusable.
    #[error("missing or invalid configuration: {field}")]
    Config {
        /// Name of the offending setting.
        field: &'static str,
    },
    /// The local source root does not exist.
    #[error("source path not found: {}", path.display())]
    NotFound {
        /// Source root that was looked up.
        path: PathBuf,
    },
    /// The caller required at least one file but none matched.
    #[error("no files found under {}", path.display())]
    NoFiles {
        /// Source root that was scanned.
        path: PathBuf,
    },
    /// Walking the source tree or listing the bucket prefix failed.
    #[error("failed to enumerate {target}")]
    Enumeration {
        /// Directory or prefix being enumerated.
        target: String,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },
    /// The mode string is neither `upload` nor `download`.
    #[error("invalid mode {mode:?}: expected \"upload\" or \"download\"")]
    Mode {
        /// The value that was supplied.
        mode: String,
    },
    /// An ignore pattern does not compile.
    #[error("invalid ignore pattern {pattern:?}")]
    InvalidPattern {
        /// Pattern as supplied.
        pattern: String,
        /// Underlying globset error.
        #[source]
        source: globset::Error,
    },
    /// The storage client could not be constructed.
    #[error("failed to set up storage for bucket {bucket}")]
    Storage {
        /// Bucket the client was built for.
        bucket: String,
        /// Underlying failure.
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    /// Wrap a failure that happened while enumerating `target`.
    pub fn enumeration(target: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Enumeration {
            target: target.into(),
            source: source.into(),
        }
    }
}
