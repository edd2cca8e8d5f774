//! Ignore pattern matching for uploads.
//!
//! Patterns are globs matched against the path relative to the source root:
//! `*` stays within one path segment, `**` crosses segments.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{SyncError, SyncResult};

/// Compiled set of ignore patterns.
#[derive(Debug, Clone)]
pub struct IgnorePatterns {
    /// Compiled glob set for matching.
    glob_set: GlobSet,
    /// Raw pattern strings (for display).
    patterns: Vec<String>,
}

impl Default for IgnorePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnorePatterns {
    /// Create an empty pattern set that ignores nothing.
    pub fn new() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Compile a list of patterns. Blank entries are skipped.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> SyncResult<Self> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_list = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }

            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|source| SyncError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(glob);
            pattern_list.push(pattern.to_string());
        }

        let glob_set = builder.build().map_err(|source| SyncError::InvalidPattern {
            pattern: pattern_list.join(","),
            source,
        })?;

        Ok(Self {
            glob_set,
            patterns: pattern_list,
        })
    }

    /// Check if a relative path (with `/` separators) is ignored.
    pub fn is_ignored(&self, relative_path: &str) -> bool {
        !self.patterns.is_empty() && self.glob_set.is_match(relative_path)
    }

    /// Get the list of patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
