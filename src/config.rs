//! Run configuration.
//!
//! Every value can come from a flag or from the environment. Environment names
//! follow the GitHub Actions input convention (`INPUT_<NAME>`) so the binary
//! can run unchanged as an action step.

use clap::{Parser, ValueEnum};

use crate::error::{SyncError, SyncResult};
use crate::fs::s3::DEFAULT_REGION;
use crate::sync::content_type::TypeStrategy;
use crate::sync::engine::{RunOptions, RunRequest};
use crate::sync::executor::Concurrency;
use crate::sync::mapper::{LocalScan, DEFAULT_PAGE_SIZE};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ContentTypeArg {
    #[default]
    Extension,
    Sniff,
    Layered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ScanArg {
    #[default]
    Walk,
    Glob,
}

/// Sync a local directory with an S3-compatible bucket.
#[derive(Debug, Clone, Parser)]
#[command(name = "bucketsync", version, about)]
pub struct Settings {
    /// Access key id
    #[arg(long, env = "INPUT_AWS_KEY_ID", hide_env_values = true, default_value = "")]
    pub aws_key_id: String,

    /// Secret access key
    #[arg(
        long,
        env = "INPUT_AWS_SECRET_ACCESS_KEY",
        hide_env_values = true,
        default_value = ""
    )]
    pub aws_secret_access_key: String,

    /// Bucket name
    #[arg(long, env = "INPUT_AWS_BUCKET", default_value = "")]
    pub aws_bucket: String,

    /// Local directory (upload) or key prefix (download)
    #[arg(long, env = "INPUT_SOURCE_DIR", default_value = "")]
    pub source_dir: String,

    /// Key prefix (upload) or local directory (download); "/" generates one
    #[arg(long, env = "INPUT_DESTINATION_DIR", default_value = "")]
    pub destination_dir: String,

    /// Endpoint of an S3-compatible store
    #[arg(long, env = "INPUT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Bucket region
    #[arg(long, env = "INPUT_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    /// "upload" or "download"
    #[arg(long, env = "INPUT_MODE", default_value = "")]
    pub mode: String,

    /// Glob patterns to skip on upload, comma separated
    #[arg(long, env = "INPUT_IGNORE", value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Maximum uploads in flight (0 = unbounded)
    #[arg(long, env = "INPUT_CONCURRENCY", default_value_t = 0)]
    pub concurrency: usize,

    /// Maximum downloads in flight per listing page (0 = unbounded)
    #[arg(long, env = "INPUT_DOWNLOAD_CONCURRENCY", default_value_t = 1)]
    pub download_concurrency: usize,

    /// Keys requested per listing page
    #[arg(long, env = "INPUT_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// How upload content types are inferred
    #[arg(long, env = "INPUT_CONTENT_TYPE", value_enum, default_value_t = ContentTypeArg::Extension)]
    pub content_type: ContentTypeArg,

    /// How the upload source tree is discovered
    #[arg(long, env = "INPUT_SCAN", value_enum, default_value_t = ScanArg::Walk)]
    pub scan: ScanArg,

    /// Fail when an upload finds no files
    #[arg(long, env = "INPUT_REQUIRE_FILES")]
    pub require_files: bool,

    /// Exit non-zero when any single transfer failed
    #[arg(long, env = "INPUT_FAIL_ON_ERROR")]
    pub fail_on_error: bool,

    /// Log output format
    #[arg(long, env = "INPUT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Full)]
    pub log_format: LogFormat,
}

impl Settings {
    /// Check that every required value is present.
    pub fn validate(&self) -> SyncResult<()> {
        let required: [(&'static str, &str); 4] = [
            ("aws_key_id", self.aws_key_id.as_str()),
            ("aws_secret_access_key", self.aws_secret_access_key.as_str()),
            ("aws_bucket", self.aws_bucket.as_str()),
            ("source_dir", self.source_dir.as_str()),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(SyncError::Config { field });
            }
        }
        if self.page_size == 0 {
            return Err(SyncError::Config { field: "page_size" });
        }
        Ok(())
    }

    /// Endpoint override, if one was given.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }

    pub fn run_request(&self) -> RunRequest {
        RunRequest {
            mode: self.mode.trim().to_string(),
            source_root: self.source_dir.clone(),
            destination_root: self.destination_dir.clone(),
            ignore_patterns: self
                .ignore
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            scan: match self.scan {
                ScanArg::Walk => LocalScan::Walk,
                ScanArg::Glob => LocalScan::Glob,
            },
            type_strategy: match self.content_type {
                ContentTypeArg::Extension => TypeStrategy::Extension,
                ContentTypeArg::Sniff => TypeStrategy::Sniff,
                ContentTypeArg::Layered => TypeStrategy::Layered,
            },
            upload_concurrency: Concurrency::limited(self.concurrency),
            download_concurrency: Concurrency::limited(self.download_concurrency),
            page_size: self.page_size,
            require_files: self.require_files,
        }
    }
}
