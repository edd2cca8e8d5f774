//! Run orchestration.
//!
//! Picks the transfer direction, resolves the destination once, enumerates
//! the source and hands the items to the [`TransferExecutor`]. A run moves
//! strictly forward through [`RunState`] and happens once per instance.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::fs::{Mode, ObjectStore, TransferSpec};
use crate::sync::content_type::TypeStrategy;
use crate::sync::destination::resolve_destination;
use crate::sync::executor::{Concurrency, TransferExecutor, TransferOutcome};
use crate::sync::ignore::IgnorePatterns;
use crate::sync::mapper::{enumerate_local, enumerate_remote, LocalScan, DEFAULT_PAGE_SIZE};

/// Where a run currently is.
///
/// States only move forward. `ModeSelected` carries a parsed [`Mode`], so an
/// unrecognised mode string never enters it: that run goes from `Idle`
/// straight to `Failed` without enumerating or transferring anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    ModeSelected(Mode),
    Enumerating,
    Transferring,
    Reporting,
    Done,
    /// Terminal state after a fatal error, reachable from any earlier state.
    Failed,
}

impl RunState {
    fn rank(&self) -> u8 {
        match self {
            RunState::Idle => 0,
            RunState::ModeSelected(_) => 1,
            RunState::Enumerating => 2,
            RunState::Transferring => 3,
            RunState::Reporting => 4,
            RunState::Done | RunState::Failed => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }
}

/// Tuning knobs that do not change what is transferred.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub scan: LocalScan,
    pub type_strategy: TypeStrategy,
    pub upload_concurrency: Concurrency,
    pub download_concurrency: Concurrency,
    pub page_size: usize,
    /// Fail the run when an upload finds nothing to send.
    pub require_files: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            scan: LocalScan::Walk,
            type_strategy: TypeStrategy::Extension,
            upload_concurrency: Concurrency::unbounded(),
            download_concurrency: Concurrency::limited(1),
            page_size: DEFAULT_PAGE_SIZE,
            require_files: false,
        }
    }
}

/// Raw run parameters as configured, before the mode is validated.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub mode: String,
    pub source_root: String,
    pub destination_root: String,
    pub ignore_patterns: Vec<String>,
}

impl RunRequest {
    pub fn transfer_spec(&self, mode: Mode, bucket: &str) -> TransferSpec {
        TransferSpec {
            source_root: self.source_root.clone(),
            destination_root: self.destination_root.clone(),
            mode,
            ignore_patterns: self.ignore_patterns.clone(),
            bucket: bucket.to_string(),
        }
    }
}

/// Final report of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub mode: Mode,
    /// Resolved destination prefix (upload) or local directory (download).
    pub destination_root: String,
    /// One outcome per item, in enumeration order.
    pub outcomes: Vec<TransferOutcome>,
}

impl RunResult {
    /// Locations of successful uploads, in order.
    pub fn locations(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.location())
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Drives one upload or download run.
pub struct Orchestrator {
    store: Arc<dyn ObjectStore>,
    options: RunOptions,
    state: RunState,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ObjectStore>, options: RunOptions) -> Self {
        Self {
            store,
            options,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the run. Per-item failures live in the outcomes; only fatal
    /// errors (mode, enumeration, patterns) are returned as `Err`.
    pub async fn run(&mut self, request: &RunRequest) -> SyncResult<RunResult> {
        if self.state != RunState::Idle {
            warn!(state = ?self.state, "orchestrator already ran");
            return Err(SyncError::Config { field: "run" });
        }

        let result = self.drive(request).await;
        match &result {
            Ok(_) => self.transition(RunState::Done),
            Err(err) => {
                warn!(error = %err, "run failed");
                self.transition(RunState::Failed);
            }
        }
        result
    }

    async fn drive(&mut self, request: &RunRequest) -> SyncResult<RunResult> {
        let mode: Mode = request.mode.parse()?;
        self.transition(RunState::ModeSelected(mode));
        info!(mode = %mode, bucket = %self.store.bucket(), "starting run");

        let spec = request.transfer_spec(mode, self.store.bucket());
        let destination_root = resolve_destination(&spec.destination_root);
        if destination_root != spec.destination_root {
            info!(destination = %destination_root, "generated destination");
        }

        let executor = TransferExecutor::new(self.store.clone()).with_concurrency(
            self.options.upload_concurrency,
            self.options.download_concurrency,
        );

        let outcomes = match mode {
            Mode::Upload => self.upload(&executor, &spec, &destination_root).await?,
            Mode::Download => self.download(&executor, &spec, &destination_root).await?,
        };

        self.transition(RunState::Reporting);
        let result = RunResult {
            mode,
            destination_root,
            outcomes,
        };
        self.report(&result);

        Ok(result)
    }

    async fn upload(
        &mut self,
        executor: &TransferExecutor,
        spec: &TransferSpec,
        destination_root: &str,
    ) -> SyncResult<Vec<TransferOutcome>> {
        self.transition(RunState::Enumerating);
        let ignore = IgnorePatterns::from_patterns(&spec.ignore_patterns)?;
        let entries = enumerate_local(
            Path::new(&spec.source_root),
            &ignore,
            self.options.scan,
            self.options.require_files,
        )?;
        info!(
            source = %spec.source_root,
            files = entries.len(),
            ignored_patterns = ignore.patterns().len(),
            "enumerated local files"
        );

        self.transition(RunState::Transferring);
        let typer = self.options.type_strategy.typer();
        Ok(executor
            .run_upload(entries, destination_root, typer.as_ref())
            .await)
    }

    async fn download(
        &mut self,
        executor: &TransferExecutor,
        spec: &TransferSpec,
        destination_root: &str,
    ) -> SyncResult<Vec<TransferOutcome>> {
        if !spec.ignore_patterns.is_empty() {
            debug!("ignore patterns only apply to uploads");
        }

        self.transition(RunState::Enumerating);
        let store = self.store.clone();
        let mut listing = enumerate_remote(store.as_ref(), &spec.source_root, self.options.page_size);

        self.transition(RunState::Transferring);
        let local_root = PathBuf::from(destination_root);
        executor.run_download(&mut listing, &local_root).await
    }

    fn report(&self, result: &RunResult) {
        match result.mode {
            Mode::Upload => {
                info!(
                    object_key = %result.destination_root,
                    locations = ?result.locations(),
                    "upload finished"
                );
            }
            Mode::Download => {
                info!(destination = %result.destination_root, "download finished");
            }
        }

        info!(
            total = result.outcomes.len(),
            succeeded = result.succeeded(),
            failed = result.failed(),
            "run summary"
        );
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            next.rank() > self.state.rank(),
            "run state must move forward: {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }
}
