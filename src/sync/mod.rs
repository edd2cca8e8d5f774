//! Transfer engine.
//!
//! Path discovery and key mapping, content type inference, destination
//! resolution, concurrent execution, and the run orchestrator tying them
//! together.

pub mod content_type;
pub mod destination;
pub mod engine;
pub mod executor;
pub mod ignore;
pub mod mapper;

pub use content_type::{ContentTyper, ExtensionTyper, LayeredTyper, SniffTyper, TypeStrategy};
pub use destination::{generate_id, resolve_destination, AUTO_DESTINATION};
pub use engine::{Orchestrator, RunOptions, RunRequest, RunResult, RunState};
pub use executor::{Concurrency, TransferExecutor, TransferItem, TransferOutcome, TransferResult};
pub use ignore::IgnorePatterns;
pub use mapper::{enumerate_local, enumerate_remote, to_key, to_local_path, LocalScan, RemoteListing};
