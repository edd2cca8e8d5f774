// Library module for bucketsync
// Re-exports modules for use in integration tests and the binary

pub mod config;
pub mod error;
pub mod fs;
pub mod report;
pub mod sync;
pub mod telemetry;

pub use error::{SyncError, SyncResult};
