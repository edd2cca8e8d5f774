//! Run outputs for the invoking harness.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::fs::Mode;
use crate::sync::RunResult;

/// Write `name=value` output lines in the GitHub Actions format.
///
/// Only uploads produce outputs: `object_key` and `object_locations` (a JSON
/// array in enumeration order, successful items only).
pub fn write_outputs<W: Write>(result: &RunResult, mut out: W) -> Result<()> {
    if result.mode != Mode::Upload {
        return Ok(());
    }

    writeln!(out, "object_key={}", result.destination_root)?;
    writeln!(
        out,
        "object_locations={}",
        serde_json::to_string(&result.locations())?
    )?;
    Ok(())
}

/// Append outputs to the file named by `GITHUB_OUTPUT`.
pub fn append_outputs(result: &RunResult, path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open output file: {}", path.display()))?;
    write_outputs(result, file)
}

/// Full run report as pretty JSON.
pub fn to_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("Failed to serialize run report")
}
