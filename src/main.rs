use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};

use bucketsync::config::Settings;
use bucketsync::error::SyncError;
use bucketsync::fs::S3Store;
use bucketsync::report;
use bucketsync::sync::Orchestrator;
use bucketsync::telemetry;

/// Exit code when the run completed but some items failed (with `--fail-on-error`).
const EXIT_ITEM_FAILURES: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let settings = Settings::parse();

    if let Err(err) = telemetry::init_logging(settings.log_format) {
        eprintln!("Error: {:#}", err);
    }

    match run(&settings).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %format!("{:#}", err), "run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &Settings) -> Result<ExitCode> {
    settings.validate()?;

    let store = S3Store::new(
        &settings.aws_bucket,
        &settings.region,
        &settings.aws_key_id,
        &settings.aws_secret_access_key,
        settings.endpoint(),
    )
    .map_err(|source| SyncError::Storage {
        bucket: settings.aws_bucket.clone(),
        source,
    })?;

    let mut orchestrator = Orchestrator::new(Arc::new(store), settings.run_options());
    let result = orchestrator.run(&settings.run_request()).await?;

    println!("{}", report::to_json(&result)?);
    if let Some(path) = std::env::var_os("GITHUB_OUTPUT") {
        report::append_outputs(&result, &PathBuf::from(path))?;
    }

    if result.failed() > 0 {
        warn!(failed = result.failed(), "some transfers failed");
        if settings.fail_on_error {
            return Ok(ExitCode::from(EXIT_ITEM_FAILURES));
        }
    }

    Ok(ExitCode::SUCCESS)
}
