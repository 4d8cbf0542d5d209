//! Command-line entry point for the angler automation client.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `angler-config.yaml` (or `$ANGLER_CONFIG`)
//! 3. Parse arguments, resolve the profile, run the environment checks, and
//!    freeze the configuration
//! 4. Run the automation loop under the quit listener
//! 5. Print the summary and export session data if requested
//!
//! Exit status is 0 when the session completes, is cancelled by the user, or
//! the user quits from the profile prompt, and 1 on any startup failure or
//! automation failure.

mod error;
mod player;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use angler_core::builder::ConfigBuilder;
use angler_core::cancel;
use angler_core::clock::SystemClock;
use angler_core::environment::{ConfiguredWindow, SmtpReachability};
use angler_core::orchestrator::{SessionOrchestrator, StartupError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;
use crate::player::DryRunPlayer;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "angler-config.yaml";

/// Environment variable that overrides the configuration file path.
const CONFIG_ENV: &str = "ANGLER_CONFIG";

/// How long shutdown waits for the stdin reader before giving up on it.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("angler starting");

    match run() {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "angler failed");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, AppError> {
    // 2. Load configuration.
    let builder = load_config()?;

    // 3. Prepare the session.
    let window = ConfiguredWindow;
    let smtp = SmtpReachability;
    let mut orchestrator = SessionOrchestrator::new(&window, &smtp);
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mut output = std::io::stdout();
    let prepared = {
        let mut input = std::io::stdin().lock();
        orchestrator.prepare(builder, &argv, &mut input, &mut output)
    };
    let config = match prepared {
        Ok(config) => config,
        Err(StartupError::Quit) => return Ok(ExitCode::SUCCESS),
        Err(StartupError::Arguments { source }) => {
            if let Err(e) = source.print() {
                warn!(error = %e, "Failed to print usage");
            }
            return Ok(if source.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            });
        }
        Err(e) => return Err(e.into()),
    };

    // 4. Run the automation loop.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| AppError::Runtime { source })?;
    let token = CancellationToken::new();
    let listener = cancel::wait_for_quit(
        tokio::io::BufReader::new(tokio::io::stdin()),
        config.key.quit.clone(),
        token.clone(),
    );
    let mut player = DryRunPlayer::default();
    let report = runtime.block_on(orchestrator.run(
        Arc::clone(&config),
        &mut player,
        SystemClock::new(),
        token,
        listener,
    ));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    // 5. Summarize.
    orchestrator.shutdown(&report, &config, &mut output)?;
    info!(
        reason = %report.reason,
        casts = player.casts(),
        "angler shutdown complete"
    );

    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Load the defaults and overlay the configuration file.
///
/// The file is `$ANGLER_CONFIG` when set, `angler-config.yaml` in the
/// working directory otherwise. A missing file leaves the defaults in place.
fn load_config() -> Result<ConfigBuilder, AppError> {
    let mut builder = ConfigBuilder::from_defaults()?;
    let path = std::env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    if path.exists() {
        builder.merge_file(&path)?;
        info!(path = %path.display(), "Configuration loaded");
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
    }
    Ok(builder)
}
