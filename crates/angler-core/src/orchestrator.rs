//! Session lifecycle.
//!
//! [`SessionOrchestrator`] sequences a session through its phases:
//!
//! ```text
//! Init → ProfileResolved → Validated → Frozen → Running → Terminating → Done
//! ```
//!
//! [`prepare`](SessionOrchestrator::prepare) covers startup up to the frozen
//! configuration, [`run`](SessionOrchestrator::run) drives the automation
//! loop under the quit listener, and [`shutdown`](SessionOrchestrator::shutdown)
//! prints the summary and exports session data. Whether the loop was
//! cancelled, finished, or failed, `run` always yields a report.

use std::fmt;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use serde_yml::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::args::SessionArgs;
use crate::builder::ConfigBuilder;
use crate::clock::Clock;
use crate::config::{ConfigError, SessionConfig};
use crate::environment::{self, EnvironmentError, NotificationProbe, WindowProbe};
use crate::profile::{self, ProfileCatalog};
use crate::prompt::{ProfilePrompt, PromptState};
use crate::report::{ReportError, SessionReport};
use crate::session::{self, Player, SessionContext};
use crate::validation::{self, ValidationError};

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Nothing resolved yet.
    Init,
    /// A profile has been chosen and its keys checked.
    ProfileResolved,
    /// Every startup check has passed.
    Validated,
    /// The configuration is read-only.
    Frozen,
    /// The automation loop is running.
    Running,
    /// The loop has stopped; the summary is being produced.
    Terminating,
    /// The session is over.
    Done,
}

impl Phase {
    /// The phase that follows this one.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::ProfileResolved),
            Self::ProfileResolved => Some(Self::Validated),
            Self::Validated => Some(Self::Frozen),
            Self::Frozen => Some(Self::Running),
            Self::Running => Some(Self::Terminating),
            Self::Terminating => Some(Self::Done),
            Self::Done => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::ProfileResolved => "profile_resolved",
            Self::Validated => "validated",
            Self::Frozen => "frozen",
            Self::Running => "running",
            Self::Terminating => "terminating",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Errors that stop a session before it runs.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The configuration could not be assembled.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The launch arguments could not be parsed. Also carries `--help`.
    #[error("{source}")]
    Arguments {
        /// The underlying parser error.
        #[from]
        source: clap::Error,
    },

    /// `script.launch_options` has unbalanced quoting.
    #[error("launch options are not valid shell words: '{options}'")]
    LaunchOptions {
        /// The configured launch options.
        options: String,
    },

    /// Arguments or the selected profile failed validation.
    #[error("{} validation failure(s)", failures.len())]
    Validation {
        /// Every failure found.
        failures: Vec<ValidationError>,
    },

    /// The environment checks failed.
    #[error("{} environment check failure(s)", failures.len())]
    Environment {
        /// Every failure found.
        failures: Vec<EnvironmentError>,
    },

    /// The user quit from the profile prompt.
    #[error("quit from the profile prompt")]
    Quit,

    /// Terminal input or output failed.
    #[error("terminal I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

/// Drives one session from startup to shutdown.
pub struct SessionOrchestrator<'a> {
    phase: Phase,
    window: &'a dyn WindowProbe,
    notification: &'a dyn NotificationProbe,
}

impl fmt::Debug for SessionOrchestrator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl<'a> SessionOrchestrator<'a> {
    /// Create an orchestrator in the `Init` phase.
    pub fn new(window: &'a dyn WindowProbe, notification: &'a dyn NotificationProbe) -> Self {
        Self {
            phase: Phase::Init,
            window,
            notification,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    fn advance(&mut self, to: Phase) {
        if self.phase.next() != Some(to) {
            warn!(from = %self.phase, to = %to, "Unexpected phase transition");
        }
        info!(from = %self.phase, to = %to, "Session phase changed");
        self.phase = to;
    }

    /// Run startup: parse arguments, resolve and check the profile, run the
    /// environment checks, and freeze the configuration.
    ///
    /// `builder` must already hold the defaults and the configuration file.
    /// `argv` excludes the program name. The profile prompt, if needed, reads
    /// from `input`; the profile table, prompt replies, missing asset list,
    /// and the selected profile are written to `output`.
    pub fn prepare<R, W>(
        &mut self,
        mut builder: ConfigBuilder,
        argv: &[String],
        input: &mut R,
        output: &mut W,
    ) -> Result<Arc<SessionConfig>, StartupError>
    where
        R: BufRead,
        W: Write,
    {
        let base = builder.snapshot()?;

        // --- Arguments: launch options first, so process arguments win ---
        let options = &base.script.launch_options;
        let mut tokens = shlex::split(options).ok_or_else(|| StartupError::LaunchOptions {
            options: options.clone(),
        })?;
        tokens.extend(argv.iter().cloned());
        let args = SessionArgs::parse_tokens(tokens)?;

        let catalog = ProfileCatalog::new(&base.profile);
        validation::validate_args(&args, base.keepnet.capacity, &catalog).map_err(rejected)?;
        builder.merge_args(&args)?;

        // --- Profile: name, then id, then the prompt ---
        let name = if let Some(name) = &args.pname {
            name.clone()
        } else {
            let id = match args.pid.and_then(|pid| usize::try_from(pid).ok()) {
                Some(id) => id,
                None => {
                    let id = self.prompt_for_profile(&catalog, input, output)?;
                    builder.set("args.pid", Value::from(id))?;
                    id
                }
            };
            catalog
                .name_at(id)
                .map(str::to_owned)
                .ok_or_else(|| StartupError::Validation {
                    failures: vec![ValidationError::InvalidProfileId { raw: id.to_string() }],
                })?
        };
        let raw = catalog.get(&name).ok_or_else(|| StartupError::Validation {
            failures: vec![ValidationError::UnknownProfile { name: name.clone() }],
        })?;
        let profile = profile::validate_profile(&name, raw).map_err(|failure| {
            failure.log();
            StartupError::Validation {
                failures: vec![failure],
            }
        })?;
        info!(profile = %name, mode = %profile.mode(), "Profile resolved");
        self.advance(Phase::ProfileResolved);

        builder.select_profile(&name, &profile)?;
        builder.merge_overrides(&args.opts)?;

        // Overrides may rewrite `args` or the keepnet capacity behind clap's back.
        let checked = builder.snapshot()?;
        validation::validate_args(
            &checked.args,
            checked.keepnet.capacity,
            &ProfileCatalog::new(&checked.profile),
        )
        .map_err(rejected)?;

        // --- Environment ---
        let report = environment::run_checks(&checked, self.window, self.notification);
        for feature in &report.downgrades {
            builder.set(feature.config_path(), Value::Bool(false))?;
        }
        if !report.passed() {
            for failure in &report.failures {
                error!(error = %failure, "Environment check failed");
                if let EnvironmentError::MissingAssets { language, files } = failure {
                    writeln!(output, "Missing asset files")?;
                    for file in files {
                        let path = checked.script.asset_root.join(language).join(file);
                        writeln!(output, "  {}", path.display())?;
                    }
                }
            }
            return Err(StartupError::Environment {
                failures: report.failures,
            });
        }
        self.advance(Phase::Validated);

        // --- Freeze ---
        let config = builder.freeze()?;
        self.advance(Phase::Frozen);
        if let Some(selected) = &config.selected {
            let yaml = serde_yml::to_string(selected).map_err(ConfigError::from)?;
            writeln!(output, "{yaml}")?;
        }
        Ok(Arc::new(config))
    }

    fn prompt_for_profile<R, W>(
        &self,
        catalog: &ProfileCatalog<'_>,
        input: &mut R,
        output: &mut W,
    ) -> Result<usize, StartupError>
    where
        R: BufRead,
        W: Write,
    {
        let names = catalog.names();
        let state = ProfilePrompt::new(catalog.len()).run(
            &names,
            &SessionArgs::help_text(),
            input,
            output,
        )?;
        match state {
            PromptState::Resolved(id) => Ok(id),
            PromptState::Exited | PromptState::Prompting => {
                info!(phase = %self.phase, "Quit from the profile prompt");
                Err(StartupError::Quit)
            }
        }
    }

    /// Run the automation loop until it finishes, fails, or `cancel` fires.
    ///
    /// `listener` is spawned beside the loop and is expected to cancel
    /// `cancel` when the user asks to stop. It is stopped once the loop ends.
    pub async fn run<C, L>(
        &mut self,
        config: Arc<SessionConfig>,
        player: &mut dyn Player<C>,
        clock: C,
        cancel: CancellationToken,
        listener: L,
    ) -> SessionReport
    where
        C: Clock + Clone,
        L: Future<Output = ()> + Send + 'static,
    {
        self.advance(Phase::Running);
        let listener = tokio::spawn(listener);

        let mut ctx = SessionContext::new(config, clock);
        info!(started_at = %ctx.started_at(), "Session starting");
        let reason = session::drive(&mut ctx, player, &cancel).await;

        self.advance(Phase::Terminating);
        cancel.cancel();
        listener.abort();
        SessionReport::new(&ctx, &reason)
    }

    /// Print the summary and, when `args.plot` is set, export the session
    /// data to `script.logs_dir`.
    ///
    /// Returns the export path, if any.
    pub fn shutdown<W: Write>(
        &mut self,
        report: &SessionReport,
        config: &SessionConfig,
        output: &mut W,
    ) -> Result<Option<PathBuf>, ReportError> {
        log_session_end(report);
        writeln!(output, "{}", report.render()).map_err(|source| ReportError::Io {
            path: PathBuf::from("<output>"),
            source,
        })?;

        let exported = if config.args.plot {
            let path = report.export(&config.script.logs_dir)?;
            info!(path = %path.display(), "Session data exported");
            Some(path)
        } else {
            None
        };
        self.advance(Phase::Done);
        Ok(exported)
    }
}

fn rejected(failures: Vec<ValidationError>) -> StartupError {
    for failure in &failures {
        failure.log();
    }
    StartupError::Validation { failures }
}

/// Log the session end sequence.
pub fn log_session_end(report: &SessionReport) {
    info!(
        reason = %report.reason,
        started_at = %report.started_at,
        ended_at = %report.ended_at,
        running_time = %report.running_time,
        casts = report.casts,
        "Session ended"
    );
    if report.casts == 0 {
        warn!("Session ended with no casts recorded");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn phases_advance_in_order() {
        let mut phase = Phase::Init;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            assert!(next > phase);
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen.len(), 7);
        assert_eq!(phase, Phase::Done);
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::ProfileResolved.to_string(), "profile_resolved");
        assert_eq!(Phase::Done.to_string(), "done");
    }
}
