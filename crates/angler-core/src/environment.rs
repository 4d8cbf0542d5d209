//! Startup environment checks.
//!
//! [`run_checks`] runs every check against a snapshot of the configuration
//! and reports all outcomes together: fatal failures, and features that must
//! be switched off before the configuration is frozen. The window geometry
//! and the notification server are reached through the [`WindowProbe`] and
//! [`NotificationProbe`] traits, so tests can substitute fakes.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use lettre::SmtpTransport;
use lettre::transport::smtp::Error as SmtpError;
use lettre::transport::smtp::authentication::Credentials;
use tracing::{debug, error, info, warn};

use crate::config::{NotificationConfig, SessionConfig};
use crate::profile::Mode;

/// Locale whose asset directory is complete by definition.
pub const REFERENCE_LANGUAGE: &str = "en";

/// Window sizes the recognition layer has assets for.
pub const SUPPORTED_WINDOW_SIZES: [(u32, u32); 3] = [(2560, 1440), (1920, 1080), (1600, 900)];

/// Features the environment checks may switch off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Feature {
    /// Automatic friction brake adjustment.
    FrictionBrake,
    /// Snag detection while retrieving.
    SnagDetection,
    /// Detection of a fully spooled line.
    SpoolingDetection,
    /// Electric reel mode.
    Electro,
}

impl Feature {
    /// Dotted configuration path of the flag that enables the feature.
    pub const fn config_path(self) -> &'static str {
        match self {
            Self::FrictionBrake => "args.friction_brake",
            Self::SnagDetection => "script.snag_detection",
            Self::SpoolingDetection => "script.spooling_detection",
            Self::Electro => "args.electro",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::FrictionBrake => "Auto friction brake",
            Self::SnagDetection => "Snag detection",
            Self::SpoolingDetection => "Spooling detection",
            Self::Electro => "Electric mode",
        };
        f.write_str(label)
    }
}

/// A fatal environment check failure.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// The notification server rejected the configured credentials.
    #[error("email address or app password not accepted by {server}")]
    CredentialsRejected {
        /// The server that was contacted.
        server: String,
    },

    /// The notification server could not be resolved or reached in time.
    #[error("invalid SMTP server {server} or connection timed out: {reason}")]
    NotificationUnreachable {
        /// The server that was contacted.
        server: String,
        /// What went wrong.
        reason: String,
    },

    /// The selected locale has no asset directory.
    #[error("invalid language: '{language}'")]
    UnknownLanguage {
        /// The configured locale.
        language: String,
    },

    /// An asset directory could not be listed.
    #[error("failed to list assets in {}: {source}", path.display())]
    Io {
        /// The directory being listed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Asset files present for the reference locale are missing for the
    /// selected one.
    #[error("{} asset file(s) missing for language '{language}'", files.len())]
    MissingAssets {
        /// The configured locale.
        language: String,
        /// Missing file names, sorted.
        files: Vec<String>,
    },

    /// The window size is unsupported and the mode cannot run without it.
    #[error("fishing mode '{mode}' doesn't support window size '{width}x{height}'")]
    UnsupportedWindow {
        /// The selected mode.
        mode: Mode,
        /// Reported width in pixels.
        width: u32,
        /// Reported height in pixels.
        height: u32,
    },
}

/// Window geometry as reported by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowInfo {
    /// Client area width in pixels.
    pub width: u32,
    /// Client area height in pixels.
    pub height: u32,
    /// Whether the window has a title bar.
    pub title_bar: bool,
}

impl WindowInfo {
    /// Whether the size is one of [`SUPPORTED_WINDOW_SIZES`].
    pub fn is_supported(&self) -> bool {
        SUPPORTED_WINDOW_SIZES.contains(&(self.width, self.height))
    }
}

/// Source of the game window's geometry.
pub trait WindowProbe {
    /// Report the current window geometry.
    fn detect(&self, config: &SessionConfig) -> WindowInfo;
}

/// Window probe that reports the geometry written in `config.window`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredWindow;

impl WindowProbe for ConfiguredWindow {
    fn detect(&self, config: &SessionConfig) -> WindowInfo {
        WindowInfo {
            width: config.window.width,
            height: config.window.height,
            title_bar: config.window.title_bar,
        }
    }
}

/// Why a notification probe failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The server refused the credentials.
    #[error("credentials rejected")]
    CredentialsRejected,
    /// Name resolution failed, the connection failed, or it timed out.
    #[error("{reason}")]
    Unreachable {
        /// What went wrong.
        reason: String,
    },
}

/// Startup check of the notification channel.
pub trait NotificationProbe {
    /// Verify the channel described by `config`.
    fn verify(&self, config: &NotificationConfig) -> Result<(), ProbeError>;
}

/// Notification check that logs in to the SMTP server over implicit TLS
/// with the configured credentials.
///
/// The whole exchange, name resolution included, runs on a helper thread and
/// is abandoned once the configured timeout elapses.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpReachability;

impl NotificationProbe for SmtpReachability {
    fn verify(&self, config: &NotificationConfig) -> Result<(), ProbeError> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let config = config.clone();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            if tx.send(smtp_login(&config, timeout)).is_err() {
                debug!(server = %config.smtp_server, "SMTP login finished after the deadline");
            }
        });
        rx.recv_timeout(timeout).map_err(|e| ProbeError::Unreachable {
            reason: format!("no answer within {}s ({e})", timeout.as_secs()),
        })?
    }
}

fn smtp_login(config: &NotificationConfig, timeout: Duration) -> Result<(), ProbeError> {
    let transport = SmtpTransport::relay(&config.smtp_server)
        .map_err(|e| smtp_failure(&e))?
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.email.clone(),
            config.password.clone(),
        ))
        .timeout(Some(timeout))
        .build();
    match transport.test_connection() {
        Ok(true) => Ok(()),
        Ok(false) => Err(ProbeError::Unreachable {
            reason: "server closed the connection".to_owned(),
        }),
        Err(e) => Err(smtp_failure(&e)),
    }
}

fn smtp_failure(error: &SmtpError) -> ProbeError {
    classify_smtp_failure(error.is_permanent(), error.to_string())
}

/// Permanent (5xx) replies mean the server answered and refused the login;
/// everything else is a transport problem.
fn classify_smtp_failure(permanent: bool, reason: String) -> ProbeError {
    if permanent {
        ProbeError::CredentialsRejected
    } else {
        ProbeError::Unreachable { reason }
    }
}

/// Outcome of the environment checks.
#[derive(Debug, Default)]
pub struct EnvironmentReport {
    /// Fatal failures, in check order.
    pub failures: Vec<EnvironmentError>,
    /// Features to switch off before freezing.
    pub downgrades: Vec<Feature>,
}

impl EnvironmentReport {
    /// Whether startup may continue.
    pub const fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run every environment check. No check stops the ones after it.
pub fn run_checks(
    config: &SessionConfig,
    window: &dyn WindowProbe,
    notification: &dyn NotificationProbe,
) -> EnvironmentReport {
    let mut report = EnvironmentReport::default();

    if let Err(e) = check_notification(config, notification) {
        report.failures.push(e);
    }
    if let Err(e) = check_assets(config) {
        report.failures.push(e);
    }
    check_window(config, window, &mut report);
    check_electro(config, &mut report);

    report
}

fn check_notification(
    config: &SessionConfig,
    probe: &dyn NotificationProbe,
) -> Result<(), EnvironmentError> {
    if !config.args.email || !config.script.smtp_verification {
        return Ok(());
    }
    info!(server = %config.notification.smtp_server, "Verifying SMTP connection");
    let server = config.notification.smtp_server.clone();
    probe.verify(&config.notification).map_err(|e| match e {
        ProbeError::CredentialsRejected => EnvironmentError::CredentialsRejected { server },
        ProbeError::Unreachable { reason } => {
            EnvironmentError::NotificationUnreachable { server, reason }
        }
    })
}

fn check_assets(config: &SessionConfig) -> Result<(), EnvironmentError> {
    if !config.script.image_verification {
        return Ok(());
    }
    info!("Verifying asset files");
    let language = &config.script.language;
    if language == REFERENCE_LANGUAGE {
        return Ok(());
    }
    warn!(language = %language, "Language is not fully supported, consider using the reference locale");

    let root = &config.script.asset_root;
    let selected = root.join(language);
    if !selected.is_dir() {
        return Err(EnvironmentError::UnknownLanguage {
            language: language.clone(),
        });
    }
    let files = missing_assets(&root.join(REFERENCE_LANGUAGE), &selected)?;
    if files.is_empty() {
        Ok(())
    } else {
        error!(language = %language, count = files.len(), "Some asset files are missing");
        Err(EnvironmentError::MissingAssets {
            language: language.clone(),
            files,
        })
    }
}

/// File names present in `reference` but absent from `selected`, sorted.
/// Subdirectories are ignored.
pub fn missing_assets(reference: &Path, selected: &Path) -> Result<Vec<String>, EnvironmentError> {
    let wanted = file_names(reference)?;
    let present = file_names(selected)?;
    Ok(wanted.difference(&present).cloned().collect())
}

fn file_names(dir: &Path) -> Result<BTreeSet<String>, EnvironmentError> {
    let io_error = |source| EnvironmentError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        if entry.file_type().map_err(io_error)?.is_file() {
            names.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

fn check_window(config: &SessionConfig, probe: &dyn WindowProbe, report: &mut EnvironmentReport) {
    let window = probe.detect(config);
    if window.title_bar {
        info!("Window mode detected. Please don't move the game window");
    }
    if window.is_supported() {
        return;
    }

    let size = format!("{}x{}", window.width, window.height);
    warn!(size = %size, "Invalid window size, use '2560x1440', '1920x1080' or '1600x900'");
    for feature in [
        Feature::SnagDetection,
        Feature::SpoolingDetection,
        Feature::FrictionBrake,
    ] {
        error!(feature = %feature, "Feature will be disabled");
        report.downgrades.push(feature);
    }

    if let Some(mode) = config.selected_mode().filter(|mode| mode.needs_precise_window()) {
        error!(mode = %mode, size = %size, "Fishing mode doesn't support this window size");
        report.failures.push(EnvironmentError::UnsupportedWindow {
            mode,
            width: window.width,
            height: window.height,
        });
    }
}

fn check_electro(config: &SessionConfig, report: &mut EnvironmentReport) {
    if !config.args.electro {
        return;
    }
    match config.selected_mode() {
        Some(mode) if mode.supports_electro() => {
            info!("Electric mode is enabled, make sure you're using an Electro Raptor reel");
        }
        mode => {
            error!(mode = ?mode, "Electric mode is not compatible with this mode and will be disabled");
            report.downgrades.push(Feature::Electro);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;
    use crate::profile::{Profile, SelectedProfile};

    struct FixedWindow(u32, u32);

    impl WindowProbe for FixedWindow {
        fn detect(&self, _config: &SessionConfig) -> WindowInfo {
            WindowInfo {
                width: self.0,
                height: self.1,
                title_bar: false,
            }
        }
    }

    struct FixedProbe(Result<(), ProbeError>);

    impl NotificationProbe for FixedProbe {
        fn verify(&self, _config: &NotificationConfig) -> Result<(), ProbeError> {
            self.0.clone()
        }
    }

    fn config_with_mode(mode: Mode) -> SessionConfig {
        SessionConfig {
            selected: Some(SelectedProfile {
                name: mode.as_str().to_owned(),
                profile: Profile::template(mode),
            }),
            ..SessionConfig::default()
        }
    }

    fn check(config: &SessionConfig, width: u32, height: u32) -> EnvironmentReport {
        run_checks(config, &FixedWindow(width, height), &FixedProbe(Ok(())))
    }

    #[test]
    fn supported_window_passes_untouched() {
        let report = check(&config_with_mode(Mode::Spin), 1600, 900);
        assert!(report.passed());
        assert!(report.downgrades.is_empty());
    }

    #[test]
    fn unsupported_window_downgrades_three_features() {
        let report = check(&config_with_mode(Mode::Spin), 1280, 720);
        assert!(report.passed());
        assert_eq!(
            report.downgrades,
            vec![
                Feature::SnagDetection,
                Feature::SpoolingDetection,
                Feature::FrictionBrake
            ]
        );
    }

    #[test]
    fn unsupported_window_is_fatal_for_float_modes() {
        for mode in [Mode::Telescopic, Mode::Bolognese] {
            let report = check(&config_with_mode(mode), 1280, 720);
            assert!(matches!(
                report.failures.as_slice(),
                [EnvironmentError::UnsupportedWindow { width: 1280, height: 720, .. }]
            ));
            assert_eq!(report.downgrades.len(), 3);
        }
    }

    #[test]
    fn electro_outside_supported_modes_is_downgraded() {
        let mut config = config_with_mode(Mode::Spin);
        config.args.electro = true;
        let report = check(&config, 1920, 1080);
        assert!(report.passed());
        assert_eq!(report.downgrades, vec![Feature::Electro]);

        let mut config = config_with_mode(Mode::Pirk);
        config.args.electro = true;
        assert!(check(&config, 1920, 1080).downgrades.is_empty());
    }

    #[test]
    fn notification_check_runs_only_when_requested() {
        let failing = FixedProbe(Err(ProbeError::CredentialsRejected));
        let mut config = config_with_mode(Mode::Spin);
        assert!(run_checks(&config, &FixedWindow(1920, 1080), &failing).passed());

        config.args.email = true;
        let report = run_checks(&config, &FixedWindow(1920, 1080), &failing);
        assert!(matches!(
            report.failures.as_slice(),
            [EnvironmentError::CredentialsRejected { .. }]
        ));

        config.script.smtp_verification = false;
        assert!(run_checks(&config, &FixedWindow(1920, 1080), &failing).passed());
    }

    #[test]
    fn unreachable_server_is_distinct_from_rejection() {
        let mut config = config_with_mode(Mode::Spin);
        config.args.email = true;
        let probe = FixedProbe(Err(ProbeError::Unreachable {
            reason: "timed out".to_owned(),
        }));
        let report = run_checks(&config, &FixedWindow(1920, 1080), &probe);
        assert!(matches!(
            report.failures.as_slice(),
            [EnvironmentError::NotificationUnreachable { reason, .. }] if reason == "timed out"
        ));
    }

    #[test]
    fn failures_do_not_short_circuit() {
        let mut config = config_with_mode(Mode::Bolognese);
        config.args.email = true;
        config.script.language = "xx".to_owned();
        config.script.asset_root = tempfile::tempdir().unwrap().path().to_path_buf();
        let probe = FixedProbe(Err(ProbeError::CredentialsRejected));
        let report = run_checks(&config, &FixedWindow(800, 600), &probe);
        assert_eq!(report.failures.len(), 3);
    }

    #[test]
    fn missing_assets_lists_every_file() {
        let root = tempfile::tempdir().unwrap();
        let reference = root.path().join("en");
        let selected = root.path().join("ru");
        fs::create_dir_all(&reference).unwrap();
        fs::create_dir_all(selected.join("nested")).unwrap();
        for name in ["bite.png", "keep.png", "wear.png"] {
            fs::write(reference.join(name), b"").unwrap();
        }
        fs::write(selected.join("keep.png"), b"").unwrap();
        fs::write(selected.join("extra.png"), b"").unwrap();

        assert_eq!(
            missing_assets(&reference, &selected).unwrap(),
            vec!["bite.png", "wear.png"]
        );

        let mut config = config_with_mode(Mode::Spin);
        config.script.language = "ru".to_owned();
        config.script.asset_root = root.path().to_path_buf();
        let report = check(&config, 1920, 1080);
        assert!(matches!(
            report.failures.as_slice(),
            [EnvironmentError::MissingAssets { files, .. }] if files.len() == 2
        ));
    }

    #[test]
    fn reference_language_skips_asset_check() {
        let mut config = config_with_mode(Mode::Spin);
        config.script.asset_root = PathBuf::from("/nonexistent");
        assert!(check(&config, 1920, 1080).passed());
    }

    fn smtp_config(port: u16, timeout_secs: u64) -> NotificationConfig {
        NotificationConfig {
            email: "not-an-address".to_owned(),
            password: "wrong".to_owned(),
            smtp_server: "127.0.0.1".to_owned(),
            smtp_port: port,
            timeout_secs,
        }
    }

    #[test]
    fn permanent_smtp_replies_reject_credentials() {
        assert_eq!(
            classify_smtp_failure(true, "535 5.7.8 authentication failed".to_owned()),
            ProbeError::CredentialsRejected
        );
        assert_eq!(
            classify_smtp_failure(false, "timed out".to_owned()),
            ProbeError::Unreachable {
                reason: "timed out".to_owned()
            }
        );
    }

    #[test]
    fn closed_smtp_port_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = SmtpReachability.verify(&smtp_config(port, 2));
        assert!(matches!(result, Err(ProbeError::Unreachable { .. })), "{result:?}");
    }

    #[test]
    fn silent_listener_is_not_a_mail_server() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let result = SmtpReachability.verify(&smtp_config(port, 1));
        assert!(matches!(result, Err(ProbeError::Unreachable { .. })), "{result:?}");
        drop(listener);
    }

    #[test]
    fn unresolvable_smtp_server_is_unreachable() {
        let mut config = smtp_config(465, 2);
        config.smtp_server = "smtp.invalid".to_owned();
        let result = SmtpReachability.verify(&config);
        assert!(matches!(result, Err(ProbeError::Unreachable { .. })), "{result:?}");
    }

    #[test]
    fn feature_paths_exist_in_defaults() {
        let builder = crate::builder::ConfigBuilder::from_defaults().unwrap();
        for feature in [
            Feature::FrictionBrake,
            Feature::SnagDetection,
            Feature::SpoolingDetection,
            Feature::Electro,
        ] {
            assert!(builder.get(feature.config_path()).is_some(), "{feature}");
        }
    }
}
