//! Typed session configuration.
//!
//! [`SessionConfig`] is the frozen form of a session's configuration. It is
//! produced once by [`ConfigBuilder::freeze`](crate::builder::ConfigBuilder::freeze)
//! after every layer has been merged and every startup check has passed, and
//! is only ever read afterward.
//!
//! The canonical file lives in `angler-config.yaml`. Its sections mirror the
//! structs below; every field has a default, so a file only needs to name
//! what it changes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_yml::{Mapping, Value};

use crate::args::SessionArgs;
use crate::profile::{Mode, Profile, SelectedProfile};

/// Quit key value that means "only Ctrl-C stops the session".
pub const CTRL_C_QUIT_KEY: &str = "CTRL-C";

/// Errors that can occur while loading, merging, or freezing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A configuration source is not a key/value tree.
    #[error("config source '{origin}' must be a mapping at the top level")]
    NotAMapping {
        /// Where the offending source came from.
        origin: String,
    },

    /// A source introduced a key that does not exist and may not be added.
    #[error("unknown config key '{path}'")]
    UnknownKey {
        /// Dotted path of the key.
        path: String,
    },

    /// A source replaced a section with a plain value, or the reverse.
    #[error("config key '{path}' cannot change between a section and a value")]
    TypeMismatch {
        /// Dotted path of the key.
        path: String,
    },

    /// A free-form override token had no value.
    #[error("override '{token}' has no value")]
    MalformedOverride {
        /// The token that could not be paired.
        token: String,
    },

    /// The merged tree does not fit the typed configuration.
    #[error("invalid configuration: {source}")]
    Invalid {
        /// The underlying deserialization error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// The complete, frozen configuration of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// General script behavior.
    pub script: ScriptConfig,
    /// Key bindings.
    pub key: KeyConfig,
    /// Consumable cooldowns.
    pub stat: StatConfig,
    /// Scheduled pauses.
    pub pause: PauseConfig,
    /// Keepnet limits.
    pub keepnet: KeepnetConfig,
    /// Notification channel settings.
    pub notification: NotificationConfig,
    /// Game window geometry as reported by the platform layer.
    pub window: WindowConfig,
    /// Launch arguments, merged under this namespace.
    pub args: SessionArgs,
    /// Ordered catalog of declared profiles, keyed by profile name.
    pub profile: Mapping,
    /// The profile chosen for this session.
    pub selected: Option<SelectedProfile>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            script: ScriptConfig::default(),
            key: KeyConfig::default(),
            stat: StatConfig::default(),
            pause: PauseConfig::default(),
            keepnet: KeepnetConfig::default(),
            notification: NotificationConfig::default(),
            window: WindowConfig::default(),
            args: SessionArgs::default(),
            profile: default_profiles(),
            selected: None,
        }
    }
}

impl SessionConfig {
    /// Mode of the selected profile, if one has been selected.
    pub fn selected_mode(&self) -> Option<Mode> {
        self.selected.as_ref().map(|selected| selected.profile.mode())
    }

    /// Whether a dedicated quit key (other than Ctrl-C) is configured.
    pub fn has_quit_key(&self) -> bool {
        self.key.quit != CTRL_C_QUIT_KEY
    }
}

/// General script behavior.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Locale of the game client; selects the asset directory.
    pub language: String,
    /// Options prepended to the process arguments on every launch.
    pub launch_options: String,
    /// Verify the notification server at startup when email is enabled.
    pub smtp_verification: bool,
    /// Verify the locale's asset files at startup.
    pub image_verification: bool,
    /// Detect snags while retrieving.
    pub snag_detection: bool,
    /// Detect a fully spooled line.
    pub spooling_detection: bool,
    /// Seconds between two lure changes.
    pub lure_change_delay: f64,
    /// Seconds between two spod rod recasts.
    pub spod_rod_recast_delay: f64,
    /// Directory holding one asset directory per locale.
    pub asset_root: PathBuf,
    /// Directory session data is exported to.
    pub logs_dir: PathBuf,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            language: "en".to_owned(),
            launch_options: String::new(),
            smtp_verification: true,
            image_verification: true,
            snag_detection: true,
            spooling_detection: true,
            lure_change_delay: 1800.0,
            spod_rod_recast_delay: 1800.0,
            asset_root: PathBuf::from("static"),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

/// Key bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Line typed on the console to stop the session, or `CTRL-C`.
    pub quit: String,
    /// Hotbar slots of the rods used in bottom mode.
    pub bottom_rods: Vec<String>,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            quit: CTRL_C_QUIT_KEY.to_owned(),
            bottom_rods: vec!["1".to_owned(), "2".to_owned(), "3".to_owned()],
        }
    }
}

/// Consumable cooldowns, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatConfig {
    /// Minimum seconds between two cups of tea.
    pub tea_delay: f64,
    /// Minimum seconds between two drinks of alcohol.
    pub alcohol_delay: f64,
}

impl Default for StatConfig {
    fn default() -> Self {
        Self {
            tea_delay: 300.0,
            alcohol_delay: 900.0,
        }
    }
}

/// Scheduled pauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseConfig {
    /// Seconds between two pauses.
    pub delay: f64,
    /// Length of one pause, in seconds.
    pub duration: f64,
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            delay: 1800.0,
            duration: 600.0,
        }
    }
}

/// Keepnet limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepnetConfig {
    /// Number of fish the keepnet holds.
    pub capacity: u32,
}

impl Default for KeepnetConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

/// Notification channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Sender and recipient address.
    pub email: String,
    /// App password for the address.
    pub password: String,
    /// SMTP server host name.
    pub smtp_server: String,
    /// SMTP server port (implicit TLS).
    pub smtp_port: u16,
    /// Upper bound on the startup reachability check, in seconds.
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            smtp_server: "smtp.gmail.com".to_owned(),
            smtp_port: 465,
            timeout_secs: 10,
        }
    }
}

/// Game window geometry as reported by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Client area width in pixels.
    pub width: u32,
    /// Client area height in pixels.
    pub height: u32,
    /// Whether the window has a title bar (windowed mode).
    pub title_bar: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            title_bar: false,
        }
    }
}

/// One template profile per mode, named after the mode.
fn default_profiles() -> Mapping {
    let mut profiles = Mapping::new();
    for mode in Mode::ALL {
        if let Ok(template) = serde_yml::to_value(Profile::template(mode)) {
            profiles.insert(Value::String(mode.as_str().to_owned()), template);
        }
    }
    profiles
}

/// Render a YAML key or scalar as plain text for paths and messages.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => serde_yml::to_string(other)
            .map(|text| text.trim_end().to_owned())
            .unwrap_or_default(),
    }
}
