//! Fishing modes and the profiles that configure them.
//!
//! A profile is a named entry of the `profile` catalog. Its `mode` key picks
//! one variant of [`Profile`], and the remaining keys must be exactly the
//! key set that mode declares. The catalog itself stays an ordered YAML
//! mapping so the interactive prompt can list entries in file order.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yml::{Mapping, Value};

use crate::config::value_text;
use crate::validation::ValidationError;

/// Key holding a profile's mode.
pub const MODE_KEY: &str = "mode";

/// A fishing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Spinning with artificial lures.
    Spin,
    /// Bottom fishing with several rods.
    Bottom,
    /// Vertical jigging from a boat.
    Pirk,
    /// Jigging with periodic lifts ("elevator" retrieval).
    Elevator,
    /// Float fishing with a telescopic rod.
    Telescopic,
    /// Float fishing with a bolognese rod.
    Bolognese,
}

impl Mode {
    /// All modes, in catalog order.
    pub const ALL: [Self; 6] = [
        Self::Spin,
        Self::Bottom,
        Self::Pirk,
        Self::Elevator,
        Self::Telescopic,
        Self::Bolognese,
    ];

    /// The mode's name as written in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spin => "spin",
            Self::Bottom => "bottom",
            Self::Pirk => "pirk",
            Self::Elevator => "elevator",
            Self::Telescopic => "telescopic",
            Self::Bolognese => "bolognese",
        }
    }

    /// Parse a mode name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(name))
    }

    /// The exact key set a profile of this mode must carry, `mode` included.
    pub fn expected_keys(self) -> BTreeSet<&'static str> {
        let settings: &[&str] = match self {
            Self::Spin => &[
                "cast_power_level",
                "cast_delay",
                "tighten_duration",
                "retrieval_duration",
                "retrieval_delay",
                "retrieval_timeout",
                "pre_acceleration",
                "post_acceleration",
            ],
            Self::Bottom => &[
                "cast_power_level",
                "check_delay",
                "check_miss_limit",
                "put_down_delay",
            ],
            Self::Pirk => &[
                "cast_power_level",
                "sink_timeout",
                "tighten_duration",
                "depth_adjust_delay",
                "depth_adjust_duration",
                "check_delay",
                "pull_delay",
                "hook_timeout",
            ],
            Self::Elevator => &[
                "cast_power_level",
                "sink_timeout",
                "tighten_duration",
                "elevate_duration",
                "elevate_delay",
                "elevate_timeout",
                "drop",
                "check_delay",
                "pull_delay",
            ],
            Self::Telescopic | Self::Bolognese => &[
                "cast_power_level",
                "cast_delay",
                "float_sensitivity",
                "check_delay",
                "pull_delay",
                "drift_timeout",
            ],
        };
        std::iter::once(MODE_KEY)
            .chain(settings.iter().copied())
            .collect()
    }

    /// Whether the mode relies on pixel-exact window geometry.
    pub const fn needs_precise_window(self) -> bool {
        matches!(self, Self::Telescopic | Self::Bolognese)
    }

    /// Whether the mode can drive an electric reel.
    pub const fn supports_electro(self) -> bool {
        matches!(self, Self::Pirk | Self::Elevator)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings of a spin profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinSettings {
    /// Cast power, from 1 to 5.
    pub cast_power_level: f64,
    /// Seconds to wait after casting before tightening the line.
    pub cast_delay: f64,
    /// Seconds to hold the reel to tighten the line.
    pub tighten_duration: f64,
    /// Seconds of one retrieval burst.
    pub retrieval_duration: f64,
    /// Seconds between two retrieval bursts.
    pub retrieval_delay: f64,
    /// Seconds before a retrieval is considered stuck.
    pub retrieval_timeout: f64,
    /// Hold shift while casting.
    pub pre_acceleration: bool,
    /// Acceleration after a bite: `on`, `off`, or `auto`.
    pub post_acceleration: String,
}

/// Settings of a bottom profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BottomSettings {
    /// Cast power, from 1 to 5.
    pub cast_power_level: f64,
    /// Seconds between two rod checks.
    pub check_delay: f64,
    /// Consecutive empty checks before a rod is recast.
    pub check_miss_limit: u32,
    /// Seconds to wait after putting a rod down.
    pub put_down_delay: f64,
}

/// Settings of a pirk profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PirkSettings {
    /// Cast power, from 1 to 5.
    pub cast_power_level: f64,
    /// Seconds allowed for the lure to reach the bottom.
    pub sink_timeout: f64,
    /// Seconds to hold the reel to tighten the line.
    pub tighten_duration: f64,
    /// Seconds between two depth adjustments.
    pub depth_adjust_delay: f64,
    /// Seconds of one depth adjustment.
    pub depth_adjust_duration: f64,
    /// Seconds between two bite checks.
    pub check_delay: f64,
    /// Seconds to wait before pulling a hooked fish.
    pub pull_delay: f64,
    /// Seconds without a bite before recasting.
    pub hook_timeout: f64,
}

/// Settings of an elevator profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevatorSettings {
    /// Cast power, from 1 to 5.
    pub cast_power_level: f64,
    /// Seconds allowed for the lure to reach the bottom.
    pub sink_timeout: f64,
    /// Seconds to hold the reel to tighten the line.
    pub tighten_duration: f64,
    /// Seconds of one lift.
    pub elevate_duration: f64,
    /// Seconds between two lifts.
    pub elevate_delay: f64,
    /// Seconds of lifting before the lure is dropped again.
    pub elevate_timeout: f64,
    /// Drop the lure back to the bottom after each elevation cycle.
    pub drop: bool,
    /// Seconds between two bite checks.
    pub check_delay: f64,
    /// Seconds to wait before pulling a hooked fish.
    pub pull_delay: f64,
}

/// Settings of a float profile (telescopic or bolognese).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatSettings {
    /// Cast power, from 1 to 5.
    pub cast_power_level: f64,
    /// Seconds to wait after casting.
    pub cast_delay: f64,
    /// Fraction of float movement that counts as a bite.
    pub float_sensitivity: f64,
    /// Seconds between two float checks.
    pub check_delay: f64,
    /// Seconds to wait before pulling a hooked fish.
    pub pull_delay: f64,
    /// Seconds of drifting before recasting.
    pub drift_timeout: f64,
}

/// A validated profile: one typed settings set per mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Profile {
    /// A spin profile.
    Spin(SpinSettings),
    /// A bottom profile.
    Bottom(BottomSettings),
    /// A pirk profile.
    Pirk(PirkSettings),
    /// An elevator profile.
    Elevator(ElevatorSettings),
    /// A telescopic float profile.
    Telescopic(FloatSettings),
    /// A bolognese float profile.
    Bolognese(FloatSettings),
}

impl Profile {
    /// The template profile shipped for `mode`.
    pub fn template(mode: Mode) -> Self {
        match mode {
            Mode::Spin => Self::Spin(SpinSettings {
                cast_power_level: 5.0,
                cast_delay: 6.0,
                tighten_duration: 0.0,
                retrieval_duration: 0.0,
                retrieval_delay: 0.0,
                retrieval_timeout: 256.0,
                pre_acceleration: false,
                post_acceleration: "off".to_owned(),
            }),
            Mode::Bottom => Self::Bottom(BottomSettings {
                cast_power_level: 5.0,
                check_delay: 32.0,
                check_miss_limit: 16,
                put_down_delay: 0.0,
            }),
            Mode::Pirk => Self::Pirk(PirkSettings {
                cast_power_level: 1.0,
                sink_timeout: 60.0,
                tighten_duration: 1.0,
                depth_adjust_delay: 4.0,
                depth_adjust_duration: 1.0,
                check_delay: 1.0,
                pull_delay: 0.5,
                hook_timeout: 16.0,
            }),
            Mode::Elevator => Self::Elevator(ElevatorSettings {
                cast_power_level: 1.0,
                sink_timeout: 60.0,
                tighten_duration: 1.0,
                elevate_duration: 4.0,
                elevate_delay: 4.0,
                elevate_timeout: 40.0,
                drop: false,
                check_delay: 1.0,
                pull_delay: 0.5,
            }),
            Mode::Telescopic => Self::Telescopic(FloatSettings {
                cast_power_level: 1.0,
                cast_delay: 4.0,
                float_sensitivity: 0.68,
                check_delay: 1.0,
                pull_delay: 0.5,
                drift_timeout: 16.0,
            }),
            Mode::Bolognese => Self::Bolognese(FloatSettings {
                cast_power_level: 1.0,
                cast_delay: 4.0,
                float_sensitivity: 0.68,
                check_delay: 1.0,
                pull_delay: 0.5,
                drift_timeout: 32.0,
            }),
        }
    }

    /// The profile's mode.
    pub const fn mode(&self) -> Mode {
        match self {
            Self::Spin(_) => Mode::Spin,
            Self::Bottom(_) => Mode::Bottom,
            Self::Pirk(_) => Mode::Pirk,
            Self::Elevator(_) => Mode::Elevator,
            Self::Telescopic(_) => Mode::Telescopic,
            Self::Bolognese(_) => Mode::Bolognese,
        }
    }
}

/// The profile chosen for a session, together with its catalog name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedProfile {
    /// Catalog name of the profile.
    pub name: String,
    /// The validated profile.
    pub profile: Profile,
}

/// Read-only view of the ordered `profile` catalog.
#[derive(Debug, Clone, Copy)]
pub struct ProfileCatalog<'a> {
    entries: &'a Mapping,
}

impl<'a> ProfileCatalog<'a> {
    /// Wrap a `profile` mapping.
    pub const fn new(entries: &'a Mapping) -> Self {
        Self { entries }
    }

    /// Profile names in declaration order. Non-string keys are skipped.
    pub fn names(&self) -> Vec<&'a str> {
        self.entries.keys().filter_map(Value::as_str).collect()
    }

    /// Number of declared profiles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw profile tree by name.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.entries.get(name)
    }

    /// Name of the profile at `index`, in declaration order.
    pub fn name_at(&self, index: usize) -> Option<&'a str> {
        self.entries
            .iter()
            .nth(index)
            .and_then(|(key, _)| key.as_str())
    }
}

/// Check a raw profile tree against its mode's declared key set and convert
/// it into a typed [`Profile`].
///
/// Every invalid and every missing key is reported before failing.
///
/// # Errors
///
/// Returns [`ValidationError::MissingMode`] or [`ValidationError::UnknownMode`]
/// when the mode cannot be determined, [`ValidationError::ProfileKeys`] when
/// the key sets differ, and [`ValidationError::MalformedProfile`] when a
/// value has the wrong type.
pub fn validate_profile(name: &str, raw: &Value) -> Result<Profile, ValidationError> {
    let Some(tree) = raw.as_mapping() else {
        return Err(ValidationError::MalformedProfile {
            name: name.to_owned(),
            reason: "profile must be a mapping".to_owned(),
        });
    };
    let Some(mode_value) = tree.get(MODE_KEY) else {
        return Err(ValidationError::MissingMode {
            name: name.to_owned(),
        });
    };
    let mode_name = mode_value.as_str().unwrap_or_default();
    let Some(mode) = Mode::parse(mode_name) else {
        return Err(ValidationError::UnknownMode {
            name: name.to_owned(),
            mode: value_text(mode_value),
        });
    };

    let expected = mode.expected_keys();
    let actual: BTreeSet<String> = tree.keys().map(value_text).collect();
    let invalid: Vec<String> = actual
        .iter()
        .filter(|key| !expected.contains(key.as_str()))
        .cloned()
        .collect();
    let missing: Vec<String> = expected
        .iter()
        .filter(|key| !actual.contains(**key))
        .map(|key| (*key).to_owned())
        .collect();
    if !invalid.is_empty() || !missing.is_empty() {
        return Err(ValidationError::ProfileKeys {
            name: name.to_owned(),
            invalid,
            missing,
        });
    }

    // Normalize the mode spelling so the tagged enum accepts it.
    let mut normalized = tree.clone();
    normalized.insert(
        Value::String(MODE_KEY.to_owned()),
        Value::String(mode.as_str().to_owned()),
    );
    serde_yml::from_value(Value::Mapping(normalized)).map_err(|e| {
        ValidationError::MalformedProfile {
            name: name.to_owned(),
            reason: e.to_string(),
        }
    })
}
