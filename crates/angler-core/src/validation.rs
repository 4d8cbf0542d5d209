//! Argument bounds and profile validation failures.
//!
//! Validators in this module collect every failure they can detect before
//! returning, so a user sees the complete list of things to fix at once.

use tracing::error;

use crate::args::{BOAT_TICKET_DURATIONS, SessionArgs};
use crate::profile::ProfileCatalog;

/// A fatal startup validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The initial keepnet count is outside `[0, capacity)`.
    #[error("invalid number of fishes in keepnet: '{count}', expected a value in [0, {capacity})")]
    KeepnetOutOfRange {
        /// The requested count.
        count: i64,
        /// The configured keepnet capacity.
        capacity: u32,
    },

    /// A profile id is not a non-negative integer below the profile count.
    #[error("invalid profile id: '{raw}'")]
    InvalidProfileId {
        /// The id as given.
        raw: String,
    },

    /// A profile name is not declared in the catalog.
    #[error("invalid profile name: '{name}'")]
    UnknownProfile {
        /// The name as given.
        name: String,
    },

    /// A boat ticket duration that is not sold.
    #[error("invalid boat ticket duration: '{hours}', expected 1, 2, 3 or 5 hours")]
    InvalidBoatTicket {
        /// The requested duration in hours.
        hours: u8,
    },

    /// A profile has no `mode` key.
    #[error("profile '{name}' does not declare a mode")]
    MissingMode {
        /// Name of the profile.
        name: String,
    },

    /// A profile names a mode that does not exist.
    #[error("invalid mode '{mode}' in profile '{name}'")]
    UnknownMode {
        /// Name of the profile.
        name: String,
        /// The mode as written.
        mode: String,
    },

    /// A profile's key set differs from its mode's declared key set.
    #[error(
        "profile '{name}' has invalid settings {invalid:?} and missing settings {missing:?}"
    )]
    ProfileKeys {
        /// Name of the profile.
        name: String,
        /// Keys present in the profile but not declared by its mode.
        invalid: Vec<String>,
        /// Keys declared by the mode but absent from the profile.
        missing: Vec<String>,
    },

    /// A profile value could not be read as its declared type.
    #[error("profile '{name}' is malformed: {reason}")]
    MalformedProfile {
        /// Name of the profile.
        name: String,
        /// Why the profile could not be read.
        reason: String,
    },
}

impl ValidationError {
    /// Log this failure at error level, one line per offending item.
    pub fn log(&self) {
        match self {
            Self::ProfileKeys {
                name,
                invalid,
                missing,
            } => {
                for key in invalid {
                    error!(profile = %name, key = %key, "Invalid setting");
                }
                for key in missing {
                    error!(profile = %name, key = %key, "Missing setting");
                }
            }
            other => error!(error = %other, "Validation failed"),
        }
    }
}

/// Check launch arguments against the keepnet capacity and the profile
/// catalog.
///
/// # Errors
///
/// Returns every failure found, in argument order.
pub fn validate_args(
    args: &SessionArgs,
    capacity: u32,
    catalog: &ProfileCatalog<'_>,
) -> Result<(), Vec<ValidationError>> {
    let mut failures = Vec::new();

    if args.fishes_in_keepnet < 0 || args.fishes_in_keepnet >= i64::from(capacity) {
        failures.push(ValidationError::KeepnetOutOfRange {
            count: args.fishes_in_keepnet,
            capacity,
        });
    }

    if let Some(pid) = args.pid {
        if let Err(e) = validate_profile_id(&pid.to_string(), catalog.len()) {
            failures.push(e);
        }
    }

    if let Some(name) = &args.pname {
        if catalog.get(name).is_none() {
            failures.push(ValidationError::UnknownProfile { name: name.clone() });
        }
    }

    if let Some(hours) = args.boat_ticket.filter(|h| !BOAT_TICKET_DURATIONS.contains(h)) {
        failures.push(ValidationError::InvalidBoatTicket { hours });
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}

/// Parse a profile id typed by the user or passed on the command line.
///
/// Only plain decimal digits are accepted; the value must be below
/// `profile_count`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidProfileId`] for anything else.
pub fn validate_profile_id(raw: &str, profile_count: usize) -> Result<usize, ValidationError> {
    let invalid = || ValidationError::InvalidProfileId {
        raw: raw.to_owned(),
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    raw.parse::<usize>()
        .ok()
        .filter(|id| *id < profile_count)
        .ok_or_else(invalid)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_yml::{Mapping, Value};

    use super::*;

    fn catalog_tree() -> Mapping {
        let value: Value =
            serde_yml::from_str("spin: {mode: spin}\nbottom: {mode: bottom}\n").unwrap();
        value.as_mapping().unwrap().clone()
    }

    #[test]
    fn keepnet_count_equal_to_capacity_is_rejected() {
        let tree = catalog_tree();
        let args = SessionArgs {
            fishes_in_keepnet: 5,
            ..SessionArgs::default()
        };
        let failures = validate_args(&args, 5, &ProfileCatalog::new(&tree)).unwrap_err();
        assert_eq!(
            failures,
            vec![ValidationError::KeepnetOutOfRange {
                count: 5,
                capacity: 5
            }]
        );
    }

    #[test]
    fn unsold_boat_ticket_is_rejected() {
        let tree = catalog_tree();
        let catalog = ProfileCatalog::new(&tree);
        for (hours, ok) in [(1, true), (3, true), (4, false), (5, true), (6, false)] {
            let args = SessionArgs {
                boat_ticket: Some(hours),
                ..SessionArgs::default()
            };
            assert_eq!(validate_args(&args, 100, &catalog).is_ok(), ok, "hours {hours}");
        }
        let args = SessionArgs {
            boat_ticket: Some(4),
            ..SessionArgs::default()
        };
        assert_eq!(
            validate_args(&args, 100, &catalog).unwrap_err(),
            vec![ValidationError::InvalidBoatTicket { hours: 4 }]
        );
    }

    #[test]
    fn keepnet_bounds() {
        let tree = catalog_tree();
        let catalog = ProfileCatalog::new(&tree);
        for (count, ok) in [(-1, false), (0, true), (4, true), (5, false)] {
            let args = SessionArgs {
                fishes_in_keepnet: count,
                ..SessionArgs::default()
            };
            assert_eq!(validate_args(&args, 5, &catalog).is_ok(), ok, "count {count}");
        }
    }

    #[test]
    fn every_failure_is_collected() {
        let tree = catalog_tree();
        let args = SessionArgs {
            fishes_in_keepnet: 200,
            pid: Some(7),
            ..SessionArgs::default()
        };
        let failures = validate_args(&args, 100, &ProfileCatalog::new(&tree)).unwrap_err();
        assert!(matches!(
            failures.as_slice(),
            [
                ValidationError::KeepnetOutOfRange { count: 200, .. },
                ValidationError::InvalidProfileId { .. }
            ]
        ));
    }

    #[test]
    fn unknown_profile_name_is_rejected() {
        let tree = catalog_tree();
        let args = SessionArgs {
            pname: Some("trout".to_owned()),
            ..SessionArgs::default()
        };
        let failures = validate_args(&args, 100, &ProfileCatalog::new(&tree)).unwrap_err();
        assert_eq!(
            failures,
            vec![ValidationError::UnknownProfile {
                name: "trout".to_owned()
            }]
        );
    }

    #[test]
    fn profile_id_must_be_plain_digits_below_count() {
        assert_eq!(validate_profile_id("1", 2).unwrap(), 1);
        assert!(validate_profile_id("abc", 2).is_err());
        assert!(validate_profile_id("-1", 2).is_err());
        assert!(validate_profile_id("+1", 2).is_err());
        assert!(validate_profile_id("", 2).is_err());
        assert!(validate_profile_id("2", 2).is_err());
        assert!(validate_profile_id("99999999999999999999999", 2).is_err());
    }
}
