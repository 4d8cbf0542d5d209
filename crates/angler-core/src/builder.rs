//! Layered configuration assembly.
//!
//! A [`ConfigBuilder`] holds the configuration while it is still being
//! assembled. Sources are overlaid in priority order, later sources winning:
//!
//! 1. built-in defaults ([`SessionConfig::default`]),
//! 2. the configuration file,
//! 3. launch arguments (under `args`),
//! 4. the resolved profile (under `selected`),
//! 5. free-form `key=value` overrides.
//!
//! An overlay may only replace keys that already exist, except below
//! `profile` and `selected`, where new keys are accepted. A YAML document
//! that declares `profile` replaces the whole catalog, so the built-in
//! per-mode templates only apply when no document declares one and a
//! document's profiles are never completed from them. Once every check
//! has passed, [`ConfigBuilder::freeze`] consumes the builder and yields the
//! typed, read-only [`SessionConfig`]. No handle that can write survives
//! freezing.

use std::path::Path;

use serde_yml::{Mapping, Value};
use tracing::debug;

use crate::args::SessionArgs;
use crate::config::{ConfigError, SessionConfig, value_text};
use crate::profile::{Profile, SelectedProfile};

/// Root sections below which sources may introduce new keys.
const OPEN_SECTIONS: [&str; 2] = [CATALOG_SECTION, "selected"];

const CATALOG_SECTION: &str = "profile";

/// A configuration tree in the `Building` state.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    tree: Mapping,
}

impl ConfigBuilder {
    /// Start from the built-in defaults.
    pub fn from_defaults() -> Result<Self, ConfigError> {
        let tree = match serde_yml::to_value(SessionConfig::default())? {
            Value::Mapping(tree) => tree,
            _ => {
                return Err(ConfigError::NotAMapping {
                    origin: "defaults".to_owned(),
                });
            }
        };
        Ok(Self { tree })
    }

    /// Overlay a YAML file.
    pub fn merge_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.merge_yaml_str(&contents, &path.display().to_string())
    }

    /// Overlay a YAML document. An empty document changes nothing; a
    /// `profile` mapping replaces the catalog instead of merging into it.
    pub fn merge_yaml_str(&mut self, yaml: &str, origin: &str) -> Result<(), ConfigError> {
        let value: Value = serde_yml::from_str(yaml)?;
        match value {
            Value::Null => Ok(()),
            Value::Mapping(mut document) => {
                if let Some(catalog) = document.remove(CATALOG_SECTION) {
                    self.replace_catalog(catalog, origin)?;
                }
                self.merge_value(Value::Mapping(document), origin)
            }
            _ => Err(ConfigError::NotAMapping {
                origin: origin.to_owned(),
            }),
        }
    }

    fn replace_catalog(&mut self, catalog: Value, origin: &str) -> Result<(), ConfigError> {
        match catalog {
            Value::Null => Ok(()),
            Value::Mapping(_) => {
                debug!(origin, "Replaced profile catalog");
                self.tree.insert(Value::from(CATALOG_SECTION), catalog);
                Ok(())
            }
            _ => Err(ConfigError::TypeMismatch {
                path: CATALOG_SECTION.to_owned(),
            }),
        }
    }

    /// Overlay a YAML tree. The tree must be a mapping.
    pub fn merge_value(&mut self, value: Value, origin: &str) -> Result<(), ConfigError> {
        let Value::Mapping(overlay) = value else {
            return Err(ConfigError::NotAMapping {
                origin: origin.to_owned(),
            });
        };
        overlay_mapping(&mut self.tree, overlay, "", false)?;
        debug!(origin, "Merged configuration source");
        Ok(())
    }

    /// Overlay parsed launch arguments under the `args` namespace.
    pub fn merge_args(&mut self, args: &SessionArgs) -> Result<(), ConfigError> {
        let mut overlay = Mapping::new();
        overlay.insert(Value::from("args"), serde_yml::to_value(args)?);
        self.merge_value(Value::Mapping(overlay), "arguments")
    }

    /// Record the resolved profile under `selected`, replacing any previous
    /// selection.
    pub fn select_profile(&mut self, name: &str, profile: &Profile) -> Result<(), ConfigError> {
        let selected = SelectedProfile {
            name: name.to_owned(),
            profile: profile.clone(),
        };
        self.tree
            .insert(Value::from("selected"), serde_yml::to_value(selected)?);
        debug!(profile = name, "Merged selected profile");
        Ok(())
    }

    /// Apply free-form overrides.
    ///
    /// Tokens are either `dotted.key=value` or a `dotted.key` followed by its
    /// value as the next token. A value is coerced by the type already stored
    /// at its key: strings keep the raw text, sequences split on commas, and
    /// everything else is read as a YAML scalar.
    pub fn merge_overrides(&mut self, tokens: &[String]) -> Result<(), ConfigError> {
        let mut tokens = tokens.iter();
        while let Some(token) = tokens.next() {
            let (path, raw) = match token.split_once('=') {
                Some((path, raw)) => (path, raw),
                None => match tokens.next() {
                    Some(raw) => (token.as_str(), raw.as_str()),
                    None => {
                        return Err(ConfigError::MalformedOverride {
                            token: token.clone(),
                        });
                    }
                },
            };
            let value = coerce(self.get(path), raw)?;
            self.set(path, value)?;
        }
        Ok(())
    }

    /// Write one value at a dotted path, following the same rules as a
    /// merged source.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), ConfigError> {
        let overlay = path
            .rsplit('.')
            .fold(value, |inner, segment| {
                let mut level = Mapping::new();
                level.insert(Value::from(segment), inner);
                Value::Mapping(level)
            });
        self.merge_value(overlay, path)
    }

    /// Read the value at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        segments.try_fold(self.tree.get(first)?, |node, segment| {
            node.as_mapping()?.get(segment)
        })
    }

    /// Typed view of the configuration as assembled so far.
    pub fn snapshot(&self) -> Result<SessionConfig, ConfigError> {
        serde_yml::from_value(Value::Mapping(self.tree.clone()))
            .map_err(|source| ConfigError::Invalid { source })
    }

    /// Consume the builder and yield the read-only configuration.
    ///
    /// ```compile_fail
    /// # use angler_core::builder::ConfigBuilder;
    /// let mut builder = ConfigBuilder::from_defaults().unwrap();
    /// let config = builder.freeze().unwrap();
    /// builder.set("stat.tea_delay", 60.into()).unwrap();
    /// ```
    pub fn freeze(self) -> Result<SessionConfig, ConfigError> {
        serde_yml::from_value(Value::Mapping(self.tree))
            .map_err(|source| ConfigError::Invalid { source })
    }
}

fn overlay_mapping(
    base: &mut Mapping,
    overlay: Mapping,
    prefix: &str,
    allow_new: bool,
) -> Result<(), ConfigError> {
    for (key, incoming) in overlay {
        let name = value_text(&key);
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        let child_allows_new =
            allow_new || (prefix.is_empty() && OPEN_SECTIONS.contains(&name.as_str()));

        if !base.contains_key(&key) {
            if !allow_new {
                return Err(ConfigError::UnknownKey { path });
            }
            base.insert(key, incoming);
            continue;
        }

        match base.get_mut(&key) {
            None => {}
            Some(Value::Mapping(existing)) if incoming.is_mapping() => {
                if let Value::Mapping(incoming) = incoming {
                    overlay_mapping(existing, incoming, &path, child_allows_new)?;
                }
            }
            Some(existing) => {
                let clash = !existing.is_null()
                    && !incoming.is_null()
                    && existing.is_mapping() != incoming.is_mapping();
                if clash {
                    return Err(ConfigError::TypeMismatch { path });
                }
                *existing = incoming;
            }
        }
    }
    Ok(())
}

fn coerce(current: Option<&Value>, raw: &str) -> Result<Value, ConfigError> {
    match current {
        Some(Value::String(_)) => Ok(Value::from(raw)),
        Some(Value::Sequence(items)) => {
            let strings = items.first().is_none_or(Value::is_string);
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| {
                    if strings {
                        Ok(Value::from(item))
                    } else {
                        serde_yml::from_str(item).map_err(ConfigError::from)
                    }
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence)
        }
        _ => serde_yml::from_str(raw).map_err(ConfigError::from),
    }
}
