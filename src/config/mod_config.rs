//! Per-mod metadata stored in `mods/<id>.json`.
use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::error::{ModfsError, Result};
use crate::fs::write_atomic;
use crate::instance::Instance;
use crate::mods::{ModId, VersionTag};

use super::validation::{
    AUTHOR_CHARS, DATE_OR_EMPTY, DISPLAY_NAME_CHARS, DefaultValue, HTTP_URL,
    NO_LEADING_WHITESPACE, NO_TRAILING_WHITESPACE, STORED_VERSION_TAG, SettingSpec, SettingValue,
    URL_WITHOUT_FRAGMENT, URL_WITHOUT_PARAMS, URL_WITHOUT_QUERY, ValueKind,
};

/// Every known per-mod key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModSetting {
    /// Whether the mod takes part in deployment.
    Enabled,
    /// `latest` or a pinned `YYYY-MM-DD/NN`.
    UseModVersion,
    /// Display name.
    PrettyName,
    /// Author name.
    Author,
    /// Free-form notes.
    CustomNotes,
    /// Download page.
    Link,
    /// Date the mod was last confirmed current.
    LastUpdateCheck,
}

impl ModSetting {
    /// All keys in display order.
    pub const ALL: [Self; 7] = [
        Self::Enabled,
        Self::UseModVersion,
        Self::PrettyName,
        Self::Author,
        Self::CustomNotes,
        Self::Link,
        Self::LastUpdateCheck,
    ];

    /// The declarative description of this key.
    #[must_use]
    pub const fn spec(self) -> SettingSpec {
        match self {
            Self::Enabled => SettingSpec {
                key: "enabled",
                kind: ValueKind::Bool,
                default: DefaultValue::Bool(true),
                checks: &[],
            },
            Self::UseModVersion => SettingSpec {
                key: "use_mod_version",
                kind: ValueKind::Text,
                default: DefaultValue::Text("latest"),
                checks: &[STORED_VERSION_TAG],
            },
            Self::PrettyName => SettingSpec {
                key: "pretty_name",
                kind: ValueKind::Text,
                default: DefaultValue::Text(""),
                checks: &[DISPLAY_NAME_CHARS, NO_LEADING_WHITESPACE, NO_TRAILING_WHITESPACE],
            },
            Self::Author => SettingSpec {
                key: "author",
                kind: ValueKind::Text,
                default: DefaultValue::Text(""),
                checks: &[AUTHOR_CHARS, NO_LEADING_WHITESPACE, NO_TRAILING_WHITESPACE],
            },
            Self::CustomNotes => SettingSpec {
                key: "custom_notes",
                kind: ValueKind::Text,
                default: DefaultValue::Text(""),
                checks: &[],
            },
            Self::Link => SettingSpec {
                key: "link",
                kind: ValueKind::Text,
                default: DefaultValue::Text(""),
                checks: &[
                    NO_LEADING_WHITESPACE,
                    NO_TRAILING_WHITESPACE,
                    HTTP_URL,
                    URL_WITHOUT_QUERY,
                    URL_WITHOUT_FRAGMENT,
                    URL_WITHOUT_PARAMS,
                ],
            },
            Self::LastUpdateCheck => SettingSpec {
                key: "last_update_check",
                kind: ValueKind::Text,
                default: DefaultValue::Text(""),
                checks: &[DATE_OR_EMPTY],
            },
        }
    }

    /// JSON key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        self.spec().key
    }
}

/// Loaded configuration of one mod.
///
/// Keys this version does not know about are kept and written back
/// unchanged.
#[derive(Debug, Clone)]
pub struct ModConfig {
    mod_id: ModId,
    path: PathBuf,
    values: Map<String, Value>,
}

impl ModConfig {
    /// Load the configuration of an existing mod. A missing file yields
    /// the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::NotFound`] if the mod does not exist and
    /// [`ModfsError::CorruptConfig`] if the file is not a JSON object.
    pub fn open(instance: &Instance, mod_id: &ModId) -> Result<Self> {
        instance.existing_mod(mod_id)?;
        let path = instance.mod_config_file(mod_id);
        let values = if path.is_file() {
            let raw = std::fs::read_to_string(&path).map_err(|e| corrupt(&path, &e.to_string()))?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(corrupt(&path, "expected a JSON object")),
                Err(e) => return Err(corrupt(&path, &e.to_string())),
            }
        } else {
            Map::new()
        };
        Ok(Self {
            mod_id: mod_id.clone(),
            path,
            values,
        })
    }

    /// The mod this configuration belongs to.
    #[must_use]
    pub const fn mod_id(&self) -> &ModId {
        &self.mod_id
    }

    /// The stored value of `setting`, or its default.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value has the
    /// wrong type or fails validation.
    pub fn get(&self, setting: ModSetting) -> Result<SettingValue> {
        let spec = setting.spec();
        let Some(raw) = self.values.get(spec.key) else {
            return Ok(spec.default.value().unwrap_or(SettingValue::Text(String::new())));
        };
        let value = match (spec.kind, raw) {
            (ValueKind::Bool, Value::Bool(b)) => SettingValue::Bool(*b),
            (ValueKind::Text, Value::String(s)) => SettingValue::Text(s.clone()),
            _ => {
                return Err(corrupt(
                    &self.path,
                    &format!("{} must be a {} value, found {raw}", spec.key, spec.kind),
                ));
            }
        };
        spec.check_text(&value.to_string())
            .map_err(|e| corrupt(&self.path, &e.to_string()))?;
        Ok(value)
    }

    /// Every known key with its effective value.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if any stored value is invalid.
    pub fn get_all(&self) -> Result<Vec<(ModSetting, SettingValue)>> {
        ModSetting::ALL
            .into_iter()
            .map(|s| Ok((s, self.get(s)?)))
            .collect()
    }

    /// Validate and persist a value.
    ///
    /// Nothing is written when validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] if the value is rejected, or an
    /// I/O error if the file cannot be written.
    pub fn set(&mut self, setting: ModSetting, value: SettingValue) -> Result<()> {
        let spec = setting.spec();
        let json = match (spec.kind, value) {
            (ValueKind::Bool, SettingValue::Bool(b)) => Value::Bool(b),
            (ValueKind::Text, SettingValue::Text(s)) => {
                spec.check_text(&s)?;
                Value::String(s)
            }
            (_, other) => {
                return Err(ModfsError::invalid(
                    "setting value",
                    other.to_string(),
                    format!("{} expects a {} value", spec.key, spec.kind),
                ));
            }
        };
        self.values.insert(spec.key.to_string(), json);
        self.save()
    }

    /// Validate and persist a value given as text.
    ///
    /// # Errors
    ///
    /// See [`ModConfig::set`].
    pub fn set_text(&mut self, setting: ModSetting, text: &str) -> Result<()> {
        let value = setting.spec().parse_value(text)?;
        self.set(setting, value)
    }

    /// Write the configuration, including defaults for missing keys.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn save(&mut self) -> Result<()> {
        for setting in ModSetting::ALL {
            let spec = setting.spec();
            if self.values.contains_key(spec.key) {
                continue;
            }
            let json = match spec.default.value() {
                Some(SettingValue::Bool(b)) => Value::Bool(b),
                Some(other) => Value::String(other.to_string()),
                None => Value::String(String::new()),
            };
            self.values.insert(spec.key.to_string(), json);
        }
        let mut text = serde_json::to_string_pretty(&self.values)
            .map_err(|e| corrupt(&self.path, &e.to_string()))?;
        text.push('\n');
        write_atomic(&self.path, &text)
    }

    /// Whether the mod takes part in deployment.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value is invalid.
    pub fn enabled(&self) -> Result<bool> {
        Ok(matches!(self.get(ModSetting::Enabled)?, SettingValue::Bool(true)))
    }

    /// The selected version tag.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value is invalid.
    pub fn version_tag(&self) -> Result<VersionTag> {
        let raw = self.text(ModSetting::UseModVersion)?;
        VersionTag::parse(&raw).map_err(|e| corrupt(&self.path, &e.to_string()))
    }

    /// Text value of a string key.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value is invalid.
    pub fn text(&self, setting: ModSetting) -> Result<String> {
        Ok(match self.get(setting)? {
            SettingValue::Text(s) => s,
            other => other.to_string(),
        })
    }
}

fn corrupt(path: &std::path::Path, reason: &str) -> ModfsError {
    ModfsError::CorruptConfig {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
