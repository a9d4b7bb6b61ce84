//! Declarative setting tables and the predicates they are built from.
//!
//! Every persisted setting (per-mod JSON keys and per-instance setting files)
//! is described by a [`SettingSpec`]: its key, value kind, default and an
//! ordered list of [`Check`]s. Validation runs the checks in order and
//! reports the first one that fails, independently of how the value is
//! stored.
use std::fmt;

use crate::error::{ModfsError, Result};
use crate::mods::version::is_date_like;

use super::settings::InstancePath;

/// The type of value a setting holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `true` / `false`.
    Bool,
    /// Free text, subject to the setting's checks.
    Text,
    /// A path that is stored instance-relative when possible.
    Path,
    /// Like [`ValueKind::Path`], but the resolved path must be an existing
    /// directory.
    Directory,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Text => f.write_str("text"),
            Self::Path => f.write_str("path"),
            Self::Directory => f.write_str("directory"),
        }
    }
}

/// Default value of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    /// The setting has no value until one is stored.
    Unset,
    /// Boolean default.
    Bool(bool),
    /// Text default.
    Text(&'static str),
    /// Path default, relative to the instance root.
    InstanceRelative(&'static str),
}

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// Boolean value.
    Bool(bool),
    /// Text value.
    Text(String),
    /// Path value.
    Path(InstancePath),
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
            Self::Path(p) => p.fmt(f),
        }
    }
}

impl DefaultValue {
    /// The default as a typed value, if there is one.
    #[must_use]
    pub fn value(self) -> Option<SettingValue> {
        match self {
            Self::Unset => None,
            Self::Bool(b) => Some(SettingValue::Bool(b)),
            Self::Text(s) => Some(SettingValue::Text(s.to_string())),
            Self::InstanceRelative(p) => Some(SettingValue::Path(InstancePath::parse(p))),
        }
    }
}

/// A single named predicate over a text value.
#[derive(Clone, Copy)]
pub struct Check {
    /// Human-readable rule, used in error messages.
    pub rule: &'static str,
    /// Returns `true` when the value satisfies the rule.
    pub test: fn(&str) -> bool,
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("rule", &self.rule).finish()
    }
}

/// Declarative description of one setting.
#[derive(Debug, Clone, Copy)]
pub struct SettingSpec {
    /// Key used in storage.
    pub key: &'static str,
    /// Type of the value.
    pub kind: ValueKind,
    /// Value used when nothing is stored.
    pub default: DefaultValue,
    /// Ordered checks applied to the textual form of the value.
    pub checks: &'static [Check],
}

impl SettingSpec {
    /// Run every check against `text`, failing on the first violation.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] naming the violated rule.
    pub fn check_text(&self, text: &str) -> Result<()> {
        match self.checks.iter().find(|c| !(c.test)(text)) {
            Some(failed) => Err(ModfsError::invalid(
                "setting value",
                text,
                format!("{}: {}", self.key, failed.rule),
            )),
            None => Ok(()),
        }
    }

    /// Parse a textual value into the setting's type and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] if the text does not parse as
    /// the setting's kind or fails one of its checks.
    pub fn parse_value(&self, text: &str) -> Result<SettingValue> {
        self.check_text(text)?;
        match self.kind {
            ValueKind::Bool => parse_bool(text).map(SettingValue::Bool).ok_or_else(|| {
                ModfsError::invalid(
                    "setting value",
                    text,
                    format!("{} expects true or false", self.key),
                )
            }),
            ValueKind::Text => Ok(SettingValue::Text(text.to_string())),
            ValueKind::Path | ValueKind::Directory => {
                if text.is_empty() {
                    return Err(ModfsError::invalid(
                        "setting value",
                        text,
                        format!("{} expects a path", self.key),
                    ));
                }
                Ok(SettingValue::Path(InstancePath::parse(text)))
            }
        }
    }
}

/// Parse `true`/`false` case-insensitively.
#[must_use]
pub fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Rejects leading whitespace.
pub const NO_LEADING_WHITESPACE: Check = Check {
    rule: "must not start with whitespace",
    test: |s| !s.starts_with(char::is_whitespace),
};

/// Rejects trailing whitespace.
pub const NO_TRAILING_WHITESPACE: Check = Check {
    rule: "must not end with whitespace",
    test: |s| !s.ends_with(char::is_whitespace),
};

/// Letters, digits, spaces and dashes.
pub const DISPLAY_NAME_CHARS: Check = Check {
    rule: "may only contain letters, digits, spaces and '-'",
    test: |s| {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
    },
};

/// Letters, digits and spaces.
pub const AUTHOR_CHARS: Check = Check {
    rule: "may only contain letters, digits and spaces",
    test: |s| s.chars().all(|c| c.is_ascii_alphanumeric() || c == ' '),
};

/// `latest` or a fully qualified `YYYY-MM-DD/NN` version.
pub const STORED_VERSION_TAG: Check = Check {
    rule: "must be 'latest' or YYYY-MM-DD/NN",
    test: |s| {
        s == "latest"
            || s.split_once('/').is_some_and(|(date, sub)| {
                is_date_like(date) && sub.len() == 2 && sub.bytes().all(|b| b.is_ascii_digit())
            })
    },
};

/// Empty or an `http`/`https` URL.
pub const HTTP_URL: Check = Check {
    rule: "must be an http or https URL",
    test: |s| {
        s.is_empty() || {
            let lower = s.to_ascii_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://")
        }
    },
};

/// No `?query` part.
pub const URL_WITHOUT_QUERY: Check = Check {
    rule: "must not contain a query",
    test: |s| !s.contains('?'),
};

/// No `#fragment` part.
pub const URL_WITHOUT_FRAGMENT: Check = Check {
    rule: "must not contain a fragment",
    test: |s| !s.contains('#'),
};

/// No `;params` on the last path segment.
pub const URL_WITHOUT_PARAMS: Check = Check {
    rule: "must not contain path parameters",
    test: |s| {
        let after_host = s.split_once("://").map_or(s, |(_, rest)| rest);
        let last_segment = after_host.rsplit('/').next().unwrap_or_default();
        !last_segment.contains(';')
    },
};

/// Empty or a `YYYY-MM-DD` date.
pub const DATE_OR_EMPTY: Check = Check {
    rule: "must be empty or YYYY-MM-DD",
    test: |s| s.is_empty() || is_date_like(s),
};

/// Letters only; used for instance setting keys.
pub const LETTERS_ONLY: Check = Check {
    rule: "may only contain letters",
    test: |s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()),
};
