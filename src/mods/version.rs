//! Version and version-tag model.
//!
//! A version is a `(date, subversion)` pair naming the directory
//! `mods/<id>/<date>/<subversion>/`. Tags are the user-facing spelling:
//!
//! ```text
//! latest | [0-9]{1,2} | [0-9]{4,}-[0-9]{2}-[0-9]{2}/[0-9]{1,2}
//! ```
//!
//! A bare number means "that subversion of today", so the same tag resolves
//! to a different version on a different day.
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ModfsError, Result};

/// Highest subversion that can be allocated within one date.
pub const MAX_SUBVERSION: u8 = 99;

#[allow(clippy::unwrap_used)]
static BARE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9]{1,2})/?$").unwrap());

#[allow(clippy::unwrap_used)]
static DATED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4,}-[0-9]{2}-[0-9]{2})/([0-9]{1,2})/?$").unwrap()
});

#[allow(clippy::unwrap_used)]
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4,}-[0-9]{2}-[0-9]{2}$").unwrap());

/// Today's date in the local timezone, formatted `YYYY-MM-DD`.
#[must_use]
pub fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Whether `date` has the lexical shape of an ISO-8601 date.
///
/// Calendar validity is not checked: `2024-13-40` is accepted.
#[must_use]
pub fn is_date_like(date: &str) -> bool {
    DATE.is_match(date)
}

/// A concrete mod version.
///
/// Ordering compares the date first, then the subversion, both as strings;
/// zero-padding makes that coincide with chronological / numeric order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Calendar date bucket (`YYYY-MM-DD`).
    pub date: String,
    /// Two-digit subversion within the date.
    pub subversion: String,
}

impl Version {
    /// Build a version from a date and a numeric subversion.
    #[must_use]
    pub fn new(date: impl Into<String>, subversion: u8) -> Self {
        Self {
            date: date.into(),
            subversion: format!("{subversion:02}"),
        }
    }

    /// Build a version from raw directory names.
    #[must_use]
    pub fn from_parts(date: impl Into<String>, subversion: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            subversion: subversion.into(),
        }
    }

    /// The subversion as a number, if it is numeric.
    #[must_use]
    pub fn subversion_number(&self) -> Option<u8> {
        subversion_number(&self.subversion)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.date, self.subversion)
    }
}

/// Parse a subversion directory name as a number.
pub(crate) fn subversion_number(raw: &str) -> Option<u8> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u32>()
        .ok()
        .map(|n| u8::try_from(n).unwrap_or(u8::MAX))
}

/// A parsed but not yet resolved version tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionTag {
    /// Track the newest version on disk.
    Latest,
    /// A subversion of whatever date it is when the tag is resolved.
    Today(u8),
    /// A fully qualified version.
    Exact(Version),
}

impl VersionTag {
    /// Parse a user-supplied tag.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] if the tag matches none of the
    /// accepted shapes.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        if let Some(caps) = BARE_TAG.captures(raw)
            && let Some(sub) = caps.get(1).and_then(|m| subversion_number(m.as_str()))
        {
            return Ok(Self::Today(sub));
        }
        if let Some(caps) = DATED_TAG.captures(raw)
            && let (Some(date), Some(sub)) = (
                caps.get(1),
                caps.get(2).and_then(|m| subversion_number(m.as_str())),
            )
        {
            return Ok(Self::Exact(Version::new(date.as_str(), sub)));
        }
        Err(ModfsError::invalid(
            "version tag",
            raw,
            "expected 'latest', a subversion number for today, or YYYY-MM-DD/NN",
        ))
    }

    /// Resolve a non-`latest` tag against `today`.
    ///
    /// Returns `None` for [`VersionTag::Latest`], which needs the version
    /// store to resolve.
    #[must_use]
    pub fn resolve_fixed(&self, today: &str) -> Option<Version> {
        match self {
            Self::Latest => None,
            Self::Today(sub) => Some(Version::new(today, *sub)),
            Self::Exact(v) => Some(v.clone()),
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Today(sub) => write!(f, "{sub:02}"),
            Self::Exact(v) => v.fmt(f),
        }
    }
}

/// Parse a tag that must denote a concrete version, resolving bare numbers
/// against `today`.
///
/// # Errors
///
/// Returns [`ModfsError::InvalidFormat`] for `latest` and for malformed tags.
pub fn parse_tag(raw: &str, today: &str) -> Result<Version> {
    VersionTag::parse(raw)?.resolve_fixed(today).ok_or_else(|| {
        ModfsError::invalid(
            "version tag",
            raw,
            "expected a subversion number for today or YYYY-MM-DD/NN",
        )
    })
}
