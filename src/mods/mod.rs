//! Mod identifiers and the on-disk version store.
pub mod active;
pub mod store;
pub mod version;

use std::fmt;

use crate::error::{ModfsError, Result};

pub use active::{ActiveMod, active_mods};
pub use store::{
    VersionMap, allocate_version, is_at_version_limit, latest_version, list_versions,
    resolve_active_version, version_dir, version_exists,
};
pub use version::{Version, VersionTag, parse_tag, today};

/// A validated mod identifier (`^[a-z0-9-]+$`).
///
/// # Examples
///
/// ```
/// use modfs_cli::mods::ModId;
///
/// assert!(ModId::parse("unofficial-patch-2").is_ok());
/// assert!(ModId::parse("Unofficial Patch").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModId(String);

impl ModId {
    /// Validate `raw` as a mod identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] if `raw` is empty or contains
    /// anything other than lower-case ASCII letters, digits and `-`.
    pub fn parse(raw: &str) -> Result<Self> {
        if is_valid_id(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ModfsError::invalid(
                "mod id",
                raw,
                "a mod id may only contain lower case letters a-z, digits 0-9 and '-'",
            ))
        }
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether `raw` is a syntactically valid mod identifier.
#[must_use]
pub fn is_valid_id(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_digits_and_dashes() {
        for ok in ["a", "skyui", "unofficial-patch-2", "123", "-"] {
            assert!(ModId::parse(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for bad in ["", "SkyUI", "sky ui", "sky_ui", "ü", "a/b", "../x"] {
            assert!(ModId::parse(bad).is_err(), "{bad:?} should be invalid");
        }
    }

    #[test]
    fn display_is_the_raw_id() {
        assert_eq!(ModId::parse("abc-1").unwrap().to_string(), "abc-1");
    }
}
