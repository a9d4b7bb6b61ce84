//! Error types for the modfs core.
//!
//! Library modules return [`ModfsError`]; command handlers at the CLI
//! boundary convert it to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error taxonomy
//!
//! ```text
//! ModfsError
//! ├── NotFound              — mod, version or priority-list entry is missing
//! ├── InvalidFormat         — malformed identifier, tag or setting value
//! ├── ResourceExhausted     — subversion counter reached 99 for a date
//! ├── EnvironmentViolation  — cross-filesystem work dir, mount state mismatch
//! ├── CorruptConfig         — persisted value cannot be read back
//! ├── CommandFailed         — an external tool exited non-zero
//! └── Io                    — filesystem failure with the offending path
//! ```

use std::io;
use std::path::Path;

use thiserror::Error;

/// Convenience alias for results carrying a [`ModfsError`].
pub type Result<T> = std::result::Result<T, ModfsError>;

/// Top-level error type for the modfs core.
#[derive(Error, Debug)]
pub enum ModfsError {
    /// A referenced mod, version or priority-list entry does not exist.
    #[error("{kind} '{name}' does not exist")]
    NotFound {
        /// What kind of object was looked up (e.g. `"mod"`, `"version"`).
        kind: &'static str,
        /// The identifier that was looked up.
        name: String,
    },

    /// Input was rejected before any mutation took place.
    #[error("invalid {what} '{value}': {reason}")]
    InvalidFormat {
        /// What kind of value was being validated.
        what: &'static str,
        /// The rejected input.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// No subversion numbers are left for the date.
    #[error("mod '{mod_id}' already has 100 subversions (00-99) on {date}")]
    ResourceExhausted {
        /// Mod whose version space is full.
        mod_id: String,
        /// Date bucket that is full.
        date: String,
    },

    /// The environment does not satisfy a precondition of the mount tool.
    #[error("{0}")]
    EnvironmentViolation(String),

    /// A persisted value is unreadable or fails validation.
    #[error("corrupt configuration in {path}: {reason}")]
    CorruptConfig {
        /// File holding the corrupt value.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// An external tool ran but reported failure.
    #[error("{program} failed (exit {code}): {stderr}")]
    CommandFailed {
        /// Program that was run.
        program: String,
        /// Exit code, `-1` when killed by a signal.
        code: i32,
        /// Trimmed standard error.
        stderr: String,
    },

    /// An I/O error occurred at `path`.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that was being accessed.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl ModfsError {
    /// Build a [`ModfsError::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Build a [`ModfsError::InvalidFormat`].
    pub fn invalid(
        what: &'static str,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFormat {
            what,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an I/O error together with the path that caused it.
    pub fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Attach a path to a bare [`io::Result`].
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|e| ModfsError::io(path, e))
    }
}
