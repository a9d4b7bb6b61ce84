//! Instance-level settings, stored as one small text file per key under
//! `<meta>/settings/`.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{IoContext as _, ModfsError, Result};
use crate::fs::write_atomic;
use crate::instance::Instance;

use super::validation::{
    Check, DefaultValue, LETTERS_ONLY, NO_LEADING_WHITESPACE, NO_TRAILING_WHITESPACE,
    SettingSpec, SettingValue, ValueKind,
};

/// A stored path: relative to the instance root, or absolute.
///
/// # Examples
///
/// ```
/// use modfs_cli::config::InstancePath;
/// use modfs_cli::instance::Instance;
/// use std::path::PathBuf;
///
/// let instance = Instance::at("/games/skyrim");
/// let rel = InstancePath::parse("working_cache");
/// assert_eq!(rel.resolve(&instance), PathBuf::from("/games/skyrim/working_cache"));
/// let abs = InstancePath::parse("/mnt/fast/work");
/// assert_eq!(abs.resolve(&instance), PathBuf::from("/mnt/fast/work"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstancePath {
    /// Interpreted relative to the instance root.
    Relative(PathBuf),
    /// Used as is.
    Absolute(PathBuf),
}

impl InstancePath {
    /// Classify a stored path string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let path = PathBuf::from(raw);
        if path.is_absolute() {
            Self::Absolute(path)
        } else {
            Self::Relative(path)
        }
    }

    /// Store `path` instance-relative when it lies inside the instance,
    /// absolute otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing `path` cannot be canonicalised.
    pub fn from_user_path(path: &Path, instance: &Instance) -> Result<Self> {
        let absolute = if path.exists() {
            std::fs::canonicalize(path).at(path)?
        } else if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .at(path)?
                .join(path)
        };
        Ok(absolute.strip_prefix(instance.root()).map_or_else(
            |_| Self::Absolute(absolute.clone()),
            |rel| Self::Relative(rel.to_path_buf()),
        ))
    }

    /// The absolute path this value denotes for `instance`.
    #[must_use]
    pub fn resolve(&self, instance: &Instance) -> PathBuf {
        match self {
            Self::Relative(rel) => instance.root().join(rel),
            Self::Absolute(abs) => abs.clone(),
        }
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative(p) | Self::Absolute(p) => write!(f, "{}", p.display()),
        }
    }
}

const PATH_TEXT: &[Check] = &[NO_LEADING_WHITESPACE, NO_TRAILING_WHITESPACE];

/// Every known instance setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceSetting {
    /// Directory the merged view is mounted on.
    DeploymentTargetDir,
    /// Scratch directory of the mount; same filesystem as the target.
    DeploymentWorkDir,
    /// Writable upper layer capturing modified files.
    DeploymentOverflowDir,
    /// Default `--subdir` for imports.
    DefaultModSubfolder,
    /// Skip the banner printed by developer subcommands.
    SuppressDeveloperCmdWarning,
}

impl InstanceSetting {
    /// All settings in display order.
    pub const ALL: [Self; 5] = [
        Self::DeploymentTargetDir,
        Self::DeploymentWorkDir,
        Self::DeploymentOverflowDir,
        Self::DefaultModSubfolder,
        Self::SuppressDeveloperCmdWarning,
    ];

    /// The declarative description of this setting.
    #[must_use]
    pub const fn spec(self) -> SettingSpec {
        match self {
            Self::DeploymentTargetDir => SettingSpec {
                key: "deploymentTargetDir",
                kind: ValueKind::Directory,
                default: DefaultValue::Unset,
                checks: PATH_TEXT,
            },
            Self::DeploymentWorkDir => SettingSpec {
                key: "deploymentWorkDir",
                kind: ValueKind::Path,
                default: DefaultValue::InstanceRelative("working_cache"),
                checks: PATH_TEXT,
            },
            Self::DeploymentOverflowDir => SettingSpec {
                key: "deploymentOverflowDir",
                kind: ValueKind::Path,
                default: DefaultValue::InstanceRelative("modifiedfiles"),
                checks: PATH_TEXT,
            },
            Self::DefaultModSubfolder => SettingSpec {
                key: "defaultModSubfolder",
                kind: ValueKind::Text,
                default: DefaultValue::Text("./"),
                checks: &[NO_LEADING_WHITESPACE, NO_TRAILING_WHITESPACE],
            },
            Self::SuppressDeveloperCmdWarning => SettingSpec {
                key: "suppressDeveloperCmdWarning",
                kind: ValueKind::Bool,
                default: DefaultValue::Bool(false),
                checks: &[],
            },
        }
    }

    /// Setting key as shown to users.
    #[must_use]
    pub const fn key(self) -> &'static str {
        self.spec().key
    }

    /// File name used on disk (the key in lower case).
    #[must_use]
    pub fn file_name(self) -> String {
        self.key().to_ascii_lowercase()
    }

    /// Find the single setting whose key starts with `prefix`
    /// (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] if the prefix is not letters
    /// only or matches more than one setting, and [`ModfsError::NotFound`]
    /// if it matches none.
    pub fn lookup(prefix: &str) -> Result<Self> {
        if !(LETTERS_ONLY.test)(prefix) {
            return Err(ModfsError::invalid("setting key", prefix, LETTERS_ONLY.rule));
        }
        let prefix = prefix.to_ascii_lowercase();
        let matches: Vec<Self> = Self::ALL
            .into_iter()
            .filter(|s| s.key().to_ascii_lowercase().starts_with(&prefix))
            .collect();
        match matches.as_slice() {
            [] => Err(ModfsError::not_found("setting", prefix)),
            [one] => Ok(*one),
            _ => Err(ModfsError::invalid(
                "setting key",
                prefix,
                "matches more than one setting",
            )),
        }
    }
}

/// Read/write access to the settings of one instance.
#[derive(Debug, Clone)]
pub struct InstanceSettings {
    instance: Instance,
    dir: PathBuf,
}

impl InstanceSettings {
    /// Settings of `instance`.
    #[must_use]
    pub fn new(instance: &Instance) -> Self {
        Self {
            instance: instance.clone(),
            dir: instance.settings_dir(),
        }
    }

    /// Create the settings directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn initialize(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).at(&self.dir)
    }

    fn file(&self, setting: InstanceSetting) -> PathBuf {
        self.dir.join(setting.file_name())
    }

    /// Whether a value is stored for `setting`.
    #[must_use]
    pub fn is_set(&self, setting: InstanceSetting) -> bool {
        self.file(setting).is_file()
    }

    /// The stored value, without falling back to the default.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value is
    /// unreadable or invalid.
    pub fn stored(&self, setting: InstanceSetting) -> Result<Option<SettingValue>> {
        let file = self.file(setting);
        if !file.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&file).map_err(|e| corrupt(&file, &e.to_string()))?;
        let spec = setting.spec();
        let value = spec
            .parse_value(raw.trim())
            .map_err(|e| corrupt(&file, &e.to_string()))?;
        if spec.kind == ValueKind::Directory
            && let SettingValue::Path(p) = &value
            && !p.resolve(&self.instance).is_dir()
        {
            return Err(corrupt(
                &file,
                &format!("{} is not a directory", p.resolve(&self.instance).display()),
            ));
        }
        Ok(Some(value))
    }

    /// The stored value, or the default.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value is
    /// unreadable or invalid.
    pub fn get(&self, setting: InstanceSetting) -> Result<Option<SettingValue>> {
        Ok(self
            .stored(setting)?
            .or_else(|| setting.spec().default.value()))
    }

    /// Validate and store a value given in textual form.
    ///
    /// Relative paths are interpreted against the current directory and
    /// stored instance-relative when they point inside the instance.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] for invalid input (nothing is
    /// written) or an I/O error if the file cannot be written.
    pub fn set_text(&self, setting: InstanceSetting, text: &str) -> Result<()> {
        let spec = setting.spec();
        let value = match spec.parse_value(text)? {
            SettingValue::Path(_) => SettingValue::Path(InstancePath::from_user_path(
                Path::new(text),
                &self.instance,
            )?),
            other => other,
        };
        self.set(setting, &value)
    }

    /// Store a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] if the value does not fit the
    /// setting, or an I/O error if the file cannot be written.
    pub fn set(&self, setting: InstanceSetting, value: &SettingValue) -> Result<()> {
        let spec = setting.spec();
        let text = value.to_string();
        let fits = matches!(
            (spec.kind, value),
            (ValueKind::Bool, SettingValue::Bool(_))
                | (ValueKind::Text, SettingValue::Text(_))
                | (ValueKind::Path | ValueKind::Directory, SettingValue::Path(_))
        );
        if !fits {
            return Err(ModfsError::invalid(
                "setting value",
                text,
                format!("{} expects a {} value", spec.key, spec.kind),
            ));
        }
        spec.check_text(&text)?;
        if spec.kind == ValueKind::Directory
            && let SettingValue::Path(p) = value
            && !p.resolve(&self.instance).is_dir()
        {
            return Err(ModfsError::invalid(
                "setting value",
                text,
                format!("{} must be an existing directory", spec.key),
            ));
        }
        write_atomic(&self.file(setting), &format!("{text}\n"))
    }

    /// Remove the stored value so the default applies again.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn unset(&self, setting: InstanceSetting) -> Result<()> {
        let file = self.file(setting);
        match std::fs::remove_file(&file) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(ModfsError::io(&file, e)),
            _ => Ok(()),
        }
    }

    /// Absolute path stored in (or defaulted for) a path setting.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value is invalid.
    pub fn path(&self, setting: InstanceSetting) -> Result<Option<PathBuf>> {
        Ok(match self.get(setting)? {
            Some(SettingValue::Path(p)) => Some(p.resolve(&self.instance)),
            _ => None,
        })
    }

    /// Boolean value of a flag setting.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value is invalid.
    pub fn flag(&self, setting: InstanceSetting) -> Result<bool> {
        Ok(matches!(self.get(setting)?, Some(SettingValue::Bool(true))))
    }

    /// Text value of a text setting.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::CorruptConfig`] if the stored value is invalid.
    pub fn text(&self, setting: InstanceSetting) -> Result<String> {
        Ok(match self.get(setting)? {
            Some(SettingValue::Text(s)) => s,
            _ => String::new(),
        })
    }
}

fn corrupt(file: &Path, reason: &str) -> ModfsError {
    ModfsError::CorruptConfig {
        path: file.display().to_string(),
        reason: reason.to_string(),
    }
}
