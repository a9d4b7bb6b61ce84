//! The instance context threaded through every core operation.
//!
//! An instance is a directory holding `mods/` (mod payloads and their JSON
//! configuration) and a metadata directory (`.modfs/`, or the legacy
//! `.moddingoverlay/`) with the priority list and instance settings.
use std::path::{Path, PathBuf};

use crate::error::{IoContext as _, ModfsError, Result};
use crate::mods::ModId;

/// Name of the metadata directory inside an instance.
pub const META_DIR: &str = ".modfs";

/// Name used for the metadata directory by older releases.
pub const LEGACY_META_DIR: &str = ".moddingoverlay";

/// Resolved paths of a single instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    root: PathBuf,
}

impl Instance {
    /// Create a context rooted at `root`.
    ///
    /// The root is made absolute against the current directory so that every
    /// derived path (in particular the lower directories handed to the mount
    /// tool) is absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not an existing directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ModfsError::not_found(
                "instance directory",
                root.display().to_string(),
            ));
        }
        let root = std::fs::canonicalize(root).at(root)?;
        Ok(Self { root })
    }

    /// Create a context without touching the filesystem.
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The instance root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory containing all mods.
    #[must_use]
    pub fn mods_dir(&self) -> PathBuf {
        self.root.join("mods")
    }

    /// Directory containing the versions of `mod_id`.
    #[must_use]
    pub fn mod_dir(&self, mod_id: &ModId) -> PathBuf {
        self.mods_dir().join(mod_id.as_str())
    }

    /// JSON configuration file of `mod_id`.
    #[must_use]
    pub fn mod_config_file(&self, mod_id: &ModId) -> PathBuf {
        self.mods_dir().join(format!("{mod_id}.json"))
    }

    /// Metadata directory, preferring the legacy name only when it is the
    /// one that exists.
    #[must_use]
    pub fn meta_dir(&self) -> PathBuf {
        let current = self.root.join(META_DIR);
        let legacy = self.root.join(LEGACY_META_DIR);
        if legacy.is_dir() && !current.is_dir() {
            legacy
        } else {
            current
        }
    }

    /// The persisted priority list.
    #[must_use]
    pub fn priority_file(&self) -> PathBuf {
        self.meta_dir().join("priority.txt")
    }

    /// Directory holding one file per instance setting.
    #[must_use]
    pub fn settings_dir(&self) -> PathBuf {
        self.meta_dir().join("settings")
    }

    /// Whether `modfs init` has been run here.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.meta_dir().is_dir()
    }

    /// Whether a directory exists for `mod_id`.
    #[must_use]
    pub fn mod_exists(&self, mod_id: &ModId) -> bool {
        self.mod_dir(mod_id).is_dir()
    }

    /// Return `mod_id` if it names an existing mod.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::NotFound`] if the mod directory is missing.
    pub fn existing_mod(&self, mod_id: &ModId) -> Result<()> {
        if self.mod_exists(mod_id) {
            Ok(())
        } else {
            Err(ModfsError::not_found("mod", mod_id.as_str()))
        }
    }

    /// Parse `raw` as a mod id and require that the mod exists.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] for malformed ids and
    /// [`ModfsError::NotFound`] for ids without a directory.
    pub fn lookup_mod(&self, raw: &str) -> Result<ModId> {
        let id = ModId::parse(raw)?;
        self.existing_mod(&id)?;
        Ok(id)
    }

    /// All mods present on disk, sorted by id.
    ///
    /// Directory names that are not valid identifiers are ignored. A missing
    /// `mods/` directory yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if `mods/` exists but cannot be read.
    pub fn mod_ids(&self) -> Result<Vec<ModId>> {
        let mods_dir = self.mods_dir();
        if !mods_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&mods_dir).at(&mods_dir)? {
            let entry = entry.at(&mods_dir)?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str()
                && let Ok(id) = ModId::parse(name)
            {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Express `path` relative to the instance root when it lies inside it.
    #[must_use]
    pub fn display_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root).map_or_else(
            |_| path.display().to_string(),
            |rel| format!("./{}", rel.display()),
        )
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(s: &str) -> ModId {
        ModId::parse(s).unwrap()
    }

    #[test]
    fn derived_paths() {
        let inst = Instance::at("/games/skyrim");
        assert_eq!(inst.mods_dir(), PathBuf::from("/games/skyrim/mods"));
        assert_eq!(
            inst.mod_config_file(&id("ui")),
            PathBuf::from("/games/skyrim/mods/ui.json")
        );
    }

    #[test]
    fn meta_dir_defaults_to_current_name() {
        let tmp = tempfile::tempdir().unwrap();
        let inst = Instance::open(tmp.path()).unwrap();
        assert!(inst.meta_dir().ends_with(META_DIR));
    }

    #[test]
    fn meta_dir_falls_back_to_legacy() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(LEGACY_META_DIR)).unwrap();
        let inst = Instance::open(tmp.path()).unwrap();
        assert!(inst.meta_dir().ends_with(LEGACY_META_DIR));

        std::fs::create_dir(tmp.path().join(META_DIR)).unwrap();
        assert!(inst.meta_dir().ends_with(META_DIR));
    }

    #[test]
    fn mod_ids_skips_files_and_invalid_names() {
        let tmp = tempfile::tempdir().unwrap();
        let mods = tmp.path().join("mods");
        std::fs::create_dir_all(mods.join("b-mod")).unwrap();
        std::fs::create_dir_all(mods.join("a-mod")).unwrap();
        std::fs::create_dir_all(mods.join("Not_Valid")).unwrap();
        std::fs::write(mods.join("a-mod.json"), "{}").unwrap();

        let inst = Instance::open(tmp.path()).unwrap();
        assert_eq!(inst.mod_ids().unwrap(), vec![id("a-mod"), id("b-mod")]);
    }

    #[test]
    fn mod_ids_empty_without_mods_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let inst = Instance::open(tmp.path()).unwrap();
        assert!(inst.mod_ids().unwrap().is_empty());
    }

    #[test]
    fn lookup_mod_reports_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let inst = Instance::open(tmp.path()).unwrap();
        let err = inst.lookup_mod("ghost").unwrap_err();
        assert!(matches!(err, ModfsError::NotFound { .. }));
        let err = inst.lookup_mod("Ghost!").unwrap_err();
        assert!(matches!(err, ModfsError::InvalidFormat { .. }));
    }

    #[test]
    fn open_rejects_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Instance::open(tmp.path().join("nope")).is_err());
    }

    #[test]
    fn display_path_is_instance_relative() {
        let inst = Instance::at("/games/skyrim");
        assert_eq!(
            inst.display_path(Path::new("/games/skyrim/mods/ui/2024-01-01/00")),
            "./mods/ui/2024-01-01/00"
        );
        assert_eq!(inst.display_path(Path::new("/elsewhere")), "/elsewhere");
    }
}
