//! Importing mod files into a freshly allocated version.
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::config::{ModConfig, ModSetting};
use crate::error::{IoContext as _, ModfsError, Result};
use crate::exec;
use crate::fs::{RenameReport, lowercase_tree, transfer_dir_contents};
use crate::instance::Instance;
use crate::mods::{ModId, Version, allocate_version, version_dir};

/// Placeholder replaced by the mod id in `--subdir`.
pub const MOD_NAME_PLACEHOLDER: &str = "MOD_NAME";
/// Placeholder replaced by the source directory's name in `--subdir`.
pub const SRC_DIR_PLACEHOLDER: &str = "SRC_DIR";

/// Archive formats handed to an external extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// `.tar` with an optional compression suffix.
    Tar,
    /// `.zip`.
    Zip,
    /// `.rar`.
    Rar,
    /// `.7z`.
    SevenZip,
}

#[allow(clippy::unwrap_used)]
fn case_insensitive(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap()
}

static ARCHIVE_PATTERNS: LazyLock<[(Regex, ArchiveKind); 4]> = LazyLock::new(|| {
    [
        (case_insensitive(r"\.tar(\.[a-z0-9]+)?$"), ArchiveKind::Tar),
        (case_insensitive(r"\.zip$"), ArchiveKind::Zip),
        (case_insensitive(r"\.rar$"), ArchiveKind::Rar),
        (case_insensitive(r"\.7z$"), ArchiveKind::SevenZip),
    ]
});

impl ArchiveKind {
    /// Detect the format from the file name.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] for unsupported extensions.
    pub fn detect(archive: &Path) -> Result<Self> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ARCHIVE_PATTERNS
            .iter()
            .find(|(re, _)| re.is_match(&name))
            .map(|(_, kind)| *kind)
            .ok_or_else(|| {
                ModfsError::invalid(
                    "archive",
                    archive.display().to_string(),
                    "supported formats are .tar[.*], .zip, .rar and .7z",
                )
            })
    }

    /// The extractor program and its arguments.
    #[must_use]
    pub fn command(self, archive: &Path, dest: &Path) -> (&'static str, Vec<String>) {
        let a = archive.display().to_string();
        let d = dest.display().to_string();
        match self {
            Self::Tar => ("tar", vec![
                "-x".into(),
                "-f".into(),
                a,
                format!("--one-top-level={d}"),
            ]),
            Self::Zip => ("unzip", vec!["-q".into(), "-d".into(), d, a]),
            Self::Rar => ("unrar", vec!["x".into(), a, format!("{d}/")]),
            Self::SevenZip => ("7z", vec!["x".into(), format!("-o{d}"), a]),
        }
    }
}

/// Extract `archive` into the empty directory `dest`.
///
/// # Errors
///
/// Returns [`ModfsError::InvalidFormat`] for unsupported formats,
/// [`ModfsError::EnvironmentViolation`] if the extractor is not installed,
/// and [`ModfsError::CommandFailed`] if extraction fails or yields nothing.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let kind = ArchiveKind::detect(archive)?;
    let (program, args) = kind.command(archive, dest);
    exec::require(program)?;
    std::fs::create_dir_all(dest).at(dest)?;
    tracing::info!(target: "modfs::exec", "{program} {}", args.join(" "));
    exec::run(program, &args)?;
    if std::fs::read_dir(dest).at(dest)?.next().is_none() {
        return Err(ModfsError::CommandFailed {
            program: program.to_string(),
            code: 0,
            stderr: "archive produced no files".to_string(),
        });
    }
    Ok(())
}

/// Replace the `MOD_NAME` and `SRC_DIR` placeholders in a `--subdir` value.
#[must_use]
pub fn expand_subdir(raw: &str, mod_id: &ModId, source_name: Option<&str>) -> String {
    let expanded = raw.replace(MOD_NAME_PLACEHOLDER, mod_id.as_str());
    match source_name {
        Some(name) => expanded.replace(SRC_DIR_PLACEHOLDER, name),
        None => expanded,
    }
}

/// Lexically normalise `subdir` below `base`.
///
/// # Errors
///
/// Returns [`ModfsError::InvalidFormat`] if `subdir` is absolute or climbs
/// out of `base`.
pub fn contained_subdir(base: &Path, subdir: &str) -> Result<PathBuf> {
    let escape = || {
        ModfsError::invalid(
            "subdirectory",
            subdir,
            "must stay inside the mod's version directory",
        )
    };
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(subdir).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop().ok_or_else(escape)?;
            }
            Component::RootDir | Component::Prefix(_) => return Err(escape()),
        }
    }
    Ok(parts.iter().fold(base.to_path_buf(), |acc, p| acc.join(p)))
}

/// Directories below `root` whose trailing components equal `subdir`.
fn find_subdir_candidates(root: &Path, subdir: &Path) -> Vec<PathBuf> {
    if subdir.as_os_str().is_empty() {
        return Vec::new();
    }
    walkdir::WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_dir() && e.path().ends_with(subdir))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Scratch directory that is removed when dropped.
struct Staging(PathBuf);

impl Drop for Staging {
    fn drop(&mut self) {
        if self.0.exists() {
            std::fs::remove_dir_all(&self.0).ok();
        }
    }
}

/// What to import and how.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// Mod receiving the new version; created when missing.
    pub mod_id: ModId,
    /// Directory or archive to import.
    pub source: PathBuf,
    /// Target subdirectory inside the version, with placeholders.
    pub subdir: String,
    /// Copy instead of move when the source is a directory.
    pub keep_source: bool,
    /// Metadata applied after the files are in place.
    pub metadata: Vec<(ModSetting, String)>,
}

/// Result of a successful import.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    /// Newly created version.
    pub version: Version,
    /// Directory the files were placed in.
    pub destination: PathBuf,
    /// Lower-case normalisation results.
    pub renames: RenameReport,
}

/// Import `request` as a new version dated `today`.
///
/// Metadata is validated before anything is created. If the transfer fails,
/// the source is left intact and the version directory is removed again,
/// together with the date and mod directories when this import created them.
///
/// # Errors
///
/// Returns [`ModfsError::ResourceExhausted`] when `today` has no free
/// subversion, [`ModfsError::NotFound`] when the source is missing,
/// [`ModfsError::InvalidFormat`] for bad metadata, subdirectories or
/// archive types, and any extraction or I/O failure.
pub fn import(instance: &Instance, request: &ImportRequest, today: &str) -> Result<ImportOutcome> {
    for (setting, value) in &request.metadata {
        setting.spec().parse_value(value)?;
    }
    let source = std::fs::canonicalize(&request.source).map_err(|_| {
        ModfsError::not_found("import source", request.source.display().to_string())
    })?;
    let source_name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());
    let subdir = expand_subdir(
        &request.subdir,
        &request.mod_id,
        source.is_dir().then_some(source_name.as_deref()).flatten(),
    );
    let relative_subdir = contained_subdir(Path::new(""), &subdir)?;

    let mod_dir = instance.mod_dir(&request.mod_id);
    let date_dir = mod_dir.join(today);
    let created = Created {
        mod_dir: (!mod_dir.is_dir()).then_some(mod_dir),
        date_dir: (!date_dir.is_dir()).then_some(date_dir),
    };
    let version = allocate_version(instance, &request.mod_id, today)?;
    let root = version_dir(instance, &request.mod_id, &version);
    let destination = root.join(&relative_subdir);
    tracing::debug!("importing {} into {}", source.display(), destination.display());

    if let Err(e) = place_files(instance, &source, &destination, &relative_subdir, request) {
        created.roll_back(&root);
        return Err(e);
    }

    let renames = lowercase_tree(&root)?;
    let lowered = root.join(relative_subdir.to_string_lossy().to_lowercase());
    let destination = if lowered.is_dir() { lowered } else { destination };

    let mut config = ModConfig::open(instance, &request.mod_id)?;
    config.set_text(ModSetting::LastUpdateCheck, today)?;
    for (setting, value) in &request.metadata {
        config.set_text(*setting, value)?;
    }

    Ok(ImportOutcome {
        version,
        destination,
        renames,
    })
}

/// Directories an import created, removed again if it fails.
struct Created {
    mod_dir: Option<PathBuf>,
    date_dir: Option<PathBuf>,
}

impl Created {
    fn roll_back(&self, version_root: &Path) {
        let dirs = [
            Some(version_root),
            self.date_dir.as_deref(),
            self.mod_dir.as_deref(),
        ];
        for dir in dirs.into_iter().flatten() {
            if let Err(e) = std::fs::remove_dir_all(dir)
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!("could not remove {}: {e}", dir.display());
            }
        }
    }
}

fn place_files(
    instance: &Instance,
    source: &Path,
    destination: &Path,
    relative_subdir: &Path,
    request: &ImportRequest,
) -> Result<()> {
    std::fs::create_dir_all(destination).at(destination)?;
    if source.is_dir() {
        return transfer_dir_contents(source, destination, request.keep_source);
    }

    let staging = Staging(
        instance
            .meta_dir()
            .join(format!("staging-{}", std::process::id())),
    );
    if staging.0.exists() {
        std::fs::remove_dir_all(&staging.0).at(&staging.0)?;
    }
    extract_archive(source, &staging.0)?;

    let candidates = find_subdir_candidates(&staging.0, relative_subdir);
    let picked = match candidates.as_slice() {
        [] => staging.0.clone(),
        [one] => one.clone(),
        _ => {
            return Err(ModfsError::invalid(
                "subdirectory",
                relative_subdir.display().to_string(),
                "matches several directories inside the archive; prepare the files manually",
            ));
        }
    };
    transfer_dir_contents(&picked, destination, false)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::mods::list_versions;

    const TODAY: &str = "2024-05-17";

    fn id(s: &str) -> ModId {
        ModId::parse(s).unwrap()
    }

    fn request(source: &Path, subdir: &str, keep: bool) -> ImportRequest {
        ImportRequest {
            mod_id: id("skyui"),
            source: source.to_path_buf(),
            subdir: subdir.to_string(),
            keep_source: keep,
            metadata: Vec::new(),
        }
    }

    #[test]
    fn placeholders_are_expanded() {
        assert_eq!(
            expand_subdir("Data/MOD_NAME/SRC_DIR", &id("ui"), Some("SkyUI-5.2")),
            "Data/ui/SkyUI-5.2"
        );
        assert_eq!(expand_subdir("SRC_DIR", &id("ui"), None), "SRC_DIR");
    }

    #[test]
    fn subdir_must_stay_inside() {
        let base = Path::new("/i/mods/ui/2024-01-01/00");
        assert_eq!(
            contained_subdir(base, "./Data/../textures").unwrap(),
            base.join("textures")
        );
        assert_eq!(contained_subdir(base, "./").unwrap(), base);
        assert!(contained_subdir(base, "../01").is_err());
        assert!(contained_subdir(base, "/etc").is_err());
    }

    #[test]
    fn archive_kinds() {
        assert_eq!(
            ArchiveKind::detect(Path::new("SkyUI.TAR.GZ")).unwrap(),
            ArchiveKind::Tar
        );
        assert_eq!(
            ArchiveKind::detect(Path::new("a.zip")).unwrap(),
            ArchiveKind::Zip
        );
        assert_eq!(
            ArchiveKind::detect(Path::new("a.7z")).unwrap(),
            ArchiveKind::SevenZip
        );
        assert!(matches!(
            ArchiveKind::detect(Path::new("a.exe")).unwrap_err(),
            ModfsError::InvalidFormat { .. }
        ));
        let (program, args) =
            ArchiveKind::Rar.command(Path::new("/dl/a.rar"), Path::new("/tmp/x"));
        assert_eq!(program, "unrar");
        assert_eq!(args, vec!["x", "/dl/a.rar", "/tmp/x/"]);
    }

    #[test]
    fn directory_import_copies_and_lowercases() {
        let tmp = tempfile::tempdir().unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let src = tmp.path().join("download");
        std::fs::create_dir_all(src.join("Textures")).unwrap();
        std::fs::write(src.join("Textures/Sky.DDS"), "px").unwrap();

        let mut req = request(&src, "Data", true);
        req.metadata = vec![(ModSetting::Author, "schlangster".to_string())];
        let outcome = import(&instance, &req, TODAY).unwrap();

        assert_eq!(outcome.version, Version::new(TODAY, 0));
        let root = version_dir(&instance, &id("skyui"), &outcome.version);
        assert!(root.join("data/textures/sky.dds").is_file());
        assert!(src.join("Textures/Sky.DDS").is_file());

        let config = ModConfig::open(&instance, &id("skyui")).unwrap();
        assert_eq!(config.text(ModSetting::LastUpdateCheck).unwrap(), TODAY);
        assert_eq!(config.text(ModSetting::Author).unwrap(), "schlangster");
    }

    #[test]
    fn directory_import_moves_without_keep() {
        let tmp = tempfile::tempdir().unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let src = tmp.path().join("download");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("plugin.esp"), "x").unwrap();

        import(&instance, &request(&src, "./", false), TODAY).unwrap();
        assert!(!src.join("plugin.esp").exists());
    }

    #[test]
    fn bad_metadata_creates_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let src = tmp.path().join("download");
        std::fs::create_dir_all(&src).unwrap();

        let mut req = request(&src, "./", true);
        req.metadata = vec![(ModSetting::Link, "ftp://nope".to_string())];
        assert!(import(&instance, &req, TODAY).is_err());
        assert!(!instance.mod_exists(&id("skyui")));
    }

    #[test]
    fn escaping_subdir_creates_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let src = tmp.path().join("download");
        std::fs::create_dir_all(&src).unwrap();
        assert!(import(&instance, &request(&src, "../../x", true), TODAY).is_err());
        assert!(!instance.mod_exists(&id("skyui")));
    }

    #[test]
    fn unsupported_archive_removes_allocated_version() {
        let tmp = tempfile::tempdir().unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let archive = tmp.path().join("mod.exe");
        std::fs::write(&archive, "MZ").unwrap();

        let err = import(&instance, &request(&archive, "./", true), TODAY).unwrap_err();
        assert!(matches!(err, ModfsError::InvalidFormat { .. }));
        assert!(!instance.mod_exists(&id("skyui")));
        assert!(!instance.mod_dir(&id("skyui")).exists());
    }

    #[test]
    fn failed_import_keeps_existing_versions() {
        let tmp = tempfile::tempdir().unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        std::fs::create_dir_all(tmp.path().join("mods/skyui").join(TODAY).join("00")).unwrap();
        let archive = tmp.path().join("mod.exe");
        std::fs::write(&archive, "MZ").unwrap();

        assert!(import(&instance, &request(&archive, "./", true), TODAY).is_err());
        let versions = list_versions(&instance, &id("skyui")).unwrap();
        assert_eq!(
            versions[TODAY].iter().collect::<Vec<_>>(),
            [&"00".to_string()]
        );
    }

    #[test]
    fn missing_source_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let err = import(&instance, &request(&tmp.path().join("nope"), "./", true), TODAY)
            .unwrap_err();
        assert!(matches!(err, ModfsError::NotFound { .. }));
    }
}
