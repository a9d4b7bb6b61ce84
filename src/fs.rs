//! Filesystem helpers shared by the store, import and repair code.
use std::io::{BufRead as _, BufReader};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{IoContext as _, ModfsError, Result};

/// Replace `path` with `contents` via a temporary sibling and a rename, so
/// readers see either the old or the new file and never a partial one.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created or the
/// temporary file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ModfsError::invalid("file path", path.display().to_string(), "no parent"))?;
    std::fs::create_dir_all(parent).at(parent)?;
    let file_name = path
        .file_name()
        .ok_or_else(|| ModfsError::invalid("file path", path.display().to_string(), "no name"))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(format!(".{}.tmp", std::process::id()));
    let temp_path = parent.join(temp_name);
    std::fs::write(&temp_path, contents).at(&temp_path)?;
    if let Err(e) = std::fs::rename(&temp_path, path) {
        std::fs::remove_file(&temp_path).ok();
        return Err(ModfsError::io(path, e));
    }
    Ok(())
}

/// Compare two files byte for byte.
///
/// # Errors
///
/// Returns an error if either file cannot be opened or read.
pub fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    let len_a = std::fs::metadata(a).at(a)?.len();
    let len_b = std::fs::metadata(b).at(b)?.len();
    if len_a != len_b {
        return Ok(false);
    }
    let mut reader_a = BufReader::new(std::fs::File::open(a).at(a)?);
    let mut reader_b = BufReader::new(std::fs::File::open(b).at(b)?);
    loop {
        let (consumed, equal) = {
            let buf_a = reader_a.fill_buf().at(a)?;
            let buf_b = reader_b.fill_buf().at(b)?;
            if buf_a.is_empty() || buf_b.is_empty() {
                return Ok(buf_a.is_empty() && buf_b.is_empty());
            }
            let n = buf_a.len().min(buf_b.len());
            (n, buf_a.get(..n) == buf_b.get(..n))
        };
        if !equal {
            return Ok(false);
        }
        reader_a.consume(consumed);
        reader_b.consume(consumed);
    }
}

/// Identifier of the filesystem holding `path`.
///
/// # Errors
///
/// Returns an error if `path` cannot be stat'ed.
#[cfg(unix)]
pub fn device_id(path: &Path) -> Result<u64> {
    use std::os::unix::fs::MetadataExt as _;
    Ok(std::fs::metadata(path).at(path)?.dev())
}

/// Identifier of the filesystem holding `path`.
///
/// # Errors
///
/// Returns an error if `path` cannot be stat'ed.
#[cfg(not(unix))]
pub fn device_id(path: &Path) -> Result<u64> {
    std::fs::metadata(path).at(path)?;
    Ok(0)
}

/// Whether two existing paths live on the same filesystem.
///
/// # Errors
///
/// Returns an error if either path cannot be stat'ed.
pub fn same_filesystem(a: &Path, b: &Path) -> Result<bool> {
    Ok(device_id(a)? == device_id(b)?)
}

/// Recursively copy a directory tree.
///
/// Symlinks are recreated rather than followed, so a link cycle in `src`
/// cannot recurse forever. Entries that are neither files, directories nor
/// symlinks (sockets, fifos) are an error.
///
/// # Errors
///
/// Returns an error if the destination cannot be created or a source entry
/// cannot be read or copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    std::fs::create_dir_all(dst).at(dst)?;
    for entry in WalkDir::new(src).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            ModfsError::io(&path, e.into())
        })?;
        let from = entry.path();
        let Ok(rel) = from.strip_prefix(src) else {
            continue;
        };
        let to = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&to).at(&to)?;
        } else if file_type.is_symlink() {
            copy_symlink(from, &to)?;
        } else if file_type.is_file() {
            std::fs::copy(from, &to).at(from)?;
        } else {
            return Err(ModfsError::invalid(
                "file",
                from.display().to_string(),
                "only regular files, directories and symlinks can be copied",
            ));
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    let link = std::fs::read_link(from).at(from)?;
    std::os::unix::fs::symlink(link, to).at(to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> Result<()> {
    if from.is_file() {
        std::fs::copy(from, to).at(from)?;
    }
    Ok(())
}

/// Copy or move every entry of `src` into `dst`.
///
/// Moves rename where possible and fall back to copying. Source entries
/// that had to be copied are only deleted once every entry has arrived; on
/// failure renamed entries are moved back and partial copies removed, so
/// `src` is left as it was.
///
/// # Errors
///
/// Returns an error if any entry cannot be transferred.
pub fn transfer_dir_contents(src: &Path, dst: &Path, keep_source: bool) -> Result<()> {
    std::fs::create_dir_all(dst).at(dst)?;
    let mut entries: Vec<PathBuf> = std::fs::read_dir(src)
        .at(src)?
        .map(|e| e.map(|entry| entry.path()).at(src))
        .collect::<Result<_>>()?;
    entries.sort();

    let mut renamed: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut copied: Vec<(PathBuf, PathBuf)> = Vec::new();
    for from in entries {
        let Some(name) = from.file_name() else {
            continue;
        };
        let to = dst.join(name);
        if !keep_source && std::fs::rename(&from, &to).is_ok() {
            renamed.push((from, to));
            continue;
        }
        let existed = to.symlink_metadata().is_ok();
        if let Err(e) = copy_entry(&from, &to) {
            if !existed {
                remove_entry(&to).ok();
            }
            for (to, _) in &copied {
                remove_entry(to).ok();
            }
            for (from, to) in renamed.iter().rev() {
                if let Err(back) = std::fs::rename(to, from) {
                    tracing::warn!("could not restore {}: {back}", from.display());
                }
            }
            return Err(e);
        }
        copied.push((to, from));
    }

    if !keep_source {
        for (_, from) in &copied {
            remove_entry(from)?;
        }
    }
    Ok(())
}

fn copy_entry(from: &Path, to: &Path) -> Result<()> {
    let file_type = std::fs::symlink_metadata(from).at(from)?.file_type();
    if file_type.is_dir() {
        copy_dir_recursive(from, to)
    } else if file_type.is_symlink() {
        copy_symlink(from, to)
    } else if file_type.is_file() {
        std::fs::copy(from, to).at(from).map(|_| ())
    } else {
        Err(ModfsError::invalid(
            "file",
            from.display().to_string(),
            "only regular files, directories and symlinks can be copied",
        ))
    }
}

fn remove_entry(path: &Path) -> Result<()> {
    let Ok(meta) = std::fs::symlink_metadata(path) else {
        return Ok(());
    };
    if meta.is_dir() {
        std::fs::remove_dir_all(path).at(path)
    } else {
        std::fs::remove_file(path).at(path)
    }
}

/// Outcome of [`lowercase_tree`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenameReport {
    /// Entries renamed to their lower-case name.
    pub renamed: usize,
    /// Entries removed because an identical lower-case twin existed.
    pub deduplicated: usize,
    /// Entries left alone because a different lower-case twin existed.
    pub blocked: Vec<PathBuf>,
}

/// Rename every entry below `root` to its lower-case name.
///
/// An entry whose lower-case name is already taken is deleted when both are
/// identical files and reported in [`RenameReport::blocked`] otherwise.
/// Does nothing if `root` is not a directory.
///
/// # Errors
///
/// Returns an error if a directory cannot be read or an entry cannot be
/// renamed or removed.
pub fn lowercase_tree(root: &Path) -> Result<RenameReport> {
    let mut report = RenameReport::default();
    if root.is_dir() {
        lowercase_dir(root, &mut report)?;
    }
    Ok(report)
}

fn lowercase_dir(dir: &Path, report: &mut RenameReport) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .at(dir)?
        .map(|e| e.map(|entry| entry.path()).at(dir))
        .collect::<Result<_>>()?;
    entries.sort();

    for element in entries {
        let Some(name) = element.file_name().and_then(|n| n.to_str()) else {
            report.blocked.push(element.clone());
            continue;
        };
        let lower = name.to_lowercase();
        if lower == name {
            continue;
        }
        let target = dir.join(&lower);
        if target.symlink_metadata().is_ok() {
            if same_inode(&element, &target)? {
                continue;
            }
            if element.is_file() && target.is_file() && files_identical(&element, &target)? {
                std::fs::remove_file(&element).at(&element)?;
                report.deduplicated += 1;
            } else {
                report.blocked.push(element);
            }
            continue;
        }
        std::fs::rename(&element, &target).at(&element)?;
        report.renamed += 1;
    }

    for entry in std::fs::read_dir(dir).at(dir)? {
        let path = entry.at(dir)?.path();
        if path.is_dir() && !path.is_symlink() {
            lowercase_dir(&path, report)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn same_inode(a: &Path, b: &Path) -> Result<bool> {
    use std::os::unix::fs::MetadataExt as _;
    let ma = std::fs::symlink_metadata(a).at(a)?;
    let mb = std::fs::symlink_metadata(b).at(b)?;
    Ok(ma.dev() == mb.dev() && ma.ino() == mb.ino())
}

#[cfg(not(unix))]
fn same_inode(a: &Path, b: &Path) -> Result<bool> {
    let ca = std::fs::canonicalize(a).at(a)?;
    let cb = std::fs::canonicalize(b).at(b)?;
    Ok(ca == cb)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_contents() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/priority.txt");
        write_atomic(&path, "a\n").unwrap();
        write_atomic(&path, "b\nc\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "b\nc\n");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temporary file left behind");
    }

    #[test]
    fn identical_files_compare_equal() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let data = vec![7u8; 200_000];
        std::fs::write(&a, &data).unwrap();
        std::fs::write(&b, &data).unwrap();
        assert!(files_identical(&a, &b).unwrap());
    }

    #[test]
    fn one_byte_difference_is_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let mut data = vec![7u8; 100_000];
        std::fs::write(&a, &data).unwrap();
        if let Some(last) = data.last_mut() {
            *last = 8;
        }
        std::fs::write(&b, &data).unwrap();
        assert!(!files_identical(&a, &b).unwrap());
    }

    #[test]
    fn different_lengths_are_not_identical() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        std::fs::write(&a, b"abc").unwrap();
        std::fs::write(&b, b"abcd").unwrap();
        assert!(!files_identical(&a, &b).unwrap());
    }

    #[test]
    fn same_filesystem_for_siblings() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("x")).unwrap();
        std::fs::create_dir(tmp.path().join("y")).unwrap();
        assert!(same_filesystem(&tmp.path().join("x"), &tmp.path().join("y")).unwrap());
    }

    #[test]
    fn transfer_copies_and_keeps_source() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.esp"), b"a").unwrap();
        std::fs::create_dir(src.path().join("textures")).unwrap();
        std::fs::write(src.path().join("textures/rock.dds"), b"r").unwrap();

        transfer_dir_contents(src.path(), dst.path(), true).unwrap();

        assert!(src.path().join("a.esp").exists());
        assert_eq!(std::fs::read(dst.path().join("textures/rock.dds")).unwrap(), b"r");
    }

    #[test]
    fn transfer_moves_when_not_keeping_source() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("a.esp"), b"a").unwrap();

        transfer_dir_contents(src.path(), dst.path(), false).unwrap();

        assert!(!src.path().join("a.esp").exists());
        assert!(dst.path().join("a.esp").exists());
    }

    #[test]
    fn failed_move_puts_every_entry_back() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        for name in ["a.esp", "b.esp", "z.esp"] {
            std::fs::write(src.path().join(name), name).unwrap();
        }
        // A directory of the same name makes the last entry fail both ways.
        std::fs::create_dir_all(dst.path().join("z.esp/keep")).unwrap();

        assert!(transfer_dir_contents(src.path(), dst.path(), false).is_err());

        for name in ["a.esp", "b.esp", "z.esp"] {
            assert_eq!(
                std::fs::read_to_string(src.path().join(name)).unwrap(),
                name
            );
        }
        assert!(!dst.path().join("a.esp").exists());
        assert!(!dst.path().join("b.esp").exists());
        assert!(dst.path().join("z.esp/keep").is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn copy_keeps_symlinks_as_links() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("meshes")).unwrap();
        std::fs::write(src.path().join("meshes/rock.nif"), b"n").unwrap();
        std::os::unix::fs::symlink("..", src.path().join("meshes/loop")).unwrap();

        copy_dir_recursive(src.path(), &dst.path().join("out")).unwrap();

        let copied = dst.path().join("out/meshes/loop");
        assert!(copied.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(copied).unwrap(), PathBuf::from(".."));
        assert!(dst.path().join("out/meshes/rock.nif").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn copy_rejects_sockets() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let _listener = std::os::unix::net::UnixListener::bind(src.path().join("ipc.sock")).unwrap();
        assert!(copy_dir_recursive(src.path(), dst.path()).is_err());
    }

    #[test]
    fn lowercase_tree_renames_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::create_dir_all(root.join("Data/Textures")).unwrap();
        std::fs::write(root.join("Data/Textures/Rock.DDS"), b"rock").unwrap();

        let report = lowercase_tree(root).unwrap();

        assert!(root.join("data/textures/rock.dds").is_file());
        assert_eq!(report.renamed, 3);
        assert!(report.blocked.is_empty());
    }

    #[test]
    fn lowercase_tree_drops_identical_twins_and_reports_conflicts() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("readme.txt"), b"same").unwrap();
        std::fs::write(root.join("README.txt"), b"same").unwrap();
        std::fs::write(root.join("notes.txt"), b"one").unwrap();
        std::fs::write(root.join("Notes.txt"), b"two").unwrap();

        let report = lowercase_tree(root).unwrap();

        assert_eq!(report.deduplicated, 1);
        assert!(!root.join("README.txt").exists());
        assert!(root.join("readme.txt").exists());
        assert_eq!(report.blocked, vec![root.join("Notes.txt")]);
        assert_eq!(std::fs::read(root.join("notes.txt")).unwrap(), b"one");
        assert_eq!(std::fs::read(root.join("Notes.txt")).unwrap(), b"two");
    }

    #[test]
    fn lowercase_tree_ignores_missing_root() {
        let tmp = tempfile::tempdir().unwrap();
        let report = lowercase_tree(&tmp.path().join("missing")).unwrap();
        assert_eq!(report, RenameReport::default());
    }
}
