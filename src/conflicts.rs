//! Cross-mod file collision analysis.
//!
//! Two active mods conflict on a relative path when both ship a regular file
//! there and the copies differ. Paths where every copy is byte-identical are
//! not reported.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{ModfsError, Result};
use crate::fs::files_identical;
use crate::mods::ModId;
use crate::mods::active::ActiveMod;

/// Contributor set → relative paths they all ship with differing content.
pub type ConflictSet = BTreeMap<BTreeSet<ModId>, BTreeSet<PathBuf>>;

/// Regular files below `root`, relative to it. Symlinks are not followed.
///
/// # Errors
///
/// Returns an error if part of the tree cannot be read.
pub fn relative_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            ModfsError::io(&path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(root) {
            files.push(rel.to_path_buf());
        }
    }
    Ok(files)
}

/// Find conflicting files among `mods`.
///
/// # Errors
///
/// Returns an error if a mod tree or one of the compared files cannot be
/// read.
pub fn find_conflicts(mods: &[ActiveMod]) -> Result<ConflictSet> {
    let mut owners: BTreeMap<PathBuf, Vec<&ActiveMod>> = BTreeMap::new();
    for m in mods {
        for rel in relative_files(&m.dir)? {
            owners.entry(rel).or_default().push(m);
        }
    }

    let mut conflicts = ConflictSet::new();
    for (rel, contributors) in owners {
        let [first, rest @ ..] = contributors.as_slice() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let reference = first.dir.join(&rel);
        let mut all_identical = true;
        for other in rest {
            if !files_identical(&reference, &other.dir.join(&rel))? {
                all_identical = false;
                break;
            }
        }
        if all_identical {
            tracing::debug!("{} is identical in every mod shipping it", rel.display());
            continue;
        }
        let ids: BTreeSet<ModId> = contributors.iter().map(|m| m.id.clone()).collect();
        conflicts.entry(ids).or_default().insert(rel);
    }
    Ok(conflicts)
}
