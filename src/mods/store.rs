//! Enumerating, resolving and allocating versions of a mod on disk.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::ModConfig;
use crate::error::{IoContext as _, ModfsError, Result};
use crate::instance::Instance;

use super::ModId;
use super::version::{MAX_SUBVERSION, Version, VersionTag, subversion_number};

/// Date bucket → subversion directory names.
pub type VersionMap = BTreeMap<String, BTreeSet<String>>;

fn subdirectories(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).at(dir)? {
        let entry = entry.at(dir)?;
        if entry.path().is_dir() && let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Every version directory of `mod_id`, two levels deep.
///
/// Plain files at either level are ignored; a date directory without
/// subversions is kept as an empty bucket.
///
/// # Errors
///
/// Returns [`ModfsError::NotFound`] if the mod does not exist.
pub fn list_versions(instance: &Instance, mod_id: &ModId) -> Result<VersionMap> {
    instance.existing_mod(mod_id)?;
    let mod_dir = instance.mod_dir(mod_id);
    let mut map = VersionMap::new();
    for date in subdirectories(&mod_dir)? {
        let subs = subdirectories(&mod_dir.join(&date))?;
        map.insert(date, subs.into_iter().collect());
    }
    Ok(map)
}

/// The newest version of `mod_id`, ignoring empty date buckets.
///
/// # Errors
///
/// Returns [`ModfsError::NotFound`] if the mod does not exist.
pub fn latest_version(instance: &Instance, mod_id: &ModId) -> Result<Option<Version>> {
    let versions = list_versions(instance, mod_id)?;
    Ok(latest_in(&versions))
}

pub(crate) fn latest_in(versions: &VersionMap) -> Option<Version> {
    versions
        .iter()
        .rev()
        .find_map(|(date, subs)| subs.last().map(|sub| Version::from_parts(date, sub)))
}

/// The version the mod's configuration selects.
///
/// `None` means `latest` was selected and the mod has no versions. A pinned
/// version is returned even when its directory is missing; callers that
/// mount it check [`version_exists`].
///
/// # Errors
///
/// Returns [`ModfsError::NotFound`] if the mod does not exist and
/// [`ModfsError::CorruptConfig`] if its configuration is invalid.
pub fn resolve_active_version(
    instance: &Instance,
    mod_id: &ModId,
    today: &str,
) -> Result<Option<Version>> {
    let config = ModConfig::open(instance, mod_id)?;
    match config.version_tag()? {
        VersionTag::Latest => latest_version(instance, mod_id),
        tag => Ok(tag.resolve_fixed(today)),
    }
}

/// Whether `date` already holds subversion 99 (or beyond) for `mod_id`.
///
/// A mod that does not exist has room.
///
/// # Errors
///
/// Returns an error if the date directory exists but cannot be read.
pub fn is_at_version_limit(instance: &Instance, mod_id: &ModId, date: &str) -> Result<bool> {
    let date_dir = instance.mod_dir(mod_id).join(date);
    if !date_dir.is_dir() {
        return Ok(false);
    }
    Ok(subdirectories(&date_dir)?
        .iter()
        .filter_map(|s| subversion_number(s))
        .any(|n| n >= MAX_SUBVERSION))
}

/// Directory holding the payload of `version`.
#[must_use]
pub fn version_dir(instance: &Instance, mod_id: &ModId, version: &Version) -> PathBuf {
    instance
        .mod_dir(mod_id)
        .join(&version.date)
        .join(&version.subversion)
}

/// Whether the directory of `version` exists.
#[must_use]
pub fn version_exists(instance: &Instance, mod_id: &ModId, version: &Version) -> bool {
    version_dir(instance, mod_id, version).is_dir()
}

/// Create the next version directory of `mod_id` for `today`.
///
/// The mod directory is created if needed. The first version of a day is
/// `00`; later ones continue after the highest numeric subversion.
///
/// # Errors
///
/// Returns [`ModfsError::ResourceExhausted`] without touching the disk when
/// `today` is full, or an I/O error if the directory cannot be created.
pub fn allocate_version(instance: &Instance, mod_id: &ModId, today: &str) -> Result<Version> {
    if is_at_version_limit(instance, mod_id, today)? {
        return Err(ModfsError::ResourceExhausted {
            mod_id: mod_id.to_string(),
            date: today.to_string(),
        });
    }
    let date_dir = instance.mod_dir(mod_id).join(today);
    let next = if date_dir.is_dir() {
        subdirectories(&date_dir)?
            .iter()
            .filter_map(|s| subversion_number(s))
            .max()
            .map_or(0, |n| n + 1)
    } else {
        0
    };
    let version = Version::new(today, next);
    let dir = version_dir(instance, mod_id, &version);
    std::fs::create_dir_all(&dir).at(&dir)?;
    Ok(version)
}
