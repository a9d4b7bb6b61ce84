//! Resolving which mods take part in a deployment.
use std::path::PathBuf;

use crate::config::ModConfig;
use crate::error::Result;
use crate::instance::Instance;
use crate::priority::PriorityList;

use super::store::{resolve_active_version, version_dir};
use super::{ModId, Version};

/// A mod that contributes a layer: enabled, with a version directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMod {
    /// Mod id.
    pub id: ModId,
    /// Selected version.
    pub version: Version,
    /// Directory of the selected version.
    pub dir: PathBuf,
}

/// Why a listed mod does not contribute a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Skipped {
    /// `enabled` is false.
    Disabled,
    /// `latest` was selected but there are no versions.
    NoVersion,
    /// The selected version has no directory.
    MissingVersion(Version),
}

/// Resolve one mod.
///
/// # Errors
///
/// Returns an error if the mod's configuration cannot be read.
pub fn resolve(
    instance: &Instance,
    id: &ModId,
    today: &str,
) -> Result<std::result::Result<ActiveMod, Skipped>> {
    if !ModConfig::open(instance, id)?.enabled()? {
        return Ok(Err(Skipped::Disabled));
    }
    let Some(version) = resolve_active_version(instance, id, today)? else {
        return Ok(Err(Skipped::NoVersion));
    };
    let dir = version_dir(instance, id, &version);
    if !dir.is_dir() {
        return Ok(Err(Skipped::MissingVersion(version)));
    }
    Ok(Ok(ActiveMod {
        id: id.clone(),
        version,
        dir,
    }))
}

/// Active mods in priority order, lowest first. Skipped mods are logged at
/// debug level.
///
/// # Errors
///
/// Returns an error if a mod's configuration cannot be read.
pub fn active_mods(
    instance: &Instance,
    priority: &PriorityList,
    today: &str,
) -> Result<Vec<ActiveMod>> {
    let mut active = Vec::new();
    for id in priority.iter() {
        match resolve(instance, id, today)? {
            Ok(m) => active.push(m),
            Err(Skipped::Disabled) => tracing::debug!("skipping '{id}': disabled"),
            Err(Skipped::NoVersion) => tracing::debug!("skipping '{id}': no versions"),
            Err(Skipped::MissingVersion(v)) => {
                tracing::debug!("skipping '{id}': version {v} does not exist");
            }
        }
    }
    Ok(active)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn skips_disabled_empty_and_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let mods = tmp.path().join("mods");
        for d in ["on/2024-01-01/00", "off/2024-01-01/00", "empty", "pinned/2024-01-01/00"] {
            std::fs::create_dir_all(mods.join(d)).unwrap();
        }
        std::fs::write(mods.join("off.json"), r#"{"enabled": false}"#).unwrap();
        std::fs::write(
            mods.join("pinned.json"),
            r#"{"use_mod_version": "2023-01-01/00"}"#,
        )
        .unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let priority = PriorityList::load(&instance).unwrap();

        let active = active_mods(&instance, &priority, "2024-06-01").unwrap();
        let ids: Vec<&str> = active.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["on"]);
        assert_eq!(active[0].dir, instance.root().join("mods/on/2024-01-01/00"));

        let pinned = ModId::parse("pinned").unwrap();
        assert_eq!(
            resolve(&instance, &pinned, "2024-06-01").unwrap(),
            Err(Skipped::MissingVersion(Version::new("2023-01-01", 0)))
        );
    }
}
