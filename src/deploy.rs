//! Composing the layer stack and driving the mount lifecycle.
//!
//! Layers are held lowest first: the deployment target is the bottom layer,
//! followed by the active mods in priority order. Mount tools that expect
//! the topmost layer first get the reversed list from
//! [`MountPlan::lowerdir_option`].
use std::path::PathBuf;

use crate::config::{InstanceSetting, InstanceSettings};
use crate::error::{IoContext as _, ModfsError, Result};
use crate::instance::Instance;
use crate::mods::{ActiveMod, active_mods};
use crate::mount::MountOps;
use crate::priority::PriorityList;

/// Everything the mount tool needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPlan {
    /// Directory the merged view is mounted on.
    pub target: PathBuf,
    /// Read-only layers, lowest first; `lower_dirs[0]` is the target.
    pub lower_dirs: Vec<PathBuf>,
    /// Writable layer receiving modified files.
    pub upper_dir: PathBuf,
    /// Scratch directory on the target's filesystem.
    pub work_dir: PathBuf,
    /// Mods contributing a layer, lowest first.
    pub mods: Vec<ActiveMod>,
}

impl MountPlan {
    /// `lowerdir=` value: layers joined by `:`, topmost first.
    ///
    /// # Errors
    ///
    /// Returns [`ModfsError::InvalidFormat`] if a layer path contains `:`
    /// or `,`, which the option syntax cannot express.
    pub fn lowerdir_option(&self) -> Result<String> {
        let mut parts = Vec::with_capacity(self.lower_dirs.len());
        for dir in self.lower_dirs.iter().rev() {
            let text = dir.display().to_string();
            if text.contains([':', ',']) {
                return Err(ModfsError::invalid(
                    "layer path",
                    text,
                    "paths handed to fuse-overlayfs may not contain ':' or ','",
                ));
            }
            parts.push(text);
        }
        Ok(parts.join(":"))
    }
}

/// Whether the merged view is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// No deployment target is configured.
    Unconfigured,
    /// Mounted on the given target.
    Active(PathBuf),
    /// Not mounted; the given target is configured.
    Inactive(PathBuf),
}

/// The configured deployment target.
///
/// # Errors
///
/// Returns [`ModfsError::EnvironmentViolation`] when no target is
/// configured, and [`ModfsError::CorruptConfig`] when the stored value is
/// invalid.
pub fn target_dir(instance: &Instance) -> Result<PathBuf> {
    InstanceSettings::new(instance)
        .path(InstanceSetting::DeploymentTargetDir)?
        .ok_or_else(|| {
            ModfsError::EnvironmentViolation(
                "no deployment directory is configured for this instance; run `modfs init` \
                 or `modfs config set deploymentTargetDir <dir>`"
                    .to_string(),
            )
        })
}

fn get_or_create(settings: &InstanceSettings, setting: InstanceSetting) -> Result<PathBuf> {
    let dir = settings.path(setting)?.ok_or_else(|| {
        ModfsError::EnvironmentViolation(format!("{} is not configured", setting.key()))
    })?;
    std::fs::create_dir_all(&dir).at(&dir)?;
    Ok(dir)
}

/// Build the mount plan for the current state of `instance`.
///
/// Creates the overflow and work directories when missing.
///
/// # Errors
///
/// Returns [`ModfsError::EnvironmentViolation`] if no target is configured
/// or the work directory is on another filesystem than the target, and
/// propagates configuration and I/O errors.
pub fn compose(instance: &Instance, today: &str, ops: &dyn MountOps) -> Result<MountPlan> {
    let target = target_dir(instance)?;
    let priority = PriorityList::load(instance)?;
    let mods = active_mods(instance, &priority, today)?;

    let settings = InstanceSettings::new(instance);
    let upper_dir = get_or_create(&settings, InstanceSetting::DeploymentOverflowDir)?;
    let work_dir = get_or_create(&settings, InstanceSetting::DeploymentWorkDir)?;
    if !ops.same_filesystem(&target, &work_dir)? {
        return Err(ModfsError::EnvironmentViolation(format!(
            "work directory {} must be on the same filesystem as the target {}",
            work_dir.display(),
            target.display()
        )));
    }

    let mut lower_dirs = Vec::with_capacity(mods.len() + 1);
    lower_dirs.push(target.clone());
    lower_dirs.extend(mods.iter().map(|m| m.dir.clone()));
    Ok(MountPlan {
        target,
        lower_dirs,
        upper_dir,
        work_dir,
        mods,
    })
}

/// Mount the merged view.
///
/// # Errors
///
/// Returns [`ModfsError::EnvironmentViolation`] if something is already
/// mounted on the target, plus everything [`compose`] and the mount tool
/// can return.
pub fn activate(instance: &Instance, today: &str, ops: &dyn MountOps) -> Result<MountPlan> {
    let target = target_dir(instance)?;
    if ops.is_mounted(&target)? {
        return Err(ModfsError::EnvironmentViolation(format!(
            "something is already mounted at {}",
            target.display()
        )));
    }
    let plan = compose(instance, today, ops)?;
    ops.mount(&plan)?;
    Ok(plan)
}

/// Unmount the merged view, returning the target.
///
/// # Errors
///
/// Returns [`ModfsError::EnvironmentViolation`] if nothing is mounted.
pub fn deactivate(instance: &Instance, ops: &dyn MountOps) -> Result<PathBuf> {
    let target = target_dir(instance)?;
    if !ops.is_mounted(&target)? {
        return Err(ModfsError::EnvironmentViolation(format!(
            "no modfs filesystem is mounted at {}",
            target.display()
        )));
    }
    ops.unmount(&target)?;
    Ok(target)
}

/// Report whether the merged view is mounted.
///
/// # Errors
///
/// Propagates configuration errors and failures to read the mount table.
pub fn status(instance: &Instance, ops: &dyn MountOps) -> Result<Status> {
    let Some(target) =
        InstanceSettings::new(instance).path(InstanceSetting::DeploymentTargetDir)?
    else {
        return Ok(Status::Unconfigured);
    };
    Ok(if ops.is_mounted(&target)? {
        Status::Active(target)
    } else {
        Status::Inactive(target)
    })
}

/// Fail if the merged view of `instance` is mounted.
///
/// Used by commands that must not change layers underneath a live mount.
///
/// # Errors
///
/// Returns [`ModfsError::EnvironmentViolation`] while mounted.
pub fn ensure_inactive(instance: &Instance, ops: &dyn MountOps, action: &str) -> Result<()> {
    if let Status::Active(target) = status(instance, ops)? {
        return Err(ModfsError::EnvironmentViolation(format!(
            "cannot {action} while the filesystem is mounted at {}",
            target.display()
        )));
    }
    Ok(())
}

/// Render the layer list for display, topmost first, with instance paths
/// shortened.
#[must_use]
pub fn describe_layers(instance: &Instance, plan: &MountPlan) -> Vec<String> {
    plan.lower_dirs
        .iter()
        .rev()
        .map(|p| instance.display_path(p))
        .collect()
}
