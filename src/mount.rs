//! Union-mount invocation behind a trait seam.
//!
//! [`SystemMountOps`] runs `fuse-overlayfs` and `fusermount3` and reads
//! `/proc/self/mounts`; tests use `MockMountOps`.
use std::path::{Path, PathBuf};

use crate::deploy::MountPlan;
use crate::error::{IoContext as _, Result};
use crate::exec;

/// Filesystem type reported for mounts made by `fuse-overlayfs`.
pub const OVERLAY_FS_TYPE: &str = "fuse.fuse-overlayfs";

const MOUNT_TABLE: &str = "/proc/self/mounts";

/// Operations on the union mount.
pub trait MountOps: std::fmt::Debug {
    /// Whether a `fuse-overlayfs` mount sits on `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount table cannot be read.
    fn is_mounted(&self, target: &Path) -> Result<bool>;

    /// Mount `plan`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount tool is missing or fails.
    fn mount(&self, plan: &MountPlan) -> Result<()>;

    /// Unmount whatever is mounted on `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the unmount tool is missing or fails.
    fn unmount(&self, target: &Path) -> Result<()>;

    /// Whether two existing paths are on the same filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if either path cannot be stat'ed.
    fn same_filesystem(&self, a: &Path, b: &Path) -> Result<bool>;
}

/// One line of the kernel mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount source.
    pub source: String,
    /// Mount point.
    pub mount_point: PathBuf,
    /// Filesystem type.
    pub fs_type: String,
}

/// Decode the octal escapes (`\040` and friends) the kernel uses in mount
/// table fields.
#[must_use]
pub fn unescape_mount_field(field: &str) -> String {
    let mut out = Vec::with_capacity(field.len());
    let mut rest = field.as_bytes();
    while let Some((&first, tail)) = rest.split_first() {
        if first == b'\\'
            && let Some((oct, after)) = tail.split_first_chunk::<3>()
            && oct.iter().all(|b| (b'0'..=b'7').contains(b))
            && let Ok(byte) =
                u8::try_from(oct.iter().fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0')))
        {
            out.push(byte);
            rest = after;
            continue;
        }
        out.push(first);
        rest = tail;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse the text of `/proc/self/mounts`. Malformed lines are skipped.
#[must_use]
pub fn parse_mount_table(text: &str) -> Vec<MountEntry> {
    text.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let source = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                source: unescape_mount_field(source),
                mount_point: PathBuf::from(unescape_mount_field(mount_point)),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

/// Arguments for `fuse-overlayfs` realising `plan`.
///
/// # Errors
///
/// Returns an error if a layer path cannot be expressed in the option
/// syntax.
pub fn overlay_args(plan: &MountPlan) -> Result<Vec<String>> {
    let mut args = Vec::new();
    for opt in ["volatile", "noacl", "nodev", "nosuid", "noatime"] {
        args.push("-o".to_string());
        args.push(opt.to_string());
    }
    args.push("-o".to_string());
    args.push(format!("lowerdir={}", plan.lowerdir_option()?));
    args.push("-o".to_string());
    args.push(format!("workdir={}", plan.work_dir.display()));
    args.push("-o".to_string());
    args.push(format!("upperdir={}", plan.upper_dir.display()));
    args.push(plan.target.display().to_string());
    Ok(args)
}

/// Production [`MountOps`] backed by `fuse-overlayfs` and `fusermount3`.
#[derive(Debug, Default)]
pub struct SystemMountOps;

impl MountOps for SystemMountOps {
    fn is_mounted(&self, target: &Path) -> Result<bool> {
        let target = std::fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
        let table = std::fs::read_to_string(MOUNT_TABLE).at(Path::new(MOUNT_TABLE))?;
        Ok(parse_mount_table(&table)
            .iter()
            .any(|m| m.fs_type == OVERLAY_FS_TYPE && m.mount_point == target))
    }

    fn mount(&self, plan: &MountPlan) -> Result<()> {
        let args = overlay_args(plan)?;
        exec::require("fuse-overlayfs")?;
        tracing::info!(
            target: "modfs::exec",
            "fuse-overlayfs ... {}",
            plan.target.display()
        );
        tracing::debug!("fuse-overlayfs {}", args.join(" "));
        exec::run("fuse-overlayfs", &args)?;
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        let target = std::fs::canonicalize(target).at(target)?;
        exec::require("fusermount3")?;
        let args = [String::from("-u"), target.display().to_string()];
        tracing::info!(target: "modfs::exec", "fusermount3 {}", args.join(" "));
        exec::run("fusermount3", &args)?;
        Ok(())
    }

    fn same_filesystem(&self, a: &Path, b: &Path) -> Result<bool> {
        crate::fs::same_filesystem(a, b)
    }
}

/// Recording [`MountOps`] for unit tests.
///
/// Tracks mounted targets in memory; `same_filesystem` answers with the
/// configured value (default `true`).
#[cfg(test)]
#[derive(Debug)]
pub struct MockMountOps {
    same_fs: bool,
    mounted: std::sync::Mutex<std::collections::HashSet<PathBuf>>,
    plans: std::sync::Mutex<Vec<MountPlan>>,
}

#[cfg(test)]
impl Default for MockMountOps {
    fn default() -> Self {
        Self {
            same_fs: true,
            mounted: std::sync::Mutex::default(),
            plans: std::sync::Mutex::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MockMountOps {
    /// Create a mock with nothing mounted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `same_filesystem` with `same`.
    #[must_use]
    pub const fn with_same_filesystem(mut self, same: bool) -> Self {
        self.same_fs = same;
        self
    }

    /// Pretend `target` is already mounted.
    #[must_use]
    pub fn with_mounted(self, target: impl Into<PathBuf>) -> Self {
        self.mounted
            .lock()
            .expect("mock mount set poisoned")
            .insert(target.into());
        self
    }

    /// Every plan passed to [`MountOps::mount`], in call order.
    pub fn mounted_plans(&self) -> Vec<MountPlan> {
        self.plans.lock().expect("mock plan list poisoned").clone()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
impl MountOps for MockMountOps {
    fn is_mounted(&self, target: &Path) -> Result<bool> {
        Ok(self
            .mounted
            .lock()
            .expect("mock mount set poisoned")
            .contains(target))
    }

    fn mount(&self, plan: &MountPlan) -> Result<()> {
        overlay_args(plan)?;
        self.mounted
            .lock()
            .expect("mock mount set poisoned")
            .insert(plan.target.clone());
        self.plans
            .lock()
            .expect("mock plan list poisoned")
            .push(plan.clone());
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        self.mounted
            .lock()
            .expect("mock mount set poisoned")
            .remove(target);
        Ok(())
    }

    fn same_filesystem(&self, _a: &Path, _b: &Path) -> Result<bool> {
        Ok(self.same_fs)
    }
}
