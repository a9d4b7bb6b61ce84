// Shared helpers for integration tests.
//
// Provides a temporary-directory-backed modfs instance, a fluent builder for
// populating its version store, and an in-memory `MountOps` so deployment
// can be exercised without fuse-overlayfs.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use modfs_cli::config::{InstanceSetting, InstanceSettings, ModConfig, ModSetting};
use modfs_cli::deploy::MountPlan;
use modfs_cli::error::Result;
use modfs_cli::instance::Instance;
use modfs_cli::mods::ModId;
use modfs_cli::mount::MountOps;

/// Parse a mod id that is known to be valid.
pub fn id(raw: &str) -> ModId {
    ModId::parse(raw).expect("valid mod id")
}

/// An isolated instance backed by a [`tempfile::TempDir`].
///
/// Holds an initialised settings directory and a `game/` target directory.
pub struct InstanceFixture {
    /// Temporary directory holding the instance.
    pub root: tempfile::TempDir,
    /// The opened instance.
    pub instance: Instance,
}

impl InstanceFixture {
    /// Create an initialised instance with a configured, empty target.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        let instance = Instance::open(root.path()).expect("open instance");
        let settings = InstanceSettings::new(&instance);
        settings.initialize().expect("initialise settings");
        std::fs::create_dir_all(instance.mods_dir()).expect("create mods dir");
        let game = root.path().join("game");
        std::fs::create_dir_all(&game).expect("create target dir");
        settings
            .set_text(
                InstanceSetting::DeploymentTargetDir,
                game.to_str().expect("utf-8 temp path"),
            )
            .expect("store target dir");
        Self { root, instance }
    }

    /// The deployment target directory.
    pub fn target(&self) -> PathBuf {
        self.instance.root().join("game")
    }

    /// Absolute path of `rel` inside the instance.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.instance.root().join(rel)
    }

    /// Every path below `mods/`, relative to the instance root, sorted.
    pub fn mods_tree(&self) -> Vec<PathBuf> {
        let root = self.instance.root();
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(self.instance.mods_dir())
            .into_iter()
            .map(|e| e.expect("walk mods dir").path().to_path_buf())
            .map(|p| p.strip_prefix(root).expect("inside instance").to_path_buf())
            .collect();
        paths.sort();
        paths
    }

    /// Lines of `priority.txt`, or nothing when it does not exist.
    pub fn priority_lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.instance.priority_file())
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// Fluent builder for [`InstanceFixture`].
///
/// Lets individual tests lay out mod versions and configuration before the
/// fixture is handed over.
pub struct InstanceBuilder {
    fixture: InstanceFixture,
}

impl InstanceBuilder {
    /// Begin building a new initialised instance.
    pub fn new() -> Self {
        Self {
            fixture: InstanceFixture::new(),
        }
    }

    /// Create the version directory `mods/<mod_id>/<version>`.
    #[must_use]
    pub fn with_version(self, mod_id: &str, version: &str) -> Self {
        let dir = self.fixture.path(&format!("mods/{mod_id}/{version}"));
        std::fs::create_dir_all(dir).expect("create version dir");
        self
    }

    /// Write `content` to `rel` inside version `version` of `mod_id`.
    #[must_use]
    pub fn with_file(self, mod_id: &str, version: &str, rel: &str, content: &str) -> Self {
        let path = self.fixture.path(&format!("mods/{mod_id}/{version}/{rel}"));
        std::fs::create_dir_all(path.parent().expect("file has a parent")).expect("create dirs");
        std::fs::write(path, content).expect("write mod file");
        self
    }

    /// Store `value` for `setting` in the configuration of `mod_id`.
    #[must_use]
    pub fn with_setting(self, mod_id: &str, setting: ModSetting, value: &str) -> Self {
        let mut config = ModConfig::open(&self.fixture.instance, &id(mod_id)).expect("open config");
        config.set_text(setting, value).expect("set mod setting");
        config.save().expect("save mod config");
        self
    }

    /// Write `priority.txt` verbatim.
    #[must_use]
    pub fn with_priority_file(self, content: &str) -> Self {
        std::fs::write(self.fixture.instance.priority_file(), content)
            .expect("write priority file");
        self
    }

    /// Finalise the builder.
    pub fn build(self) -> InstanceFixture {
        self.fixture
    }
}

/// In-memory [`MountOps`] that records every mount.
#[derive(Debug, Default)]
pub struct RecordingMountOps {
    mounted: Mutex<HashSet<PathBuf>>,
    plans: Mutex<Vec<MountPlan>>,
}

impl RecordingMountOps {
    /// Plans passed to [`MountOps::mount`], in call order.
    pub fn plans(&self) -> Vec<MountPlan> {
        self.plans.lock().expect("plan list").clone()
    }
}

impl MountOps for RecordingMountOps {
    fn is_mounted(&self, target: &Path) -> Result<bool> {
        Ok(self.mounted.lock().expect("mount set").contains(target))
    }

    fn mount(&self, plan: &MountPlan) -> Result<()> {
        plan.lowerdir_option()?;
        self.mounted
            .lock()
            .expect("mount set")
            .insert(plan.target.clone());
        self.plans.lock().expect("plan list").push(plan.clone());
        Ok(())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        self.mounted.lock().expect("mount set").remove(target);
        Ok(())
    }

    fn same_filesystem(&self, _a: &Path, _b: &Path) -> Result<bool> {
        Ok(true)
    }
}
