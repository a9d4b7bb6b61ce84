//! Command: set up a new instance.
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result, bail};

use crate::cli::{GlobalOpts, InitOpts};
use crate::commands::resolve_instance;
use crate::config::{InstanceSetting, InstanceSettings};
use crate::error::ModfsError;
use crate::fs::lowercase_tree;
use crate::instance::Instance;
use crate::logging::Logger;
use crate::mount::{MountOps, SystemMountOps};
use crate::priority::PriorityList;

/// Run the init command.
///
/// # Errors
///
/// Returns an error if a directory is missing, the work directory is on
/// another filesystem than the target, or the instance cannot be written.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &InitOpts, log: &Logger) -> Result<()> {
    let instance = resolve_instance(global)?;
    init(&instance, opts, &SystemMountOps, log)?;
    println!("Initialised modfs instance in {}", instance.root().display());
    Ok(())
}

fn existing_dir(path: &Path, what: &str) -> Result<PathBuf> {
    if !path.is_dir() {
        bail!("{what} {} is not an existing directory", path.display());
    }
    std::fs::canonicalize(path).with_context(|| format!("resolving {}", path.display()))
}

fn dir_or_default(
    instance: &Instance,
    given: Option<&Path>,
    default: &str,
    what: &str,
) -> Result<PathBuf> {
    match given {
        Some(path) => existing_dir(path, what),
        None => {
            let dir = instance.root().join(default);
            std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
            Ok(dir)
        }
    }
}

/// Create the instance layout and store the deployment directories.
///
/// Everything is validated before the first write.
///
/// # Errors
///
/// See [`run`].
pub fn init(instance: &Instance, opts: &InitOpts, ops: &dyn MountOps, log: &Logger) -> Result<()> {
    log.stage("Checking directories");
    let target = existing_dir(&opts.target, "target")?;
    let overflow = dir_or_default(instance, opts.overflow.as_deref(), "modifiedfiles", "overflow")?;
    let work = dir_or_default(instance, opts.workdir.as_deref(), "working_cache", "work")?;
    if !ops.same_filesystem(&target, &work)? {
        return Err(ModfsError::EnvironmentViolation(format!(
            "work directory {} must be on the same filesystem as the target {}",
            work.display(),
            target.display()
        ))
        .into());
    }

    log.stage("Creating instance layout");
    let settings = InstanceSettings::new(instance);
    settings.initialize()?;
    let mods_dir = instance.mods_dir();
    std::fs::create_dir_all(&mods_dir)
        .with_context(|| format!("creating {}", mods_dir.display()))?;
    PriorityList::load(instance)?.save(instance)?;

    for (setting, dir) in [
        (InstanceSetting::DeploymentTargetDir, &target),
        (InstanceSetting::DeploymentOverflowDir, &overflow),
        (InstanceSetting::DeploymentWorkDir, &work),
    ] {
        settings.set_text(setting, &dir.display().to_string())?;
        if let Some(stored) = settings.stored(setting)? {
            log.info(&format!("{} = {stored}", setting.key()));
        }
    }

    log.stage("Lower-casing target files");
    let report = lowercase_tree(&target)?;
    for blocked in &report.blocked {
        log.warn(&format!(
            "{} was not lower-cased: another file already uses that name",
            blocked.display()
        ));
    }
    log.info(&format!("renamed {} file name(s)", report.renamed));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{InstancePath, SettingValue};
    use crate::logging::isolated_logger;
    use crate::mount::MockMountOps;

    fn opts(target: &Path) -> InitOpts {
        InitOpts {
            target: target.to_path_buf(),
            overflow: None,
            workdir: None,
        }
    }

    #[test]
    fn creates_layout_and_stores_relative_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let game = tmp.path().join("game");
        std::fs::create_dir_all(game.join("Data")).unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let (log, _log_tmp, _guard) = isolated_logger();

        init(&instance, &opts(&game), &MockMountOps::new(), &log).unwrap();

        assert!(instance.is_initialized());
        assert!(instance.mods_dir().is_dir());
        assert!(instance.priority_file().is_file());
        assert!(game.join("data").is_dir());
        let settings = InstanceSettings::new(&instance);
        assert_eq!(
            settings.get(InstanceSetting::DeploymentWorkDir).unwrap(),
            Some(SettingValue::Path(InstancePath::Relative(PathBuf::from(
                "working_cache"
            ))))
        );
        assert_eq!(
            settings.path(InstanceSetting::DeploymentTargetDir).unwrap(),
            Some(instance.root().join("game"))
        );
    }

    #[test]
    fn cross_filesystem_work_dir_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let game = tmp.path().join("game");
        std::fs::create_dir_all(&game).unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let (log, _log_tmp, _guard) = isolated_logger();

        let ops = MockMountOps::new().with_same_filesystem(false);
        let err = init(&instance, &opts(&game), &ops, &log).unwrap_err();
        assert!(err.to_string().contains("same filesystem"));
        assert!(!instance.is_initialized());
    }

    #[test]
    fn missing_target_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        let (log, _log_tmp, _guard) = isolated_logger();
        let err = init(&instance, &opts(&tmp.path().join("nope")), &MockMountOps::new(), &log)
            .unwrap_err();
        assert!(err.to_string().contains("not an existing directory"));
    }
}
