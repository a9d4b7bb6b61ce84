//! Command: change the priority of a mod.
use anyhow::Result;

use crate::cli::{GlobalOpts, ReorderOpts};
use crate::commands::CommandSetup;
use crate::deploy::ensure_inactive;
use crate::instance::Instance;
use crate::logging::Logger;
use crate::mods::ModId;
use crate::mount::{MountOps, SystemMountOps};
use crate::priority::PriorityList;

/// Run the reorder command.
///
/// # Errors
///
/// Returns an error while the filesystem is mounted, or if either mod is
/// not in the priority list.
pub fn run(global: &GlobalOpts, opts: &ReorderOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    reorder(&setup.instance, opts, &SystemMountOps, log)
}

/// Apply `opts` to the priority list of `instance` and save it.
///
/// # Errors
///
/// See [`run`].
pub fn reorder(
    instance: &Instance,
    opts: &ReorderOpts,
    ops: &dyn MountOps,
    log: &Logger,
) -> Result<()> {
    ensure_inactive(instance, ops, "reorder mods")?;

    let id = ModId::parse(&opts.mod_id)?;
    let mut priority = PriorityList::load(instance)?;
    if let Some(reference) = &opts.before {
        priority.move_before(&id, &ModId::parse(reference)?)?;
    } else if let Some(reference) = &opts.after {
        priority.move_after(&id, &ModId::parse(reference)?)?;
    } else if opts.highest {
        priority.move_to_back(&id)?;
    } else if opts.lowest {
        priority.move_to_front(&id)?;
    }
    priority.save(instance)?;

    if let Some(pos) = priority.position(&id) {
        log.info(&format!(
            "{id} is now at position {} of {}",
            pos + 1,
            priority.len()
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{InstanceSetting, InstanceSettings};
    use crate::logging::isolated_logger;
    use crate::mount::MockMountOps;

    fn instance(ids: &[&str]) -> (tempfile::TempDir, Instance) {
        let tmp = tempfile::tempdir().unwrap();
        for id in ids {
            std::fs::create_dir_all(tmp.path().join("mods").join(id)).unwrap();
        }
        std::fs::create_dir_all(tmp.path().join(".modfs")).unwrap();
        let instance = Instance::open(tmp.path()).unwrap();
        (tmp, instance)
    }

    fn opts(id: &str) -> ReorderOpts {
        ReorderOpts {
            mod_id: id.to_string(),
            before: None,
            after: None,
            highest: false,
            lowest: false,
        }
    }

    fn order(instance: &Instance) -> Vec<String> {
        PriorityList::load(instance)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn highest_and_lowest() {
        let (_tmp, instance) = instance(&["a", "b", "c"]);
        let (log, _log_tmp, _guard) = isolated_logger();
        let ops = MockMountOps::new();

        let mut o = opts("a");
        o.highest = true;
        reorder(&instance, &o, &ops, &log).unwrap();
        assert_eq!(order(&instance), ["b", "c", "a"]);

        let mut o = opts("c");
        o.lowest = true;
        reorder(&instance, &o, &ops, &log).unwrap();
        assert_eq!(order(&instance), ["c", "b", "a"]);
    }

    #[test]
    fn before_and_after_reference() {
        let (_tmp, instance) = instance(&["a", "b", "c"]);
        let (log, _log_tmp, _guard) = isolated_logger();
        let ops = MockMountOps::new();

        let mut o = opts("c");
        o.before = Some("a".to_string());
        reorder(&instance, &o, &ops, &log).unwrap();
        assert_eq!(order(&instance), ["c", "a", "b"]);

        let mut o = opts("c");
        o.after = Some("b".to_string());
        reorder(&instance, &o, &ops, &log).unwrap();
        assert_eq!(order(&instance), ["a", "b", "c"]);
    }

    #[test]
    fn unknown_reference_leaves_file_untouched() {
        let (_tmp, instance) = instance(&["a", "b"]);
        let (log, _log_tmp, _guard) = isolated_logger();
        let mut o = opts("a");
        o.after = Some("ghost".to_string());
        assert!(reorder(&instance, &o, &MockMountOps::new(), &log).is_err());
        assert!(!instance.priority_file().exists());
    }

    #[test]
    fn refused_while_mounted() {
        let (_tmp, instance) = instance(&["a", "b"]);
        std::fs::create_dir_all(instance.root().join("game")).unwrap();
        InstanceSettings::new(&instance)
            .set_text(
                InstanceSetting::DeploymentTargetDir,
                instance.root().join("game").to_str().unwrap(),
            )
            .unwrap();
        let ops = MockMountOps::new().with_mounted(instance.root().join("game"));
        let (log, _log_tmp, _guard) = isolated_logger();
        let mut o = opts("a");
        o.highest = true;
        let err = reorder(&instance, &o, &ops, &log).unwrap_err();
        assert!(err.to_string().contains("cannot reorder mods"));
    }
}
