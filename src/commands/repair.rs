//! Command: `repair filepriority|filenamecase`.
use std::path::PathBuf;

use anyhow::Result;

use crate::cli::{FilenameCaseOpts, GlobalOpts, RepairCommand};
use crate::commands::{CommandSetup, select_mods};
use crate::config::{InstanceSetting, InstanceSettings};
use crate::deploy::target_dir;
use crate::fs::{RenameReport, lowercase_tree};
use crate::instance::Instance;
use crate::logging::Logger;
use crate::priority::PriorityList;

/// Run the repair command.
///
/// # Errors
///
/// Returns an error if a named mod does not exist or a tree cannot be
/// processed.
pub fn run(global: &GlobalOpts, cmd: &RepairCommand, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    match cmd {
        RepairCommand::Filepriority => repair_priority(&setup.instance, log),
        RepairCommand::Filenamecase(opts) => repair_case(&setup.instance, opts, log),
    }
}

/// Rewrite `priority.txt` with the healed list.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
pub fn repair_priority(instance: &Instance, log: &Logger) -> Result<()> {
    let priority = PriorityList::load(instance)?;
    priority.save(instance)?;
    log.info(&format!("priority list holds {} mod(s)", priority.len()));
    Ok(())
}

/// Lower-case the file names of the selected trees.
///
/// # Errors
///
/// Returns an error if a named mod does not exist, `--gamefiles` is given
/// without a configured target, or a rename fails.
pub fn repair_case(instance: &Instance, opts: &FilenameCaseOpts, log: &Logger) -> Result<()> {
    let mut roots: Vec<PathBuf> = select_mods(instance, opts.all, &opts.mods)?
        .iter()
        .map(|id| instance.mod_dir(id))
        .collect();
    if opts.gamefiles {
        roots.push(target_dir(instance)?);
    }
    if opts.overflow
        && let Some(dir) =
            InstanceSettings::new(instance).path(InstanceSetting::DeploymentOverflowDir)?
        && dir.is_dir()
    {
        roots.push(dir);
    }
    if roots.is_empty() {
        log.warn("nothing selected; name mods or pass --all, --gamefiles or --overflow");
        return Ok(());
    }

    let mut total = RenameReport::default();
    for root in &roots {
        log.stage(&format!("Lower-casing {}", instance.display_path(root)));
        let report = lowercase_tree(root)?;
        for blocked in &report.blocked {
            log.warn(&format!(
                "{} was not lower-cased: another file already uses that name",
                instance.display_path(blocked)
            ));
        }
        total.renamed += report.renamed;
        total.deduplicated += report.deduplicated;
        total.blocked.extend(report.blocked);
    }
    log.info(&format!(
        "renamed {}, removed {} duplicate(s), skipped {}",
        total.renamed,
        total.deduplicated,
        total.blocked.len()
    ));
    Ok(())
}
