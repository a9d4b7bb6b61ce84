//! Commands: `activate`, `deactivate` and `status`.
use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::commands::CommandSetup;
use crate::deploy::{self, Status};
use crate::instance::Instance;
use crate::logging::Logger;
use crate::mount::{MountOps, SystemMountOps};

/// Run the activate command.
///
/// # Errors
///
/// Returns an error if the layer stack cannot be composed or mounting fails.
pub fn run_activate(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    activate(&setup.instance, &setup.today, &SystemMountOps, log)
}

/// Run the deactivate command.
///
/// # Errors
///
/// Returns an error if nothing is mounted or unmounting fails.
pub fn run_deactivate(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    deactivate(&setup.instance, &SystemMountOps, log)
}

/// Run the status command.
///
/// # Errors
///
/// Returns an error if the settings or the mount table cannot be read.
#[allow(clippy::print_stdout)]
pub fn run_status(global: &GlobalOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    println!("{}", status(&setup.instance, &SystemMountOps)?);
    Ok(())
}

/// Compose and mount the layer stack of `instance`.
///
/// # Errors
///
/// Returns an error if composition or the mount tool fails.
pub fn activate(instance: &Instance, today: &str, ops: &dyn MountOps, log: &Logger) -> Result<()> {
    log.stage("Composing layers");
    let plan = deploy::activate(instance, today, ops)?;
    for layer in deploy::describe_layers(instance, &plan) {
        log.debug(&format!("lower: {layer}"));
    }
    log.debug(&format!("upper: {}", instance.display_path(&plan.upper_dir)));
    log.debug(&format!("work: {}", instance.display_path(&plan.work_dir)));
    log.info(&format!(
        "mounted {} mod(s) on {}",
        plan.mods.len(),
        plan.target.display()
    ));
    Ok(())
}

/// Unmount the layer stack of `instance`.
///
/// # Errors
///
/// Returns an error if nothing is mounted or the unmount tool fails.
pub fn deactivate(instance: &Instance, ops: &dyn MountOps, log: &Logger) -> Result<()> {
    let target = deploy::deactivate(instance, ops)?;
    log.info(&format!("unmounted {}", target.display()));
    Ok(())
}

/// One-line mount status.
///
/// # Errors
///
/// Returns an error if the settings or the mount table cannot be read.
pub fn status(instance: &Instance, ops: &dyn MountOps) -> Result<String> {
    Ok(match deploy::status(instance, ops)? {
        Status::Unconfigured => "target directory is unknown".to_string(),
        Status::Active(target) => format!("filesystem is active on path {}", target.display()),
        Status::Inactive(_) => "filesystem is not active".to_string(),
    })
}
