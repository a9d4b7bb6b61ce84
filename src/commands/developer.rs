//! Command: `developer` debugging helpers.
use std::fmt::Write as _;

use anyhow::Result;

use crate::cli::{DeveloperCommand, GlobalOpts};
use crate::commands::CommandSetup;
use crate::config::{InstanceSetting, InstanceSettings};
use crate::instance::Instance;
use crate::logging::Logger;
use crate::mods::{ModId, allocate_version, version_dir};

const BANNER: &str = "\
YOU ARE EXECUTING A DEVELOPER SUBCOMMAND.
These features are exclusively meant for debugging and may cease working at any time
or even cause permanent damage.
Do not use them unless you know what you're doing or are following instructions by a developer.
";

/// Run a developer subcommand.
///
/// # Errors
///
/// Returns an error if the mod id is invalid or no version can be allocated.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, cmd: &DeveloperCommand, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    print!("{}", execute(&setup.instance, cmd, &setup.today, log)?);
    Ok(())
}

/// Execute `cmd` and return what it prints, banner included.
///
/// # Errors
///
/// See [`run`].
pub fn execute(
    instance: &Instance,
    cmd: &DeveloperCommand,
    today: &str,
    log: &Logger,
) -> Result<String> {
    let mut out = String::new();
    if !InstanceSettings::new(instance).flag(InstanceSetting::SuppressDeveloperCmdWarning)? {
        out.push_str(BANNER);
    }
    match cmd {
        DeveloperCommand::CreateBlankMod(arg) => {
            let id = ModId::parse(&arg.mod_id)?;
            let version = allocate_version(instance, &id, today)?;
            let dir = version_dir(instance, &id, &version);
            log.debug(&format!("allocated {id} {version}"));
            let _ = writeln!(out, "Created directory: {}", instance.display_path(&dir));
        }
    }
    Ok(out)
}
