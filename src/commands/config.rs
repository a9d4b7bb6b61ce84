//! Command: `config list|get|set|unset`.
use std::fmt::Write as _;

use anyhow::Result;

use crate::cli::{ConfigCommand, GlobalOpts};
use crate::commands::CommandSetup;
use crate::config::{InstanceSetting, InstanceSettings};
use crate::instance::Instance;
use crate::logging::Logger;

/// Run the config command.
///
/// # Errors
///
/// Returns an error if the key matches no setting or several, or if the
/// value is rejected.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, cmd: &ConfigCommand, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    print!("{}", execute(&setup.instance, cmd, log)?);
    Ok(())
}

/// Execute `cmd` and return what it prints.
///
/// # Errors
///
/// See [`run`].
pub fn execute(instance: &Instance, cmd: &ConfigCommand, log: &Logger) -> Result<String> {
    let settings = InstanceSettings::new(instance);
    let mut out = String::new();
    match cmd {
        ConfigCommand::List => {
            for setting in InstanceSetting::ALL {
                let marker = if settings.is_set(setting) {
                    "CUSTOM: "
                } else {
                    "DEFAULT:"
                };
                let _ = writeln!(out, "{marker} {}", setting.key());
            }
        }
        ConfigCommand::Get { key } => {
            let setting = lookup(key, "querying", log)?;
            let value = settings
                .get(setting)?
                .map_or_else(|| "unset".to_string(), |v| v.to_string());
            let _ = writeln!(out, "{} = {value}", setting.key());
        }
        ConfigCommand::Set { key, value } => {
            let setting = lookup(key, "setting", log)?;
            settings.set_text(setting, value)?;
            log.info(&format!("{} updated", setting.key()));
        }
        ConfigCommand::Unset { key } => {
            let setting = lookup(key, "unsetting", log)?;
            settings.unset(setting)?;
            log.info(&format!("{} restored to its default", setting.key()));
        }
    }
    Ok(out)
}

fn lookup(key: &str, verb: &str, log: &Logger) -> Result<InstanceSetting> {
    let setting = InstanceSetting::lookup(key)?;
    if !setting.key().eq_ignore_ascii_case(key) {
        log.warn(&format!(
            "{verb} config via the incomplete key '{key}' may match a different setting in \
             other versions of modfs; use '{}'",
            setting.key()
        ));
    }
    Ok(setting)
}
