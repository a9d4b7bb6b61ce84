//! Command: import a directory or archive as a new mod version.
use anyhow::{Context as _, Result};

use crate::cli::{GlobalOpts, ImportOpts};
use crate::commands::CommandSetup;
use crate::config::{InstanceSetting, InstanceSettings, ModSetting};
use crate::import::{self, ImportOutcome, ImportRequest};
use crate::instance::Instance;
use crate::logging::Logger;
use crate::mods::ModId;

/// Run the import command.
///
/// # Errors
///
/// Returns an error if the mod id or metadata is invalid, the day's
/// subversions are used up, or the files cannot be placed.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, opts: &ImportOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let outcome = import(&setup.instance, opts, &setup.today, log)?;
    println!(
        "Imported {} as {}",
        opts.mod_id,
        setup.instance.display_path(&outcome.destination)
    );
    Ok(())
}

/// Build the request from `opts` and import it.
///
/// A missing `--subdir` falls back to the `defaultModSubfolder` setting.
///
/// # Errors
///
/// See [`run`].
pub fn import(
    instance: &Instance,
    opts: &ImportOpts,
    today: &str,
    log: &Logger,
) -> Result<ImportOutcome> {
    let mod_id = ModId::parse(&opts.mod_id)?;
    let subdir = match &opts.subdir {
        Some(s) => s.clone(),
        None => InstanceSettings::new(instance).text(InstanceSetting::DefaultModSubfolder)?,
    };
    let metadata: Vec<(ModSetting, String)> = [
        (ModSetting::Author, &opts.author),
        (ModSetting::PrettyName, &opts.name),
        (ModSetting::Link, &opts.link),
    ]
    .into_iter()
    .filter_map(|(setting, value)| value.clone().map(|v| (setting, v)))
    .collect();

    log.stage(&format!("Importing mod {mod_id}"));
    let request = ImportRequest {
        mod_id,
        source: opts.source.clone(),
        subdir,
        keep_source: opts.preserve_source,
        metadata,
    };
    let outcome = import::import(instance, &request, today)
        .with_context(|| format!("importing {} failed", opts.source.display()))?;

    log.info(&format!("created version {}", outcome.version));
    if outcome.renames.renamed > 0 {
        log.debug(&format!(
            "lower-cased {} file name(s)",
            outcome.renames.renamed
        ));
    }
    for blocked in &outcome.renames.blocked {
        log.warn(&format!(
            "{} was not lower-cased: another file already uses that name",
            instance.display_path(blocked)
        ));
    }
    Ok(outcome)
}
