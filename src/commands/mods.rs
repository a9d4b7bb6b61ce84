//! Commands acting on single mods: `enable`, `disable`, `useversion`,
//! `delete`, `mod` and `markuptodate`.
use std::fmt::Write as _;

use anyhow::{Context as _, Result, bail};

use crate::cli::{
    GlobalOpts, MarkUpToDateOpts, ModAction, ModArg, ModField, ModOpts, UseVersionOpts,
};
use crate::commands::{CommandSetup, select_mods};
use crate::config::{ModConfig, ModSetting, SettingValue};
use crate::deploy::ensure_inactive;
use crate::instance::Instance;
use crate::logging::Logger;
use crate::mods::{VersionTag, latest_version, resolve_active_version, version_exists};
use crate::mount::{MountOps, SystemMountOps};
use crate::priority::PriorityList;

/// Run `enable` or `disable`.
///
/// # Errors
///
/// Returns an error if the mod does not exist or its configuration cannot
/// be written.
pub fn run_set_enabled(
    global: &GlobalOpts,
    arg: &ModArg,
    enabled: bool,
    log: &Logger,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    set_enabled(&setup.instance, &arg.mod_id, enabled, log)
}

/// Run `useversion`.
///
/// # Errors
///
/// Returns an error if the tag is malformed or names a missing version.
pub fn run_use_version(global: &GlobalOpts, opts: &UseVersionOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    use_version(&setup.instance, opts, &setup.today, log)
}

/// Run `delete`.
///
/// # Errors
///
/// Returns an error while the filesystem is mounted or if removal fails.
pub fn run_delete(global: &GlobalOpts, arg: &ModArg, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    delete(&setup.instance, &arg.mod_id, &SystemMountOps, log)
}

/// Run `mod <id> info|set`.
///
/// # Errors
///
/// Returns an error if the mod does not exist or the value is rejected.
#[allow(clippy::print_stdout)]
pub fn run_mod(global: &GlobalOpts, opts: &ModOpts, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    match &opts.action {
        ModAction::Info => print!("{}", info(&setup.instance, &opts.mod_id, &setup.today)?),
        ModAction::Set { field, value } => {
            set_field(&setup.instance, &opts.mod_id, *field, value)?;
            log.info(&format!("updated {} of {}", setting_for(*field).key(), opts.mod_id));
        }
    }
    Ok(())
}

/// Run `markuptodate`.
///
/// # Errors
///
/// Returns an error if a mod does not exist; mods before it are already
/// marked.
pub fn run_mark_up_to_date(
    global: &GlobalOpts,
    opts: &MarkUpToDateOpts,
    log: &Logger,
) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    mark_up_to_date(&setup.instance, &opts.mods, &setup.today, log)
}

/// Set the `enabled` flag of a mod.
///
/// # Errors
///
/// See [`run_set_enabled`].
pub fn set_enabled(instance: &Instance, raw_id: &str, enabled: bool, log: &Logger) -> Result<()> {
    let id = instance.lookup_mod(raw_id)?;
    ModConfig::open(instance, &id)?.set(ModSetting::Enabled, SettingValue::Bool(enabled))?;
    log.info(&format!(
        "{id} {}",
        if enabled { "enabled" } else { "disabled" }
    ));
    Ok(())
}

/// Select the deployed version of a mod.
///
/// `latest` is stored as is; other tags are resolved against `today` and
/// must name an existing version.
///
/// # Errors
///
/// See [`run_use_version`].
pub fn use_version(
    instance: &Instance,
    opts: &UseVersionOpts,
    today: &str,
    log: &Logger,
) -> Result<()> {
    let id = instance.lookup_mod(&opts.mod_id)?;
    let stored = match VersionTag::parse(&opts.tag)? {
        VersionTag::Latest => "latest".to_string(),
        tag => {
            let Some(version) = tag.resolve_fixed(today) else {
                bail!("version {} cannot be resolved", opts.tag);
            };
            if !version_exists(instance, &id, &version) {
                bail!("version {version} of {id} does not exist");
            }
            version.to_string()
        }
    };
    ModConfig::open(instance, &id)?.set_text(ModSetting::UseModVersion, &stored)?;
    log.info(&format!("{id} now uses {stored}"));
    Ok(())
}

/// Remove a mod directory and its configuration.
///
/// # Errors
///
/// See [`run_delete`].
pub fn delete(instance: &Instance, raw_id: &str, ops: &dyn MountOps, log: &Logger) -> Result<()> {
    let id = instance.lookup_mod(raw_id)?;
    ensure_inactive(instance, ops, "delete mods")?;

    let dir = instance.mod_dir(&id);
    std::fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
    let config = instance.mod_config_file(&id);
    if config.exists() {
        std::fs::remove_file(&config).with_context(|| format!("removing {}", config.display()))?;
    }
    if instance.priority_file().exists() {
        PriorityList::load(instance)?.save(instance)?;
    }
    log.info(&format!("deleted {id}"));
    Ok(())
}

const fn setting_for(field: ModField) -> ModSetting {
    match field {
        ModField::Author => ModSetting::Author,
        ModField::Name => ModSetting::PrettyName,
        ModField::Note => ModSetting::CustomNotes,
        ModField::Link => ModSetting::Link,
    }
}

/// Change one metadata field of a mod.
///
/// # Errors
///
/// See [`run_mod`].
pub fn set_field(instance: &Instance, raw_id: &str, field: ModField, value: &str) -> Result<()> {
    let id = instance.lookup_mod(raw_id)?;
    ModConfig::open(instance, &id)?.set_text(setting_for(field), value)?;
    Ok(())
}

/// Human-readable summary of a mod.
///
/// # Errors
///
/// See [`run_mod`].
pub fn info(instance: &Instance, raw_id: &str, today: &str) -> Result<String> {
    let id = instance.lookup_mod(raw_id)?;
    let config = ModConfig::open(instance, &id)?;
    let mut out = String::new();

    let name = config.text(ModSetting::PrettyName)?;
    let _ = writeln!(out, "Name:\t{}", if name.is_empty() { id.as_str() } else { &name });
    let author = config.text(ModSetting::Author)?;
    let _ = writeln!(
        out,
        "Author:\t{}",
        if author.is_empty() { "unknown" } else { &author }
    );
    let link = config.text(ModSetting::Link)?;
    if !link.is_empty() {
        let _ = writeln!(out, "Link:\t{link}");
    }
    let status = if config.enabled()? { "Enabled" } else { "Disabled" };
    let _ = writeln!(out, "Status:\t{status}");

    if let Some(latest) = latest_version(instance, &id)? {
        let _ = writeln!(out, "Latest version: {latest}");
        if let Some(active) = resolve_active_version(instance, &id, today)? {
            let missing = if version_exists(instance, &id, &active) {
                ""
            } else {
                " (missing)"
            };
            let _ = writeln!(out, "Active version: {active}{missing}");
        }
        let checked = config.text(ModSetting::LastUpdateCheck)?;
        let _ = writeln!(
            out,
            "Last checked for updates on: {}",
            if checked.is_empty() { "Never" } else { &checked }
        );
    }

    let notes = config.text(ModSetting::CustomNotes)?;
    if !notes.is_empty() {
        let _ = writeln!(out, "User notes:");
        for line in notes.lines() {
            let _ = writeln!(out, "  {line}");
        }
    }
    Ok(out)
}

/// Set `last_update_check` of every named mod to `today`.
///
/// # Errors
///
/// See [`run_mark_up_to_date`].
pub fn mark_up_to_date(
    instance: &Instance,
    raw: &[String],
    today: &str,
    log: &Logger,
) -> Result<()> {
    for id in select_mods(instance, false, raw)? {
        ModConfig::open(instance, &id)?.set_text(ModSetting::LastUpdateCheck, today)?;
        log.debug(&format!("{id} checked on {today}"));
    }
    Ok(())
}
