//! Command: `list` mods, versions, priorities, conflicts and update checks.
use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::Result;

use crate::cli::{GlobalOpts, ListCommand};
use crate::commands::{CommandSetup, select_mods};
use crate::config::{ModConfig, ModSetting};
use crate::conflicts::find_conflicts;
use crate::instance::Instance;
use crate::logging::Logger;
use crate::mods::{
    ModId, Version, VersionTag, active_mods, latest_version, list_versions, resolve_active_version,
};
use crate::priority::PriorityList;

/// Run the list command.
///
/// # Errors
///
/// Returns an error if the instance cannot be resolved or a mod's state
/// cannot be read.
#[allow(clippy::print_stdout)]
pub fn run(global: &GlobalOpts, cmd: &ListCommand, log: &Logger) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    print!("{}", render(&setup.instance, cmd, &setup.today)?);
    Ok(())
}

/// Render the requested listing.
///
/// # Errors
///
/// Returns an error if a named mod does not exist or state cannot be read.
pub fn render(instance: &Instance, cmd: &ListCommand, today: &str) -> Result<String> {
    match cmd {
        ListCommand::Mods => render_mods(instance, today),
        ListCommand::Versions(opts) => {
            let ids = select_mods(instance, opts.all, &opts.mods)?;
            render_versions(instance, &ids, today)
        }
        ListCommand::Priority => render_priority(instance),
        ListCommand::Conflicts => render_conflicts(instance, today),
        ListCommand::Updatecheck(opts) => {
            let ids = select_mods(instance, opts.all, &opts.mods)?;
            render_update_checks(instance, &ids, opts.exclude_today, today)
        }
    }
}

fn render_mods(instance: &Instance, today: &str) -> Result<String> {
    let mut out = String::from("List of installed mods:\n");
    for id in instance.mod_ids()? {
        let config = ModConfig::open(instance, &id)?;
        let state = if config.enabled()? {
            resolve_active_version(instance, &id, today)?
                .map_or_else(|| "no versions".to_string(), |v| v.to_string())
        } else {
            "disabled".to_string()
        };
        let _ = writeln!(out, "  {id}: {state}");
    }
    Ok(out)
}

fn render_versions(instance: &Instance, ids: &[ModId], today: &str) -> Result<String> {
    let mut out = String::new();
    for id in ids {
        let config = ModConfig::open(instance, id)?;
        let suffix = if config.enabled()? { "" } else { " (disabled)" };
        let _ = writeln!(out, "{id}:{suffix}");

        let versions = list_versions(instance, id)?;
        let latest = latest_version(instance, id)?;
        let selected = match config.version_tag()? {
            VersionTag::Latest => latest.clone(),
            tag => tag.resolve_fixed(today),
        };
        for (date, subs) in &versions {
            for (i, sub) in subs.iter().enumerate() {
                let shown_date = if i == 0 {
                    date.clone()
                } else {
                    " ".repeat(date.len())
                };
                let version = Version::from_parts(date, sub);
                let mut line = format!("  {shown_date}/{sub}");
                if latest.as_ref() == Some(&version) {
                    line.push_str(" latest");
                }
                if selected.as_ref() == Some(&version) {
                    line.push_str(" selected");
                }
                let _ = writeln!(out, "{line}");
            }
        }
    }
    Ok(out)
}

fn render_priority(instance: &Instance) -> Result<String> {
    let priority = PriorityList::load(instance)?;
    let mut out = String::new();
    for id in priority.iter() {
        let _ = writeln!(out, "{id}");
    }
    Ok(out)
}

fn render_conflicts(instance: &Instance, today: &str) -> Result<String> {
    let priority = PriorityList::load(instance)?;
    let active = active_mods(instance, &priority, today)?;
    let conflicts = find_conflicts(&active)?;
    let mut out = String::new();
    for (ids, files) in &conflicts {
        let names: Vec<&str> = ids.iter().map(ModId::as_str).collect();
        let _ = writeln!(out, "{{{}}}", names.join(", "));
        for file in files {
            let _ = writeln!(out, "    {}", file.display());
        }
    }
    Ok(out)
}

fn render_update_checks(
    instance: &Instance,
    ids: &[ModId],
    exclude_today: bool,
    today: &str,
) -> Result<String> {
    let mut by_date: BTreeMap<String, Vec<&ModId>> = BTreeMap::new();
    for id in ids {
        let checked = ModConfig::open(instance, id)?.text(ModSetting::LastUpdateCheck)?;
        if exclude_today && checked == today {
            continue;
        }
        by_date.entry(checked).or_default().push(id);
    }

    let mut out =
        String::from("The selected mods were last checked for updates on the following dates:\n");
    for (date, mods) in &by_date {
        let label = if date.is_empty() { "Never" } else { date };
        let _ = writeln!(out, "{label}:");
        for id in mods {
            let _ = writeln!(out, "            {id}");
        }
    }
    Ok(out)
}
