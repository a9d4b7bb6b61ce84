//! Top-level subcommand orchestration.
//!
//! Each handler resolves the instance through [`CommandSetup`], renders its
//! output into a `String` so it can be tested without a terminal, and prints
//! it. Progress and warnings go through the [`Logger`].
pub mod config;
pub mod deploy;
pub mod developer;
pub mod import;
pub mod init;
pub mod list;
pub mod mods;
pub mod reorder;
pub mod repair;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};

use crate::cli::GlobalOpts;
use crate::instance::Instance;
use crate::logging::Logger;
use crate::mods::{ModId, today};

/// Environment variable naming the instance directory.
pub const INSTANCE_ENV: &str = "MODFS_INSTANCE";

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// The resolved, initialised instance.
    pub instance: Instance,
    /// Today's date, `YYYY-MM-DD`, captured once per invocation.
    pub today: String,
}

impl CommandSetup {
    /// Resolve an initialised instance and capture today's date.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance directory cannot be determined or
    /// `modfs init` has not been run there.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let instance = resolve_instance(global)?;
        if !instance.is_initialized() {
            bail!(
                "{} is not a modfs instance; run `modfs init` first",
                instance.root().display()
            );
        }
        log.debug(&format!("instance: {}", instance.root().display()));
        Ok(Self {
            instance,
            today: today(),
        })
    }
}

/// Resolve the instance directory from `--instance`, `$MODFS_INSTANCE` or
/// the current directory, in that order.
///
/// # Errors
///
/// Returns an error if the chosen directory does not exist.
pub fn resolve_instance(global: &GlobalOpts) -> Result<Instance> {
    let root = match &global.instance {
        Some(root) => root.clone(),
        None => match std::env::var_os(INSTANCE_ENV) {
            Some(root) if !root.is_empty() => PathBuf::from(root),
            _ => std::env::current_dir().context("cannot determine the current directory")?,
        },
    };
    Instance::open(&root).with_context(|| format!("cannot open instance {}", root.display()))
}

/// Resolve mod arguments, adding every mod on disk when `all` is set.
///
/// The result is sorted and free of duplicates.
///
/// # Errors
///
/// Returns an error if a named mod is malformed or does not exist.
pub fn select_mods(instance: &Instance, all: bool, raw: &[String]) -> Result<Vec<ModId>> {
    let mut ids = raw
        .iter()
        .map(|r| instance.lookup_mod(r))
        .collect::<crate::error::Result<Vec<_>>>()?;
    if all {
        ids.extend(instance.mod_ids()?);
    }
    ids.sort();
    ids.dedup();
    Ok(ids)
}
