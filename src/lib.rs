//! modfs: a mod manager for game directories.
//!
//! Mods are imported into a dated version store inside an *instance*
//! directory and deployed by mounting a `fuse-overlayfs` view over the
//! game's target directory. The game directory itself is never modified
//! while deployed; writes land in an overflow directory.
//!
//! The public API is organised into four layers:
//!
//! - **[`instance`]**, **[`config`]** and **[`mods`]**: the on-disk layout,
//!   instance settings, per-mod configuration and the version store
//! - **[`priority`]** and **[`conflicts`]**: load order and overlapping files
//! - **[`deploy`]**, **[`mount`]** and **[`import`]**: composing the overlay
//!   and bringing mods in from archives or directories
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod conflicts;
pub mod deploy;
pub mod error;
pub mod exec;
pub mod fs;
pub mod import;
pub mod instance;
pub mod logging;
pub mod mods;
pub mod mount;
pub mod priority;
