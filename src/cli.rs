//! Command-line definition (clap derive).
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Top-level CLI entry point for the modfs mod manager.
#[derive(Parser, Debug)]
#[command(
    name = "modfs",
    about = "Versioned mod storage deployed through fuse-overlayfs",
    version
)]
pub struct Cli {
    #[allow(missing_docs)]
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[allow(missing_docs)]
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Instance directory (defaults to $MODFS_INSTANCE, then the current directory)
    #[arg(long, global = true)]
    pub instance: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set up a new instance in the instance directory
    Init(InitOpts),
    /// Show mods, versions, priorities, conflicts or update checks
    #[command(subcommand)]
    List(ListCommand),
    /// Mount the merged view on the deployment target
    #[command(visible_alias = "on")]
    Activate,
    /// Unmount the merged view
    #[command(visible_alias = "off")]
    Deactivate,
    /// Report whether the merged view is mounted
    Status,
    /// Import a directory or archive as a new version of a mod
    Import(ImportOpts),
    /// Change the priority of a mod
    Reorder(ReorderOpts),
    /// Include a mod in deployments
    Enable(ModArg),
    /// Exclude a mod from deployments
    Disable(ModArg),
    /// Select the version of a mod that gets deployed
    Useversion(UseVersionOpts),
    /// Remove a mod with all its versions
    Delete(ModArg),
    /// Inspect or edit the metadata of one mod
    Mod(ModOpts),
    /// Record that mods were checked for updates today
    Markuptodate(MarkUpToDateOpts),
    /// Show and change instance settings
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Fix up instance state
    #[command(subcommand)]
    Repair(RepairCommand),
    /// Low-level helpers for development
    #[command(subcommand)]
    Developer(DeveloperCommand),
    /// Print a shell completion script
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Options for the `init` subcommand.
#[derive(Args, Debug, Clone)]
pub struct InitOpts {
    /// Directory the merged view is mounted on (usually the game directory)
    #[arg(long)]
    pub target: PathBuf,

    /// Writable layer capturing files modified through the mount
    #[arg(long)]
    pub overflow: Option<PathBuf>,

    /// Scratch directory on the same filesystem as the target
    #[arg(long)]
    pub workdir: Option<PathBuf>,
}

/// `list` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ListCommand {
    /// Mods with their state and selected version
    Mods,
    /// Versions stored for each mod
    Versions(ListVersionsOpts),
    /// Mods in priority order, lowest first
    Priority,
    /// Files shipped with different content by several active mods
    Conflicts,
    /// Mods grouped by the date they were last checked for updates
    Updatecheck(UpdateCheckOpts),
}

/// Options for `list versions`.
#[derive(Args, Debug, Clone)]
pub struct ListVersionsOpts {
    /// Show every mod
    #[arg(long, conflicts_with = "mods")]
    pub all: bool,

    /// Mods to show
    #[arg(value_name = "MOD", required_unless_present = "all")]
    pub mods: Vec<String>,
}

/// Options for `list updatecheck`.
#[derive(Args, Debug, Clone)]
pub struct UpdateCheckOpts {
    /// Show every mod
    #[arg(long, conflicts_with = "mods")]
    pub all: bool,

    /// Leave out mods checked today
    #[arg(long)]
    pub exclude_today: bool,

    /// Mods to show
    #[arg(value_name = "MOD", required_unless_present = "all")]
    pub mods: Vec<String>,
}

/// Options for the `import` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ImportOpts {
    /// Mod receiving the new version; created if it does not exist
    pub mod_id: String,

    /// Directory or archive (.tar*, .zip, .rar, .7z) to import
    pub source: PathBuf,

    /// Copy a source directory instead of moving it
    #[arg(long)]
    pub preserve_source: bool,

    /// Place files in this subdirectory of the version (MOD_NAME and SRC_DIR are expanded)
    #[arg(long)]
    pub subdir: Option<String>,

    /// Author to record
    #[arg(long)]
    pub author: Option<String>,

    /// Display name to record
    #[arg(long)]
    pub name: Option<String>,

    /// Download page to record
    #[arg(long)]
    pub link: Option<String>,
}

/// Options for the `reorder` subcommand.
#[derive(Args, Debug, Clone)]
#[command(group(
    clap::ArgGroup::new("position")
        .required(true)
        .args(["before", "after", "highest", "lowest"])
))]
pub struct ReorderOpts {
    /// Mod to move
    #[arg(value_name = "MOD")]
    pub mod_id: String,

    /// Place directly below this mod
    #[arg(long, value_name = "MOD")]
    pub before: Option<String>,

    /// Place directly above this mod
    #[arg(long, value_name = "MOD")]
    pub after: Option<String>,

    /// Give the mod the highest priority
    #[arg(long)]
    pub highest: bool,

    /// Give the mod the lowest priority
    #[arg(long)]
    pub lowest: bool,
}

/// A single mod argument.
#[derive(Args, Debug, Clone)]
pub struct ModArg {
    /// Mod id
    #[arg(value_name = "MOD")]
    pub mod_id: String,
}

/// Options for the `useversion` subcommand.
#[derive(Args, Debug, Clone)]
pub struct UseVersionOpts {
    /// Mod id
    #[arg(value_name = "MOD")]
    pub mod_id: String,

    /// `latest`, a subversion of today (e.g. `3`) or `YYYY-MM-DD/NN`
    pub tag: String,
}

/// Options for the `mod` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ModOpts {
    /// Mod id
    #[arg(value_name = "MOD")]
    pub mod_id: String,

    #[allow(missing_docs)]
    #[command(subcommand)]
    pub action: ModAction,
}

/// Actions on a single mod.
#[derive(Subcommand, Debug, Clone)]
pub enum ModAction {
    /// Print metadata and version state
    Info,
    /// Change one metadata field
    Set {
        /// Field to change
        field: ModField,
        /// New value
        value: String,
    },
}

/// Editable metadata fields.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModField {
    /// Author name
    Author,
    /// Display name
    Name,
    /// Free-form notes
    Note,
    /// Download page
    Link,
}

/// Options for `markuptodate`.
#[derive(Args, Debug, Clone)]
pub struct MarkUpToDateOpts {
    /// Mods to mark
    #[arg(value_name = "MOD", required = true)]
    pub mods: Vec<String>,
}

/// `config` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show every setting and whether it is customised
    List,
    /// Print one setting (key prefixes are accepted)
    Get {
        /// Setting key or unique prefix
        key: String,
    },
    /// Change one setting
    Set {
        /// Setting key or unique prefix
        key: String,
        /// New value
        value: String,
    },
    /// Restore the default of one setting
    Unset {
        /// Setting key or unique prefix
        key: String,
    },
}

/// `repair` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum RepairCommand {
    /// Rewrite the priority list from the mods on disk
    Filepriority,
    /// Lower-case file names in mod versions and other layers
    Filenamecase(FilenameCaseOpts),
}

/// Options for `repair filenamecase`.
#[derive(Args, Debug, Clone)]
pub struct FilenameCaseOpts {
    /// Process every mod
    #[arg(long, conflicts_with = "mods")]
    pub all: bool,

    /// Also process the deployment target
    #[arg(long)]
    pub gamefiles: bool,

    /// Also process the overflow directory
    #[arg(long)]
    pub overflow: bool,

    /// Mods to process
    #[arg(value_name = "MOD")]
    pub mods: Vec<String>,
}

/// `developer` subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum DeveloperCommand {
    /// Create an empty version of a mod without importing anything
    CreateBlankMod(ModArg),
}

/// Options for `completions`.
#[derive(Args, Debug, Clone)]
pub struct CompletionsOpts {
    /// Shell to generate the script for
    pub shell: clap_complete::Shell,
}

impl Command {
    /// Name used for the log file of this invocation.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::List(_) => "list",
            Self::Activate | Self::Deactivate | Self::Status => "deploy",
            Self::Import(_) => "import",
            Self::Reorder(_) => "reorder",
            Self::Enable(_)
            | Self::Disable(_)
            | Self::Useversion(_)
            | Self::Delete(_)
            | Self::Mod(_)
            | Self::Markuptodate(_) => "mod",
            Self::Config(_) => "config",
            Self::Repair(_) => "repair",
            Self::Developer(_) => "developer",
            Self::Completions(_) | Self::Version => "modfs",
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_instance_override() {
        let cli = Cli::parse_from(["modfs", "--instance", "/games/skyrim", "status"]);
        assert_eq!(cli.global.instance, Some(PathBuf::from("/games/skyrim")));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn parse_verbose_after_subcommand() {
        let cli = Cli::parse_from(["modfs", "list", "mods", "-v"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::List(ListCommand::Mods)));
    }

    #[test]
    fn activate_aliases() {
        let cli = Cli::parse_from(["modfs", "on"]);
        assert!(matches!(cli.command, Command::Activate));
        let cli = Cli::parse_from(["modfs", "off"]);
        assert!(matches!(cli.command, Command::Deactivate));
    }

    #[test]
    fn parse_import() {
        let cli = Cli::parse_from([
            "modfs",
            "import",
            "skyui",
            "/dl/SkyUI.7z",
            "--preserve-source",
            "--subdir",
            "Data/MOD_NAME",
            "--author",
            "schlangster",
        ]);
        let Command::Import(opts) = cli.command else {
            panic!("expected import");
        };
        assert_eq!(opts.mod_id, "skyui");
        assert!(opts.preserve_source);
        assert_eq!(opts.subdir.as_deref(), Some("Data/MOD_NAME"));
        assert_eq!(opts.author.as_deref(), Some("schlangster"));
        assert_eq!(opts.link, None);
    }

    #[test]
    fn reorder_needs_exactly_one_position() {
        assert!(Cli::try_parse_from(["modfs", "reorder", "a"]).is_err());
        assert!(
            Cli::try_parse_from(["modfs", "reorder", "a", "--highest", "--before", "b"]).is_err()
        );
        let cli = Cli::parse_from(["modfs", "reorder", "a", "--before", "b"]);
        let Command::Reorder(opts) = cli.command else {
            panic!("expected reorder");
        };
        assert_eq!(opts.before.as_deref(), Some("b"));
        assert!(!opts.highest);
    }

    #[test]
    fn list_versions_needs_mods_or_all() {
        assert!(Cli::try_parse_from(["modfs", "list", "versions"]).is_err());
        assert!(Cli::try_parse_from(["modfs", "list", "versions", "--all", "a"]).is_err());
        assert!(Cli::try_parse_from(["modfs", "list", "versions", "--all"]).is_ok());
    }

    #[test]
    fn parse_mod_set() {
        let cli = Cli::parse_from(["modfs", "mod", "skyui", "set", "link", "https://x.org/1"]);
        let Command::Mod(opts) = cli.command else {
            panic!("expected mod");
        };
        assert!(matches!(
            opts.action,
            ModAction::Set {
                field: ModField::Link,
                ..
            }
        ));
    }

    #[test]
    fn parse_developer_create_blank_mod() {
        let cli = Cli::parse_from(["modfs", "developer", "create-blank-mod", "patch"]);
        assert!(matches!(
            cli.command,
            Command::Developer(DeveloperCommand::CreateBlankMod(_))
        ));
    }

    #[test]
    fn markuptodate_requires_a_mod() {
        assert!(Cli::try_parse_from(["modfs", "markuptodate"]).is_err());
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["modfs", "completions", "bash"]);
        assert!(matches!(cli.command, Command::Completions(_)));
    }
}
