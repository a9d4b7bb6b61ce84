//! Commands: `version` and `completions`.
use clap::CommandFactory as _;

use crate::cli::{Cli, CompletionsOpts};

/// The version string, preferring the one injected at build time.
#[must_use]
pub fn version_string() -> String {
    let version = option_env!("MODFS_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    format!("modfs {version}")
}

/// Print the modfs version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("{}", version_string());
}

/// Write the completion script for the requested shell to stdout.
pub fn run_completions(opts: &CompletionsOpts) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(opts.shell, &mut cmd, name, &mut std::io::stdout());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn version_is_prefixed_with_the_binary_name() {
        let version = version_string();
        assert!(version.starts_with("modfs "));
        assert!(version.len() > "modfs ".len());
    }

    #[test]
    fn completion_script_mentions_subcommands() {
        let mut cmd = Cli::command();
        let mut buf = Vec::new();
        clap_complete::generate(clap_complete::Shell::Bash, &mut cmd, "modfs", &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("markuptodate"));
        assert!(script.contains("useversion"));
    }
}
