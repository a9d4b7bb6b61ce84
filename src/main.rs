//! `modfs` command-line entry point.
use std::process::ExitCode;

use clap::Parser;

use modfs_cli::cli::{self, Command};
use modfs_cli::{commands, logging};

fn main() -> ExitCode {
    let args = cli::Cli::parse();
    let log_name = args.command.log_name();
    logging::init_subscriber(args.verbose, log_name);
    let log = logging::Logger::new(log_name);
    let global = &args.global;

    let result = match &args.command {
        Command::Init(opts) => commands::init::run(global, opts, &log),
        Command::List(cmd) => commands::list::run(global, cmd, &log),
        Command::Activate => commands::deploy::run_activate(global, &log),
        Command::Deactivate => commands::deploy::run_deactivate(global, &log),
        Command::Status => commands::deploy::run_status(global, &log),
        Command::Import(opts) => commands::import::run(global, opts, &log),
        Command::Reorder(opts) => commands::reorder::run(global, opts, &log),
        Command::Enable(arg) => commands::mods::run_set_enabled(global, arg, true, &log),
        Command::Disable(arg) => commands::mods::run_set_enabled(global, arg, false, &log),
        Command::Useversion(opts) => commands::mods::run_use_version(global, opts, &log),
        Command::Delete(arg) => commands::mods::run_delete(global, arg, &log),
        Command::Mod(opts) => commands::mods::run_mod(global, opts, &log),
        Command::Markuptodate(opts) => commands::mods::run_mark_up_to_date(global, opts, &log),
        Command::Config(cmd) => commands::config::run(global, cmd, &log),
        Command::Repair(cmd) => commands::repair::run(global, cmd, &log),
        Command::Developer(cmd) => commands::developer::run(global, cmd, &log),
        Command::Completions(opts) => {
            commands::version::run_completions(opts);
            Ok(())
        }
        Command::Version => {
            commands::version::run();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
