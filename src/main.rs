use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dots_cli::cli::{self, Command, DotfilesCommand, PartCommand};
use dots_cli::commands;
use dots_cli::engine::Scope;
use dots_cli::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    match args.command {
        Command::Version => {
            commands::version::run();
            return Ok(());
        }
        Command::Completions { shell } => {
            commands::completions::run(shell);
            return Ok(());
        }
        _ => {}
    }

    let command = args.command.log_name();
    logging::init_subscriber(args.verbose, args.global.json, command);
    let log = Arc::new(Logger::new(command));

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        ctrlc::set_handler(move || {
            if cancel.swap(true, Ordering::SeqCst) {
                std::process::exit(130);
            }
            tracing::warn!("interrupt received, finishing current bundle (press again to abort)");
        })?;
    }

    let global = &args.global;
    match &args.command {
        Command::Doctor(bundles) => {
            commands::doctor::run(global, bundles, Scope::Both, &log, &cancel)
        }
        Command::Install(bundles) => {
            commands::install::run(global, bundles, Scope::Both, &log, &cancel)
        }
        Command::Dependencies(part) => run_part(global, part, Scope::Packages, &log, &cancel),
        Command::Dotfiles(DotfilesCommand::Part(part)) => {
            run_part(global, part, Scope::Links, &log, &cancel)
        }
        Command::Dotfiles(DotfilesCommand::Uninstall(bundles)) => {
            commands::uninstall::run(global, bundles, &log, &cancel)
        }
        Command::Version | Command::Completions { .. } => Ok(()),
    }
}

fn run_part(
    global: &cli::GlobalOpts,
    part: &PartCommand,
    scope: Scope,
    log: &Arc<Logger>,
    cancel: &Arc<AtomicBool>,
) -> Result<()> {
    match part {
        PartCommand::List(bundles) => commands::list::run(global, bundles, scope, log, cancel),
        PartCommand::Install(bundles) => commands::install::run(global, bundles, scope, log, cancel),
        PartCommand::Doctor(bundles) => commands::doctor::run(global, bundles, scope, log, cancel),
    }
}
