//! `cybex` binary: parse arguments, set up logging, dispatch, map errors to
//! exit codes.
use clap::{CommandFactory as _, Parser as _};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use cybex_cli::{cli, commands, error, interrupt, logging};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();

    match &args.command {
        cli::Command::Version => {
            let version = option_env!("CYBEX_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            #[allow(clippy::print_stdout)]
            {
                println!("cybex {version}");
            }
            return ExitCode::SUCCESS;
        }
        cli::Command::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut cli::Cli::command(),
                "cybex",
                &mut std::io::stdout(),
            );
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let command = args.command.name();
    logging::init_subscriber(args.verbose, command);
    let log = Arc::new(logging::Logger::new(command));

    let interrupted = Arc::new(AtomicBool::new(false));
    if let Err(e) = interrupt::install_handler(Arc::clone(&interrupted)) {
        log.warn(&format!("{e:#}"));
    }

    let result = match &args.command {
        cli::Command::Install(opts) => {
            commands::install::run(&args.global, opts, &log, interrupted)
        }
        cli::Command::Uninstall(opts) => {
            commands::uninstall::run(&args.global, opts, &log, interrupted)
        }
        cli::Command::List => commands::list::run(&args.global, &log),
        cli::Command::Version | cli::Command::Completions { .. } => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::from(error::exit_code_for(&e))
        }
    }
}
