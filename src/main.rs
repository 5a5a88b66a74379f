use std::sync::Arc;

use clap::Parser;

use provision_cli::cli::{Cli, Command};
use provision_cli::commands;
use provision_cli::logging::{self, LogFormat, Logger};
use provision_cli::recovery::RunState;

fn main() {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    let command_name = args.command.name();
    logging::init_subscriber(args.verbose, command_name, LogFormat::from_env());
    let log = Arc::new(Logger::new(command_name));

    let result = match args.command {
        Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        Command::Check => commands::check::run(&args.global, &log),
        Command::Completion(opts) => {
            commands::completion::run(opts.shell);
            Ok(RunState::Completed)
        }
        Command::Version => {
            let version = option_env!("PROVISION_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
            println!("provision {version}");
            Ok(RunState::Completed)
        }
    };

    let code = match result {
        Ok(state) => state.exit_code(),
        Err(e) => {
            log.error(&format!("{e:#}"));
            1
        }
    };
    std::process::exit(code);
}
