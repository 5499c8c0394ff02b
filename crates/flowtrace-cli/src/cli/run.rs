//! CLI entry point and dispatch.
//!
//! `run()` owns all user-facing output: on success it prints whatever
//! the command printed and returns `Ok(())`; on failure it prints a
//! one-line diagnostic to stderr and returns the mapped `ExitCode`.
//! `main.rs` only maps that to `std::process::exit`.

use clap::Parser;

use flowtrace_utils::exit_codes::ExitCode;

use super::args::{Cli, Commands};
use super::commands;

pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let _ = flowtrace_utils::logging::init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Init { force } => commands::init::execute(*force, cli.config.as_deref()),
        Commands::Run { argv } => commands::run_target::execute(argv, cli.config.as_deref()),
        Commands::Query { logfile, command } => commands::query::execute(logfile, command),
    };

    result.map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}
