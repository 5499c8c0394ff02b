//! Command-line interface for `flowtrace`.
//!
//! - `args`: clap-derived `Cli`/`Commands`/`QueryCommands`
//! - `run`: entry point and command dispatch
//! - `commands`: `init`/`run`/`query` implementations

pub mod args;
mod commands;
mod run;

#[cfg(test)]
mod tests;

pub use args::{build_cli, Cli, Commands, QueryCommands};
pub use run::run;
