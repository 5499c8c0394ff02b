//! Initializer / Launcher binary (§ CLI module): wires the configuration
//! surface, Launcher Contract, and Query Session into the `flowtrace`
//! command-line tool.
//!
//! # Modules
//!
//! - [`cli`] -- argument parsing, dispatch, and the `init`/`run`/`query`
//!   command implementations

pub mod cli;

pub use cli::run;
