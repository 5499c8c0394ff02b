//! `flowtrace` CLI binary.
//!
//! Minimal entrypoint: all logic lives in the library, main.rs only maps
//! the returned `ExitCode` to a process exit.

fn main() {
    if let Err(code) = flowtrace_cli::run() {
        std::process::exit(code.as_i32());
    }
}
