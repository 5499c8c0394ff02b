//! Launcher Contract (§4.6): the external collaborator `flowtrace run`
//! delegates to. Detects the target's host language, resolves the
//! configuration surface (§6) into concrete injection environment
//! variables, and spawns the target through an argv-only `ProcessRunner`.
//!
//! # Modules
//!
//! - [`contract`] -- host-language detection, `LauncherOptions`, `launch`
//! - [`command_spec`] -- argv-style `CommandSpec` process builder
//! - [`process`] -- the `ProcessRunner` trait and `ProcessOutput`
//! - [`error`] -- `RunnerError`

pub mod command_spec;
pub mod contract;
pub mod error;
pub mod process;

pub use command_spec::CommandSpec;
pub use contract::{detect_host_language, launch, LauncherOptions};
pub use error::RunnerError;
pub use process::{NativeRunner, ProcessOutput, ProcessRunner};
