//! Error types for the Launcher Contract (§4.6).

use thiserror::Error;

/// Errors a launcher can hit spawning and running the instrumented target.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("could not detect a host language for {path}: {reason}")]
    DetectionFailed { path: String, reason: String },

    #[error("native execution failed: {reason}")]
    NativeExecutionFailed { reason: String },

    #[error("launcher configuration invalid: {reason}")]
    ConfigurationInvalid { reason: String },

    #[error("execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },
}
