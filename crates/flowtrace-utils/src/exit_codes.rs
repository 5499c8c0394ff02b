//! Exit code constants and error-to-exit-code mapping for the `flowtrace` CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CONFIGURATION` | Invalid CLI arguments or configuration |
//! | 3 | `QUERY` | Query session operation failed |
//! | 4 | `TRANSFORM` | AST rewrite failed outside of degrade-and-skip context (CLI `check`) |

use crate::error::FlowTraceError;

/// Type-safe process exit code. The numeric values are part of the
/// public API and stable within a 1.x series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const INTERNAL: ExitCode = ExitCode(1);
    pub const CONFIGURATION: ExitCode = ExitCode(2);
    pub const QUERY: ExitCode = ExitCode(3);
    pub const TRANSFORM: ExitCode = ExitCode(4);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl From<&FlowTraceError> for ExitCode {
    fn from(err: &FlowTraceError) -> Self {
        match err {
            FlowTraceError::Configuration(_) => ExitCode::CONFIGURATION,
            FlowTraceError::Query(_) => ExitCode::QUERY,
            FlowTraceError::Transform { .. } => ExitCode::TRANSFORM,
            FlowTraceError::Instrumentation { .. }
            | FlowTraceError::Emission { .. }
            | FlowTraceError::Parse { .. }
            | FlowTraceError::Io(_) => ExitCode::INTERNAL,
        }
    }
}
