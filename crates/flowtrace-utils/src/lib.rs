pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;

pub use error::{ConfigurationError, FlowTraceError, QueryError};
pub use exit_codes::ExitCode;
