use thiserror::Error;

/// Crate-wide error type, following the taxonomy FlowTrace's design
/// assigns a distinct failure mode per subsystem.
///
/// The instrumentation surface (AST rewriting, runtime interception,
/// event emission) prefers degradation to propagation: a `Transform`,
/// `Instrumentation`, or `Emission` error is logged and the affected
/// unit is skipped, never surfaced to the instrumented program. The
/// query surface prefers explicit propagation: `Query` errors are
/// returned to the caller so a caller never silently gets a wrong
/// answer.
#[derive(Error, Debug)]
pub enum FlowTraceError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("transform error in {function} ({unit}): {reason}")]
    Transform {
        unit: String,
        function: String,
        reason: String,
    },

    #[error("instrumentation error wrapping {module}: {reason}")]
    Instrumentation { module: String, reason: String },

    #[error("emission error writing to {target}: {reason}")]
    Emission { target: String, reason: String },

    #[error("query error: {0}")]
    Query(#[from] QueryError),

    #[error("parse error at line {line}: {reason}")]
    Parse { line: usize, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid option combinations resolved at startup; fatal, surfaced on stderr.
#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("invalid value for {key}: {value} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("missing required configuration: {0}")]
    MissingRequired(String),

    #[error("config file {path} is not valid TOML: {reason}")]
    InvalidFile { path: String, reason: String },

    #[error("invalid glob pattern '{pattern}' in {key}: {reason}")]
    InvalidGlob {
        key: String,
        pattern: String,
        reason: String,
    },
}

/// Errors surfaced to the caller of a Query Session operation.
///
/// Never poisons the session: a failed query leaves the in-memory row
/// set untouched and subsequent queries on the same session are
/// unaffected (query purity).
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("log file not found: {0}")]
    LogNotFound(String),

    #[error("field not present in schema: {0}")]
    UnknownField(String),

    #[error("no event found at timestamp {timestamp} (event={event:?})")]
    EventNotFound {
        timestamp: i64,
        event: Option<String>,
    },

    #[error("segment file not found: {0}")]
    SegmentNotFound(String),

    #[error("segment file at {path} could not be parsed: {reason}")]
    SegmentUnreadable { path: String, reason: String },

    #[error("unsupported export format: {0}")]
    UnsupportedExportFormat(String),
}
