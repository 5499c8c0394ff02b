//! The FlowTrace data model: the shapes that cross the wire (§3 of the
//! core spec) and the small state machines that govern their lifetime.
//!
//! This crate has no I/O and no policy logic; it just defines the record
//! shapes that `flowtrace-pipeline` emits and `flowtrace-query` loads.

pub mod event;
pub mod host;
pub mod segment;
pub mod selection;

pub use event::{EventKind, ExceptionInfo, TraceEvent, TruncatedField};
pub use host::HostLanguage;
pub use segment::segment_filename;
pub use selection::SelectionPolicyConfig;
