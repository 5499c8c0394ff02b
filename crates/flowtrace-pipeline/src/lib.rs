//! The Trace Event Pipeline (§4.4): builds per-call contexts, serializes
//! arguments/results/exceptions, measures duration, and emits exactly one
//! ENTER and one EXIT (or EXCEPTION) record per call with bounded
//! per-line size via lazy segmentation.

pub mod context;
pub mod segment;
pub mod value;
pub mod writer;

pub use context::{CallContext, Pipeline};
pub use value::Value;
