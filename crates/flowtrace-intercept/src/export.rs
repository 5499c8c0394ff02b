//! The generic export model the Runtime Interceptor walks (§4.2).
//!
//! This operates one level up from any concrete host object model
//! (CPython frames, a V8 module namespace, a JVM `Class`, ...): a
//! `LoadedModule` is just a named bag of `Export`s, and a function
//! export is an opaque callable. A host binding's job is to build one
//! of these from whatever its runtime actually hands it; this crate
//! never needs to know which.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use flowtrace_pipeline::Value;

/// A function export's callable: takes the positional argument list,
/// returns a `CallOutcome`. Wrapping never changes this signature,
/// which is what lets a wrapped export replace the original in place.
pub type Callable = Arc<dyn Fn(Vec<Value>) -> CallOutcome + Send + Sync>;

/// A future resolving to the eventual value or rejection of an async
/// callable, boxed so `Export`s from different host bindings can share
/// one concrete type.
pub type AsyncOutcome = Pin<Box<dyn Future<Output = Result<Value, Value>> + Send>>;

/// What calling an export produced: a value returned synchronously, or
/// a thenable/future whose resolution the wrapper must chain EXIT (or,
/// on rejection, EXCEPTION) emission to (§4.2 "for async callables...").
pub enum CallOutcome {
    Value(Value),
    Pending(AsyncOutcome),
}

/// One exported function, already bound to a name for the trace event
/// `method` field.
#[derive(Clone)]
pub struct FunctionExport {
    pub name: String,
    pub call: Callable,
}

impl FunctionExport {
    #[must_use]
    pub fn new(name: impl Into<String>, call: Callable) -> Self {
        Self { name: name.into(), call }
    }
}

/// A constructible type's own methods (the "prototype/class surface",
/// §4.2) -- property accessors aren't represented here since they are
/// not wrapped.
#[derive(Clone)]
pub struct TypeExport {
    pub name: String,
    pub methods: Vec<FunctionExport>,
}

/// Reserved method names never wrapped regardless of host language:
/// the constructor, stringification, and the equality/hash/dispose
/// canon (§4.2).
pub const RESERVED_METHOD_NAMES: &[&str] =
    &["constructor", "toString", "equals", "hashCode", "dispose"];

/// One exported value from a loaded module: a callable, a constructible
/// type, or a plain record of mixed values (§4.2).
#[derive(Clone)]
pub enum Export {
    Function(FunctionExport),
    Type(TypeExport),
    Record(Vec<(String, Export)>),
}

/// A module as the host's loader resolved it: its selection-policy
/// candidate path plus its exported surface.
#[derive(Clone)]
pub struct LoadedModule {
    pub path: String,
    pub exports: Vec<(String, Export)>,
}

impl LoadedModule {
    #[must_use]
    pub fn new(path: impl Into<String>, exports: Vec<(String, Export)>) -> Self {
        Self {
            path: path.into(),
            exports,
        }
    }
}
