//! The value model the pipeline serializes arguments, results, and
//! exceptions through (§4.4 "Serialization rules for values").

use std::collections::HashSet;

/// A serializable argument/return value, shallow enough for the host
/// bindings to build without depending on a concrete host type system.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    /// An ordered container (list/tuple/slice/array).
    Array(Vec<Value>),
    /// A record/struct/dict; `id` gives it a stable identity so the
    /// serializer can detect a cycle without relying on an actual
    /// circular Rust reference (which the host binding wouldn't have
    /// either -- it would pass down the host's own identity).
    Record { id: usize, fields: Vec<(String, Value)> },
    Function { name: String },
    Promise,
    Error { message: String },
}

impl Value {
    #[must_use]
    pub fn record(id: usize, fields: Vec<(String, Value)>) -> Self {
        Self::Record { id, fields }
    }
}

/// Per-argument serialized-length cap: 0 means "do not truncate at this
/// layer" (§4.4).
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions {
    pub max_arg_length: u32,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self { max_arg_length: 0 }
    }
}

/// Serialize a `Value` tree to a `serde_json::Value`, applying the
/// per-argument length cap to strings and falling back to a placeholder
/// for values that would otherwise loop (a visited-identity stack, so a
/// shared-but-acyclic reference visited twice on different branches is
/// NOT mistaken for a cycle -- only a true ancestor repeat is).
#[must_use]
pub fn serialize(value: &Value, opts: &SerializeOptions) -> serde_json::Value {
    let mut stack = Vec::new();
    serialize_inner(value, opts, &mut stack)
}

fn serialize_inner(value: &Value, opts: &SerializeOptions, stack: &mut Vec<usize>) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(cap_string(s, opts.max_arg_length)),
        Value::Array(items) => serde_json::Value::Array(
            items
                .iter()
                .map(|v| serialize_inner(v, opts, stack))
                .collect(),
        ),
        Value::Record { id, fields } => {
            if stack.contains(id) {
                // Circular object graph: fall back to the record's key
                // set rather than looping (§4.4, §9 "Circular object
                // graphs").
                return serde_json::Value::String(placeholder_for_fields(fields));
            }
            stack.push(*id);
            let mut map = serde_json::Map::with_capacity(fields.len());
            for (k, v) in fields {
                map.insert(k.clone(), serialize_inner(v, opts, stack));
            }
            stack.pop();
            serde_json::Value::Object(map)
        }
        Value::Function { name } => serde_json::Value::String(format!("<function {name}>")),
        Value::Promise => serde_json::Value::String("<Promise>".to_string()),
        Value::Error { message } => serde_json::Value::String(format!("<Error: {message}>")),
    }
}

fn placeholder_for_fields(fields: &[(String, Value)]) -> String {
    let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
    format!("<circular: {{{}}}>", keys.join(", "))
}

fn cap_string(s: &str, max_arg_length: u32) -> String {
    if max_arg_length == 0 {
        return s.to_string();
    }
    let max = max_arg_length as usize;
    if s.chars().count() <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max).collect();
    format!("{truncated}...")
}

/// Serialize an ordered argument/result list to the JSON text stored in
/// the `args`/`result` wire field: an array of the values in call order
/// (matching the wire example in §6, `"args":"[{\"name\":\"John\"}]"`),
/// empty array when there are none.
#[must_use]
pub fn serialize_list_to_text(values: &[(String, Value)], opts: &SerializeOptions) -> String {
    let array: Vec<serde_json::Value> = values
        .iter()
        .map(|(_, v)| serialize_inner(v, opts, &mut Vec::new()))
        .collect();
    serde_json::to_string(&serde_json::Value::Array(array)).unwrap_or_else(|_| "[]".to_string())
}

/// Serialize the named-return list a rewritten function's epilogue emits
/// on EXIT (§4.1 point 2: `{"result_i": __ft_ret_i}`) into the `result`
/// wire field's JSON text.
///
/// A single return collapses to its bare serialized value, matching the
/// wire example in §6 (`"result":"{\"id\":123}"`, not
/// `{"result_0":{"id":123}}`); two or more named returns serialize as an
/// object keyed by their names, since only then is there something for
/// the names to disambiguate.
#[must_use]
pub fn serialize_result_to_text(results: &[(String, Value)], opts: &SerializeOptions) -> String {
    match results {
        [(_, only)] => {
            let json = serialize_inner(only, opts, &mut Vec::new());
            serde_json::to_string(&json).unwrap_or_else(|_| "null".to_string())
        }
        many => {
            let mut map = serde_json::Map::with_capacity(many.len());
            for (name, v) in many {
                map.insert(name.clone(), serialize_inner(v, opts, &mut Vec::new()));
            }
            serde_json::to_string(&serde_json::Value::Object(map)).unwrap_or_else(|_| "{}".to_string())
        }
    }
}
