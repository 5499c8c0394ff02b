//! The filter mini-DSL, field projection, and single-field sort shared by
//! every read operation in §4.5 (`search`, `timeline`, `errors`,
//! `sample`, `export`, `searchExpanded`).
//!
//! A filter string is whitespace-separated clauses, ANDed together, each
//! evaluated line-oriented over the row's JSON text (§4.5 "filter is a
//! substring match over the JSON text of each row"):
//!
//! - `field=value`  -- the row has a top-level field `field` whose
//!   stringified value equals `value` exactly.
//! - `field~value`  -- the row has a top-level field `field` whose
//!   stringified value contains `value` as a substring.
//! - `value`        -- `value` appears anywhere in the row's compact
//!   JSON serialization (the bare substring match the spec names).
//!
//! An empty filter matches every row.

/// One ANDed clause of a filter string.
enum Clause {
    FieldEquals { field: String, value: String },
    FieldContains { field: String, value: String },
    Substring(String),
}

/// A parsed filter, ready to evaluate against rows.
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    #[must_use]
    pub fn parse(filter: Option<&str>) -> Self {
        let clauses = filter
            .unwrap_or("")
            .split_whitespace()
            .map(parse_clause)
            .collect();
        Self { clauses }
    }

    /// Whether `row` satisfies every clause.
    #[must_use]
    pub fn matches(&self, row: &serde_json::Value) -> bool {
        self.clauses.iter().all(|clause| clause_matches(clause, row))
    }
}

fn parse_clause(token: &str) -> Clause {
    if let Some((field, value)) = token.split_once('=') {
        if !field.is_empty() {
            return Clause::FieldEquals {
                field: field.to_string(),
                value: value.to_string(),
            };
        }
    }
    if let Some((field, value)) = token.split_once('~') {
        if !field.is_empty() {
            return Clause::FieldContains {
                field: field.to_string(),
                value: value.to_string(),
            };
        }
    }
    Clause::Substring(token.to_string())
}

fn clause_matches(clause: &Clause, row: &serde_json::Value) -> bool {
    match clause {
        Clause::FieldEquals { field, value } => field_text(row, field).is_some_and(|v| v == *value),
        Clause::FieldContains { field, value } => {
            field_text(row, field).is_some_and(|v| v.contains(value.as_str()))
        }
        Clause::Substring(needle) => row_text(row).contains(needle.as_str()),
    }
}

/// The stringified form of a field's value: strings are taken bare (not
/// re-quoted), everything else is its compact JSON text.
fn field_text(row: &serde_json::Value, field: &str) -> Option<String> {
    row.get(field).map(|v| match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// The row's compact JSON serialization, the text a bare substring
/// clause is matched against.
fn row_text(row: &serde_json::Value) -> String {
    serde_json::to_string(row).unwrap_or_default()
}

/// Project a row down to the given field subset; `None`/empty fields
/// means "keep every field" (§4.5 "`fields` selects fields into a subset
/// record").
#[must_use]
pub fn project(row: &serde_json::Value, fields: Option<&[String]>) -> serde_json::Value {
    let Some(fields) = fields.filter(|f| !f.is_empty()) else {
        return row.clone();
    };
    let mut out = serde_json::Map::with_capacity(fields.len());
    for field in fields {
        if let Some(value) = row.get(field) {
            out.insert(field.clone(), value.clone());
        }
    }
    serde_json::Value::Object(out)
}

/// Sort `rows` in place by a single field's string comparison (§4.5
/// "sort orders by a single field using string comparison"). Rows
/// missing the field sort after rows that have it.
pub fn sort_by_field(rows: &mut [serde_json::Value], field: &str) {
    rows.sort_by(|a, b| {
        let ka = field_text(a, field);
        let kb = field_text(b, field);
        match (ka, kb) {
            (Some(ka), Some(kb)) => ka.cmp(&kb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
}
