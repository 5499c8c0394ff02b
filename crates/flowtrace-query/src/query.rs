//! Read operations over a loaded `Session` (§4.5): `search`, `aggregate`,
//! `topK`, `timeline`, `flow`, `errors`, `sample`, `export`.
//!
//! Every function here is pure over `session.rows` -- none mutates the
//! session, which is the "query purity" testable property (§8): the
//! same inputs against the same session always return equal results.

use once_cell::sync::Lazy;
use regex::Regex;

use flowtrace_utils::error::{FlowTraceError, QueryError};

use crate::filter::{project, sort_by_field, Filter};
use crate::session::Session;

/// `search(sessionId, {filter, fields, limit, sort})` parameters.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub filter: Option<String>,
    pub fields: Option<Vec<String>>,
    pub limit: Option<usize>,
    pub sort: Option<String>,
}

/// Deterministic ordering (§4.5): file order unless `sort` is supplied.
pub fn search(session: &Session, params: &SearchParams) -> Vec<serde_json::Value> {
    let filter = Filter::parse(params.filter.as_deref());
    let mut rows: Vec<serde_json::Value> = session
        .rows
        .iter()
        .filter(|row| filter.matches(row))
        .cloned()
        .collect();

    if let Some(field) = &params.sort {
        sort_by_field(&mut rows, field);
    }

    if let Some(limit) = params.limit {
        rows.truncate(limit);
    }

    rows.iter()
        .map(|row| project(row, params.fields.as_deref()))
        .collect()
}

/// The aggregate metric: `count`, `sum`, `avg`, `max`, `min` over a
/// numeric field (§4.5 "non-numeric values are excluded from numeric
/// aggregates"). `Count` ignores `field`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

#[derive(Debug, Clone)]
pub struct AggregateParams {
    pub group_by: Vec<String>,
    pub op: AggOp,
    /// The numeric field the metric is computed over; unused for `Count`.
    pub field: Option<String>,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: String,
    pub value: f64,
}

/// `aggregate(sessionId, {groupBy, metric, filter})` (§4.5): group keys
/// are the pipe-joined string forms of the groupBy fields.
pub fn aggregate(session: &Session, params: &AggregateParams) -> Vec<AggregateRow> {
    let filter = Filter::parse(params.filter.as_deref());
    let mut groups: indexmap_like::Groups = indexmap_like::Groups::new();

    for row in session.rows.iter().filter(|row| filter.matches(row)) {
        let key = group_key(row, &params.group_by);
        let numeric = params
            .field
            .as_deref()
            .and_then(|field| row.get(field))
            .and_then(serde_json::Value::as_f64);
        groups.push(key, numeric);
    }

    groups
        .into_rows(params.op)
        .into_iter()
        .collect()
}

fn group_key(row: &serde_json::Value, fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| match row.get(f) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// A tiny ordered multimap good enough for aggregate's group-by: insertion
/// order in, one row per distinct key out. Not a public API; kept local
/// to avoid pulling in a dependency for something this small.
mod indexmap_like {
    use super::AggOp;
    use std::collections::HashMap;

    pub struct Groups {
        order: Vec<String>,
        values: HashMap<String, Vec<Option<f64>>>,
    }

    impl Groups {
        pub fn new() -> Self {
            Self {
                order: Vec::new(),
                values: HashMap::new(),
            }
        }

        pub fn push(&mut self, key: String, value: Option<f64>) {
            let entry = self.values.entry(key.clone()).or_insert_with(|| {
                self.order.push(key.clone());
                Vec::new()
            });
            entry.push(value);
        }

        pub fn into_rows(self, op: AggOp) -> Vec<super::AggregateRow> {
            self.order
                .into_iter()
                .map(|key| {
                    let samples = &self.values[&key];
                    let value = compute(op, samples);
                    super::AggregateRow { key, value }
                })
                .collect()
        }
    }

    fn compute(op: AggOp, samples: &[Option<f64>]) -> f64 {
        match op {
            AggOp::Count => samples.len() as f64,
            AggOp::Sum => numeric(samples).sum(),
            AggOp::Avg => {
                let values: Vec<f64> = numeric(samples).collect();
                if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                }
            }
            AggOp::Max => numeric(samples).fold(f64::NEG_INFINITY, f64::max),
            AggOp::Min => numeric(samples).fold(f64::INFINITY, f64::min),
        }
    }

    fn numeric(samples: &[Option<f64>]) -> impl Iterator<Item = f64> + '_ {
        samples.iter().filter_map(|v| *v)
    }
}

#[derive(Debug, Clone)]
pub struct TopKParams {
    pub by_field: String,
    pub k: usize,
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopKRow {
    pub value: String,
    pub count: usize,
}

/// `topK(sessionId, {byField, k, filter})`: frequency count, descending.
pub fn top_k(session: &Session, params: &TopKParams) -> Vec<TopKRow> {
    let filter = Filter::parse(params.filter.as_deref());
    let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for row in session.rows.iter().filter(|row| filter.matches(row)) {
        let Some(value) = row.get(&params.by_field) else {
            continue;
        };
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if !counts.contains_key(&text) {
            order.push(text.clone());
        }
        *counts.entry(text).or_insert(0) += 1;
    }

    let mut rows: Vec<TopKRow> = order
        .into_iter()
        .map(|value| {
            let count = counts[&value];
            TopKRow { value, count }
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    rows.truncate(params.k);
    rows
}

#[derive(Debug, Clone, Default)]
pub struct TimelineParams {
    pub filter: Option<String>,
    pub fields: Option<Vec<String>>,
}

/// `timeline(sessionId, {filter, fields})`: like `search`, sorted by
/// `timestamp` ascending (§4.5).
pub fn timeline(session: &Session, params: &TimelineParams) -> Vec<serde_json::Value> {
    search(
        session,
        &SearchParams {
            filter: params.filter.clone(),
            fields: params.fields.clone(),
            limit: None,
            sort: Some("timestamp".to_string()),
        },
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowRow {
    pub key: String,
    pub count: usize,
    pub first: i64,
    pub last: i64,
}

/// `flow(sessionId, {keys})` (§4.5): groups events by the pipe-joined
/// tuple of the selected correlation keys, reporting first/last
/// timestamps. A key whose every component is empty is excluded (§4.5
/// "Keys with all-empty components are excluded").
pub fn flow(session: &Session, keys: &[String]) -> Vec<FlowRow> {
    let mut order: Vec<String> = Vec::new();
    let mut acc: std::collections::HashMap<String, (usize, i64, i64)> =
        std::collections::HashMap::new();

    for row in &session.rows {
        let components: Vec<String> = keys
            .iter()
            .map(|k| match row.get(k) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) if !other.is_null() => other.to_string(),
                _ => String::new(),
            })
            .collect();
        if components.iter().all(String::is_empty) {
            continue;
        }
        let key = components.join("|");
        let ts = row.get("timestamp").and_then(serde_json::Value::as_i64).unwrap_or(0);
        let entry = acc.entry(key.clone()).or_insert_with(|| {
            order.push(key.clone());
            (0, ts, ts)
        });
        entry.0 += 1;
        entry.1 = entry.1.min(ts);
        entry.2 = entry.2.max(ts);
    }

    order
        .into_iter()
        .map(|key| {
            let (count, first, last) = acc[&key];
            FlowRow { key, count, first, last }
        })
        .collect()
}

/// Error-keyword regex over the `result` field (§4.5 `errors`): the
/// source's hardcoded pattern, case-insensitive. Whether EXCEPTION rows
/// (which populate `exception`, not `result`) should also match is an
/// open question the source leaves unclear (§9) -- this implementation
/// matches the spec text literally and only inspects `result`.
static ERROR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)error|exception|fail|500|NOK").expect("static pattern is valid")
});

const ERRORS_CAP: usize = 500;

/// `errors(sessionId, {filter})`: rows whose `result` field matches the
/// error-keyword regex, capped at 500 (§4.5).
pub fn errors(session: &Session, filter: Option<&str>) -> Vec<serde_json::Value> {
    let filter = Filter::parse(filter);
    session
        .rows
        .iter()
        .filter(|row| filter.matches(row))
        .filter(|row| {
            row.get("result")
                .and_then(serde_json::Value::as_str)
                .is_some_and(|r| ERROR_PATTERN.is_match(r))
        })
        .take(ERRORS_CAP)
        .cloned()
        .collect()
}

/// `sample(sessionId, {filter, limit})`: head-of-matches up to `limit`.
pub fn sample(session: &Session, filter: Option<&str>, limit: usize) -> Vec<serde_json::Value> {
    let filter = Filter::parse(filter);
    session
        .rows
        .iter()
        .filter(|row| filter.matches(row))
        .take(limit)
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = FlowTraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(FlowTraceError::Query(QueryError::UnsupportedExportFormat(
                other.to_string(),
            ))),
        }
    }
}

/// `export(sessionId, {filter, fields, to}) -> string` (§4.5): CSV uses
/// the column set of the first projected row.
pub fn export(
    session: &Session,
    filter: Option<&str>,
    fields: Option<&[String]>,
    to: ExportFormat,
) -> String {
    let filter_parsed = Filter::parse(filter);
    let rows: Vec<serde_json::Value> = session
        .rows
        .iter()
        .filter(|row| filter_parsed.matches(row))
        .map(|row| project(row, fields))
        .collect();

    match to {
        ExportFormat::Json => serde_json::to_string(&rows).unwrap_or_else(|_| "[]".to_string()),
        ExportFormat::Csv => export_csv(&rows),
    }
}

fn export_csv(rows: &[serde_json::Value]) -> String {
    let Some(first) = rows.first().and_then(serde_json::Value::as_object) else {
        return String::new();
    };
    let columns: Vec<String> = first.keys().cloned().collect();

    let mut out = String::new();
    out.push_str(&columns.iter().map(|c| csv_escape(c)).collect::<Vec<_>>().join(","));
    out.push('\n');
    for row in rows {
        let fields: Vec<String> = columns
            .iter()
            .map(|c| {
                row.get(c)
                    .map(|v| match v {
                        serde_json::Value::String(s) => csv_escape(s),
                        other => csv_escape(&other.to_string()),
                    })
                    .unwrap_or_default()
            })
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn session_from(lines: &[&str]) -> (tempfile::TempDir, Session) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowtrace.jsonl");
        std::fs::write(&path, lines.join("\n")).unwrap();
        let session =
            Session::load("s1".to_string(), &Utf8PathBuf::from_path_buf(path).unwrap()).unwrap();
        (dir, session)
    }

    fn calls(method: &str, duration: i64) -> String {
        format!(
            r#"{{"timestamp":1,"event":"EXIT","method":"{method}","durationMicros":{duration}}}"#
        )
    }

    #[test]
    fn aggregate_computes_average_per_group() {
        let lines = vec![calls("a", 10), calls("a", 20), calls("b", 100)];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (_dir, session) = session_from(&refs);
        let rows = aggregate(
            &session,
            &AggregateParams {
                group_by: vec!["method".to_string()],
                op: AggOp::Avg,
                field: Some("durationMicros".to_string()),
                filter: None,
            },
        );
        let a = rows.iter().find(|r| r.key == "a").unwrap();
        let b = rows.iter().find(|r| r.key == "b").unwrap();
        assert!((a.value - 15.0).abs() < f64::EPSILON);
        assert!((b.value - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn top_k_orders_by_frequency_descending() {
        let lines = vec![calls("a", 1), calls("a", 1), calls("b", 1)];
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (_dir, session) = session_from(&refs);
        let rows = top_k(
            &session,
            &TopKParams {
                by_field: "method".to_string(),
                k: 10,
                filter: None,
            },
        );
        assert_eq!(rows[0].value, "a");
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[1].value, "b");
    }

    #[test]
    fn flow_groups_by_correlation_key_and_tracks_first_last() {
        let lines = vec![
            r#"{"timestamp":5,"requestId":"r1"}"#,
            r#"{"timestamp":10,"requestId":"r1"}"#,
            r#"{"timestamp":7,"requestId":"r2"}"#,
            r#"{"timestamp":1,"requestId":""}"#,
        ];
        let (_dir, session) = session_from(&lines);
        let rows = flow(&session, &["requestId".to_string()]);
        assert_eq!(rows.len(), 2);
        let r1 = rows.iter().find(|r| r.key == "r1").unwrap();
        assert_eq!(r1.count, 2);
        assert_eq!(r1.first, 5);
        assert_eq!(r1.last, 10);
    }

    #[test]
    fn errors_matches_keyword_regex_over_result_field_only() {
        let lines = vec![
            r#"{"timestamp":1,"result":"Internal error occurred"}"#,
            r#"{"timestamp":2,"result":"ok"}"#,
            r#"{"timestamp":3,"exception":{"type":"E","message":"boom"}}"#,
        ];
        let (_dir, session) = session_from(&lines);
        let rows = errors(&session, None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["timestamp"], 1);
    }

    #[test]
    fn export_csv_uses_first_rows_columns() {
        let lines = vec![r#"{"a":1,"b":2}"#, r#"{"a":3,"b":4}"#];
        let (_dir, session) = session_from(&lines);
        let csv = export(&session, None, None, ExportFormat::Csv);
        let mut lines_out = csv.lines();
        assert_eq!(lines_out.next(), Some("a,b"));
        assert_eq!(lines_out.next(), Some("1,2"));
        assert_eq!(lines_out.next(), Some("3,4"));
    }

    #[test]
    fn timeline_sorts_ascending_by_timestamp() {
        let lines = vec![r#"{"timestamp":"20"}"#, r#"{"timestamp":"3"}"#];
        let (_dir, session) = session_from(&lines);
        let rows = timeline(&session, &TimelineParams::default());
        assert_eq!(rows[0]["timestamp"], "20");
        assert_eq!(rows[1]["timestamp"], "3");
    }
}
