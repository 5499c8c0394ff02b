//! The JSONL Query Session (§3, §4.5): opening a FlowTrace main log into
//! an in-memory, read-only, shareable view and running structured reads
//! over it without ever touching the file again.
//!
//! # Modules
//!
//! - [`session`] -- `open`: parse a main log into rows plus a schema index
//! - [`filter`] -- the `filter` mini-DSL, field projection, single-field sort
//! - [`query`] -- `search`, `aggregate`, `topK`, `timeline`, `flow`, `errors`,
//!   `sample`, `export`
//! - [`expand`] -- `expand`, `searchExpanded`: sidecar resolution for
//!   segmented rows

pub mod expand;
pub mod filter;
pub mod query;
pub mod session;

use camino::Utf8Path;
use dashmap::DashMap;

pub use expand::{expand, search_expanded, ExpandParams};
pub use filter::Filter;
pub use query::{
    aggregate, errors, export, sample, search, timeline, top_k, AggOp, AggregateParams,
    AggregateRow, ExportFormat, FlowRow, SearchParams, TimelineParams, TopKParams, TopKRow,
};
pub use session::Session;

use flowtrace_utils::error::{FlowTraceError, QueryError};

/// The result of `expand`: the row as originally logged, the parsed
/// sidecar content when the row was segmented, any `truncatedFields`
/// metadata carried on the row, and a human-readable summary of which
/// case applied (§4.5).
#[derive(Debug, Clone)]
pub struct ExpandResult {
    pub truncated_log: serde_json::Value,
    pub full_log: Option<serde_json::Value>,
    pub truncated_fields: Option<serde_json::Value>,
    pub message: String,
}

/// A handle to a schema index derived from an opened `Session`, returned
/// by `schema()` (§4.5 `schema`: "reports field names and the fraction
/// of rows in which each appears, plus one representative sample row").
#[derive(Debug, Clone)]
pub struct SchemaReport {
    pub row_count: usize,
    pub field_coverage: Vec<(String, f64)>,
    pub sample_row: Option<serde_json::Value>,
    pub malformed_lines: usize,
}

/// The registry of open sessions a FlowTrace query surface holds for
/// its lifetime (§3 "Query Session"). `open` hands back an opaque id;
/// every other operation takes that id and looks the session up, so a
/// session is safe to share and query concurrently from multiple
/// callers once opened.
#[derive(Default)]
pub struct QuerySession {
    sessions: DashMap<String, Session>,
}

impl QuerySession {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// `open(path)`: parse the log at `path` and register it under a new
    /// session id derived from the path's content hash, so re-opening
    /// the same log twice concurrently yields distinct handles without
    /// colliding ids.
    pub fn open(&self, path: &Utf8Path) -> Result<String, FlowTraceError> {
        let id = session_id(path);
        let session = Session::load(id.clone(), path)?;
        self.sessions.insert(id.clone(), session);
        Ok(id)
    }

    /// `close(sessionId)`: drop the in-memory row set. Closing an
    /// unknown id is a no-op, matching the degrade-don't-propagate
    /// posture of the rest of the instrumentation surface, but every
    /// other operation below still raises `SessionNotFound` since a
    /// caller querying a session it thinks is open must not get a
    /// silent empty answer.
    pub fn close(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&Session) -> T,
    ) -> Result<T, FlowTraceError> {
        self.sessions
            .get(session_id)
            .map(|entry| f(entry.value()))
            .ok_or_else(|| FlowTraceError::Query(QueryError::SessionNotFound(session_id.to_string())))
    }

    /// `schema(sessionId)` (§4.5).
    pub fn schema(&self, session_id: &str) -> Result<SchemaReport, FlowTraceError> {
        self.with_session(session_id, |session| {
            let row_count = session.rows.len();
            let field_coverage = session
                .schema
                .iter()
                .map(|(field, count)| {
                    let coverage = if row_count == 0 {
                        0.0
                    } else {
                        *count as f64 / row_count as f64
                    };
                    (field.clone(), coverage)
                })
                .collect();
            SchemaReport {
                row_count,
                field_coverage,
                sample_row: session.sample_row().cloned(),
                malformed_lines: session.malformed_lines,
            }
        })
    }

    pub fn search(
        &self,
        session_id: &str,
        params: &SearchParams,
    ) -> Result<Vec<serde_json::Value>, FlowTraceError> {
        self.with_session(session_id, |session| search(session, params))
    }

    pub fn aggregate(
        &self,
        session_id: &str,
        params: &AggregateParams,
    ) -> Result<Vec<AggregateRow>, FlowTraceError> {
        self.with_session(session_id, |session| aggregate(session, params))
    }

    pub fn top_k(&self, session_id: &str, params: &TopKParams) -> Result<Vec<TopKRow>, FlowTraceError> {
        self.with_session(session_id, |session| top_k(session, params))
    }

    pub fn timeline(
        &self,
        session_id: &str,
        params: &TimelineParams,
    ) -> Result<Vec<serde_json::Value>, FlowTraceError> {
        self.with_session(session_id, |session| timeline(session, params))
    }

    pub fn flow(&self, session_id: &str, keys: &[String]) -> Result<Vec<FlowRow>, FlowTraceError> {
        self.with_session(session_id, |session| flow(session, keys))
    }

    pub fn errors(
        &self,
        session_id: &str,
        filter: Option<&str>,
    ) -> Result<Vec<serde_json::Value>, FlowTraceError> {
        self.with_session(session_id, |session| errors(session, filter))
    }

    pub fn sample(
        &self,
        session_id: &str,
        filter: Option<&str>,
        limit: usize,
    ) -> Result<Vec<serde_json::Value>, FlowTraceError> {
        self.with_session(session_id, |session| sample(session, filter, limit))
    }

    pub fn export(
        &self,
        session_id: &str,
        filter: Option<&str>,
        fields: Option<&[String]>,
        to: ExportFormat,
    ) -> Result<String, FlowTraceError> {
        self.with_session(session_id, |session| export(session, filter, fields, to))
    }

    pub fn expand(&self, session_id: &str, params: &ExpandParams) -> Result<ExpandResult, FlowTraceError> {
        self.with_session(session_id, |session| expand(session, params))?
    }

    pub fn search_expanded(
        &self,
        session_id: &str,
        params: &SearchParams,
        auto_expand: bool,
    ) -> Result<Vec<serde_json::Value>, FlowTraceError> {
        self.with_session(session_id, |session| search_expanded(session, params, auto_expand))
    }
}

fn session_id(path: &Utf8Path) -> String {
    let hash = blake3::hash(path.as_str().as_bytes());
    hash.to_hex()[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_log(dir: &std::path::Path, lines: &[&str]) -> camino::Utf8PathBuf {
        let path = dir.join("flowtrace.jsonl");
        std::fs::write(&path, lines.join("\n")).unwrap();
        camino::Utf8PathBuf::from_path_buf(path).unwrap()
    }

    #[test]
    fn open_then_search_round_trips_through_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(
            dir.path(),
            &[r#"{"timestamp":1,"event":"ENTER","method":"f"}"#],
        );
        let registry = QuerySession::new();
        let id = registry.open(&path).unwrap();

        let rows = registry.search(&id, &SearchParams::default()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn unknown_session_id_is_session_not_found() {
        let registry = QuerySession::new();
        let err = registry.search("nope", &SearchParams::default()).unwrap_err();
        assert!(matches!(
            err,
            FlowTraceError::Query(QueryError::SessionNotFound(_))
        ));
    }

    #[test]
    fn close_removes_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(dir.path(), &[r#"{"timestamp":1}"#]);
        let registry = QuerySession::new();
        let id = registry.open(&path).unwrap();
        registry.close(&id);
        assert!(registry.search(&id, &SearchParams::default()).is_err());
    }

    #[test]
    fn schema_reports_coverage_and_sample_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(
            dir.path(),
            &[
                r#"{"timestamp":1,"event":"ENTER"}"#,
                r#"{"timestamp":2,"event":"EXIT","result":"1"}"#,
            ],
        );
        let registry = QuerySession::new();
        let id = registry.open(&path).unwrap();
        let schema = registry.schema(&id).unwrap();
        assert_eq!(schema.row_count, 2);
        let (_, coverage) = schema
            .field_coverage
            .iter()
            .find(|(field, _)| field == "result")
            .unwrap();
        assert!((*coverage - 0.5).abs() < f64::EPSILON);
    }
}
