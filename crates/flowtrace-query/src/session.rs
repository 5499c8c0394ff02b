//! Loading a main log into an in-memory, read-only row set (§4.5 `open`).

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

use flowtrace_utils::error::{FlowTraceError, QueryError};

/// An opened, parsed, in-memory view of a main log plus its derived
/// schema index (§3 "Query Session"). Immutable after `load`: every
/// operation in `flowtrace-query` borrows a `Session` and must not
/// mutate it (§4.5 "Invariants... must not mutate it"), which is also
/// what makes it safe to share across concurrent readers.
pub struct Session {
    pub id: String,
    pub rows: Vec<serde_json::Value>,
    /// Field name -> number of rows in which it appears, the schema
    /// `open`/`schema` expose for callers to discover field availability.
    pub schema: BTreeMap<String, usize>,
    /// Directory containing the opened log, used to resolve a row's
    /// `fullLogFile` (recorded relative to it) in `expand`.
    pub base_dir: Utf8PathBuf,
    /// Lines that failed to parse as a single JSON object -- counted,
    /// never raised (§4.5, §7 `ParseError`).
    pub malformed_lines: usize,
}

impl Session {
    /// Parse `path` line by line. Blank lines are skipped; a line that
    /// is not a single valid JSON object is counted in
    /// `malformed_lines` and otherwise ignored. Fails with
    /// `QueryError::LogNotFound` when the path does not exist.
    pub fn load(id: String, path: &Utf8Path) -> Result<Self, FlowTraceError> {
        let text = std::fs::read_to_string(path).map_err(|_| {
            FlowTraceError::Query(QueryError::LogNotFound(path.to_string()))
        })?;

        let mut rows = Vec::new();
        let mut schema: BTreeMap<String, usize> = BTreeMap::new();
        let mut malformed_lines = 0usize;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(line) {
                Ok(value) if value.is_object() => {
                    if let Some(obj) = value.as_object() {
                        for key in obj.keys() {
                            *schema.entry(key.clone()).or_insert(0) += 1;
                        }
                    }
                    rows.push(value);
                }
                _ => malformed_lines += 1,
            }
        }

        let base_dir = path
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_else(|| Utf8PathBuf::from("."));

        Ok(Self {
            id,
            rows,
            schema,
            base_dir,
            malformed_lines,
        })
    }

    /// The first row, used by `schema` as a representative sample.
    #[must_use]
    pub fn sample_row(&self) -> Option<&serde_json::Value> {
        self.rows.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_log(dir: &std::path::Path, lines: &[&str]) -> Utf8PathBuf {
        let path = dir.join("flowtrace.jsonl");
        std::fs::write(&path, lines.join("\n")).unwrap();
        Utf8PathBuf::from_path_buf(path).unwrap()
    }

    #[test]
    fn loads_rows_and_merges_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(
            dir.path(),
            &[
                r#"{"timestamp":1,"event":"ENTER","method":"f"}"#,
                r#"{"timestamp":2,"event":"EXIT","method":"f","result":"1"}"#,
            ],
        );
        let session = Session::load("s1".to_string(), &path).unwrap();
        assert_eq!(session.rows.len(), 2);
        assert_eq!(session.schema["method"], 2);
        assert_eq!(session.schema["result"], 1);
        assert_eq!(session.malformed_lines, 0);
    }

    #[test]
    fn blank_lines_are_skipped_and_malformed_lines_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_log(
            dir.path(),
            &[
                r#"{"timestamp":1,"event":"ENTER"}"#,
                "",
                "not json",
                r#"{"timestamp":2,"event":"EXIT"}"#,
            ],
        );
        let session = Session::load("s1".to_string(), &path).unwrap();
        assert_eq!(session.rows.len(), 2);
        assert_eq!(session.malformed_lines, 1);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.jsonl")).unwrap();
        let err = Session::load("s1".to_string(), &path).unwrap_err();
        assert!(matches!(
            err,
            FlowTraceError::Query(QueryError::LogNotFound(_))
        ));
    }
}
