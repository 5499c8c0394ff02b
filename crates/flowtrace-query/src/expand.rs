//! `expand` and `searchExpanded` (§4.5): recovering the full-fidelity
//! record behind a segmented row's sidecar file.

use camino::Utf8Path;

use flowtrace_utils::error::{FlowTraceError, QueryError};

use crate::query::SearchParams;
use crate::session::Session;
use crate::{search, ExpandResult};

/// `expand(sessionId, {timestamp, event?})` parameters.
#[derive(Debug, Clone, Default)]
pub struct ExpandParams {
    pub timestamp: i64,
    pub event: Option<String>,
}

/// Locate the unique event by timestamp (optionally disambiguated by
/// event kind). If it is not segmented, echo the row with a message;
/// otherwise read and return the sidecar's parsed content. Fails with
/// `QueryError::EventNotFound`/`SegmentNotFound` per §4.5.
pub fn expand(session: &Session, params: &ExpandParams) -> Result<ExpandResult, FlowTraceError> {
    let candidates: Vec<&serde_json::Value> = session
        .rows
        .iter()
        .filter(|row| row.get("timestamp").and_then(serde_json::Value::as_i64) == Some(params.timestamp))
        .filter(|row| match &params.event {
            Some(event) => row.get("event").and_then(serde_json::Value::as_str) == Some(event.as_str()),
            None => true,
        })
        .collect();

    let Some(row) = candidates.first() else {
        return Err(FlowTraceError::Query(QueryError::EventNotFound {
            timestamp: params.timestamp,
            event: params.event.clone(),
        }));
    };
    let row = (*row).clone();

    let Some(full_log_file) = row.get("fullLogFile").and_then(serde_json::Value::as_str) else {
        return Ok(ExpandResult {
            truncated_log: row.clone(),
            full_log: None,
            truncated_fields: row.get("truncatedFields").cloned(),
            message: "event is not segmented; truncated_log is already complete".to_string(),
        });
    };

    let sidecar_path = session.base_dir.join(full_log_file_relative(full_log_file));
    let sidecar_text = std::fs::read_to_string(sidecar_path.as_std_path()).map_err(|_| {
        FlowTraceError::Query(QueryError::SegmentNotFound(sidecar_path.to_string()))
    })?;
    let full_log: serde_json::Value = serde_json::from_str(&sidecar_text).map_err(|e| {
        FlowTraceError::Query(QueryError::SegmentUnreadable {
            path: sidecar_path.to_string(),
            reason: e.to_string(),
        })
    })?;

    Ok(ExpandResult {
        truncated_log: row.clone(),
        full_log: Some(full_log),
        truncated_fields: row.get("truncatedFields").cloned(),
        message: "event was segmented; full_log holds the untruncated record".to_string(),
    })
}

/// A `fullLogFile` value is recorded relative to the main log's own
/// directory (§3 "Segment File... Filename"); resolve it against the
/// session's `base_dir` regardless of whether it was stored with a
/// leading segment-directory component.
fn full_log_file_relative(value: &str) -> &Utf8Path {
    Utf8Path::new(value)
}

/// `searchExpanded(sessionId, {filter, fields, limit, autoExpand})`
/// (§4.5): as `search`, but when `autoExpand` is true every segmented row
/// is augmented with `_expandedData` holding the parsed sidecar. Per-row
/// expansion failures are swallowed and the row is returned as-is.
pub fn search_expanded(
    session: &Session,
    params: &SearchParams,
    auto_expand: bool,
) -> Vec<serde_json::Value> {
    let rows = search(session, params);
    if !auto_expand {
        return rows;
    }

    rows.into_iter()
        .map(|row| {
            let Some(full_log_file) = row.get("fullLogFile").and_then(serde_json::Value::as_str) else {
                return row;
            };
            let sidecar_path = session.base_dir.join(full_log_file_relative(full_log_file));
            let Ok(text) = std::fs::read_to_string(sidecar_path.as_std_path()) else {
                return row;
            };
            let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&text) else {
                return row;
            };
            let mut augmented = row;
            if let Some(obj) = augmented.as_object_mut() {
                obj.insert("_expandedData".to_string(), parsed);
            }
            augmented
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn session_with_sidecar(dir: &std::path::Path) -> Session {
        let segs = dir.join("flowtrace-jsonsl");
        std::fs::create_dir_all(&segs).unwrap();
        std::fs::write(
            segs.join("flowtrace-1000-EXIT.json"),
            r#"{"timestamp":1000,"event":"EXIT","result":"the full long value"}"#,
        )
        .unwrap();

        let log_path = dir.join("flowtrace.jsonl");
        std::fs::write(
            &log_path,
            concat!(
                r#"{"timestamp":1000,"event":"EXIT","result":"the ful…(truncated)","#,
                r#""truncatedFields":{"result":{"originalLength":5000,"threshold":4}},"#,
                r#""fullLogFile":"flowtrace-jsonsl/flowtrace-1000-EXIT.json"}"#,
            ),
        )
        .unwrap();

        Session::load("s1".to_string(), &Utf8PathBuf::from_path_buf(log_path).unwrap()).unwrap()
    }

    #[test]
    fn expand_reads_sidecar_for_segmented_event() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_sidecar(dir.path());

        let result = expand(
            &session,
            &ExpandParams {
                timestamp: 1000,
                event: Some("EXIT".to_string()),
            },
        )
        .unwrap();

        assert_eq!(
            result.full_log.unwrap()["result"],
            "the full long value"
        );
    }

    #[test]
    fn expand_echoes_row_when_not_segmented() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("flowtrace.jsonl");
        std::fs::write(&log_path, r#"{"timestamp":1,"event":"ENTER"}"#).unwrap();
        let session =
            Session::load("s1".to_string(), &Utf8PathBuf::from_path_buf(log_path).unwrap())
                .unwrap();

        let result = expand(
            &session,
            &ExpandParams {
                timestamp: 1,
                event: None,
            },
        )
        .unwrap();
        assert!(result.full_log.is_none());
    }

    #[test]
    fn expand_missing_timestamp_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("flowtrace.jsonl");
        std::fs::write(&log_path, r#"{"timestamp":1,"event":"ENTER"}"#).unwrap();
        let session =
            Session::load("s1".to_string(), &Utf8PathBuf::from_path_buf(log_path).unwrap())
                .unwrap();

        let err = expand(
            &session,
            &ExpandParams {
                timestamp: 999,
                event: None,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            FlowTraceError::Query(QueryError::EventNotFound { .. })
        ));
    }

    #[test]
    fn search_expanded_augments_segmented_rows_with_expanded_data() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_sidecar(dir.path());

        let rows = search_expanded(&session, &SearchParams::default(), true);
        assert_eq!(rows[0]["_expandedData"]["result"], "the full long value");
    }

    #[test]
    fn search_expanded_without_auto_expand_leaves_rows_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let session = session_with_sidecar(dir.path());

        let rows = search_expanded(&session, &SearchParams::default(), false);
        assert!(rows[0].get("_expandedData").is_none());
    }
}
