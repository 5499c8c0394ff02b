//! Segmentation: the size-triggered sidecar write that keeps the main
//! log line-length-bounded while preserving full fidelity (§4.4, the
//! component's hard part).

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

use flowtrace_types::{EventKind, TraceEvent, TruncatedField, segment_filename};
use flowtrace_utils::atomic_write::write_file_atomic;
use flowtrace_utils::paths::ensure_dir_all;

const TRUNCATION_MARKER: &str = "…(truncated)";

/// Inspect `args`/`result` on a fully-built event; for each whose
/// serialized length exceeds `threshold`, write the complete record to a
/// sidecar file and replace the inline field with a threshold-prefixed
/// truncation marker plus the `truncatedFields`/`fullLogFile` metadata.
///
/// Returns the (possibly truncated) event destined for the main log.
/// Segmentation is idempotent per event: the sidecar directory is
/// created on demand and the filename embeds the event's own timestamp
/// and kind, so concurrent producers never contend on the same path
/// (colliders -- two emissions in the same millisecond, same kind -- are
/// last-write-wins, a documented acceptable edge per §4.4).
pub fn segment_if_oversize(
    event: TraceEvent,
    segment_dir: &Utf8Path,
    threshold: u32,
) -> std::io::Result<TraceEvent> {
    let mut event = event;
    let threshold = threshold as usize;

    let overflowing: Vec<(&'static str, String)> = [
        ("args", event.args.clone()),
        ("result", event.result.clone()),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|v| (name, v)))
    .filter(|(_, v)| v.len() > threshold)
    .collect();

    if overflowing.is_empty() {
        return Ok(event);
    }

    ensure_dir_all(segment_dir.as_std_path())?;
    let filename = segment_filename(event.timestamp, event.event);
    let sidecar_path: Utf8PathBuf = segment_dir.join(&filename);

    let full_record = event.clone().without_segmentation_markers();
    let pretty = serde_json::to_string_pretty(&full_record)
        .unwrap_or_else(|_| "{}".to_string());
    write_file_atomic(&sidecar_path, &pretty)
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let mut truncated_fields = BTreeMap::new();
    for (field, original) in &overflowing {
        let original_length = original.len();
        let prefix: String = original.chars().take(threshold).collect();
        let marker = format!("{prefix}{TRUNCATION_MARKER}");
        match *field {
            "args" => event.args = Some(marker),
            "result" => event.result = Some(marker),
            _ => unreachable!(),
        }
        truncated_fields.insert(
            (*field).to_string(),
            TruncatedField {
                original_length,
                threshold,
            },
        );
    }
    event.truncated_fields = Some(truncated_fields);
    event.full_log_file = Some(format!("{}/{}", segment_dir.as_str(), filename));

    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtrace_types::EventKind as Ek;

    fn base_event(args: Option<String>, result: Option<String>) -> TraceEvent {
        TraceEvent {
            timestamp: 1_000,
            event: Ek::Exit,
            thread: "main".into(),
            class: "C".into(),
            method: "f".into(),
            args,
            result,
            exception: None,
            duration_micros: Some(1),
            duration_millis: Some(1),
            truncated_fields: None,
            full_log_file: None,
        }
    }

    #[test]
    fn small_fields_are_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let segment_dir = Utf8PathBuf::from_path_buf(dir.path().join("segs")).unwrap();
        let event = base_event(Some("[1]".into()), Some("2".into()));
        let out = segment_if_oversize(event.clone(), &segment_dir, 1000).unwrap();
        assert_eq!(out, event);
        assert!(!segment_dir.exists());
    }

    #[test]
    fn oversize_result_is_segmented_with_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let segment_dir = Utf8PathBuf::from_path_buf(dir.path().join("segs")).unwrap();
        let long = "x".repeat(5000);
        let event = base_event(Some("[]".into()), Some(long.clone()));
        let out = segment_if_oversize(event, &segment_dir, 1000).unwrap();

        assert!(out.result.as_ref().unwrap().ends_with("…(truncated)"));
        let tf = out.truncated_fields.unwrap();
        assert_eq!(tf["result"].original_length, 5000);
        assert_eq!(tf["result"].threshold, 1000);

        let sidecar_path = dir.path().join("segs").join(format!("flowtrace-1000-{}.json", Ek::Exit));
        let sidecar = std::fs::read_to_string(&sidecar_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(parsed["result"], long);
        assert!(parsed.get("truncatedFields").is_none());
        assert!(parsed.get("fullLogFile").is_none());
    }
}
