use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The three event kinds that bracket an instrumented call.
///
/// EXCEPTION is a specialization of EXIT: it carries exception metadata
/// in place of `result`, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Enter,
    Exit,
    Exception,
}

impl EventKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enter => "ENTER",
            Self::Exit => "EXIT",
            Self::Exception => "EXCEPTION",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENTER" => Ok(Self::Enter),
            "EXIT" => Ok(Self::Exit),
            "EXCEPTION" => Ok(Self::Exception),
            other => Err(format!("unknown event kind: {other}")),
        }
    }
}

/// Exception metadata carried by an EXCEPTION event in place of `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<Vec<String>>,
}

impl ExceptionInfo {
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack_trace: None,
        }
    }

    /// Attach up to `limit` stack frames (§3: "a bounded number of stack
    /// frames, default 3").
    #[must_use]
    pub fn with_stack_trace(mut self, frames: Vec<String>, limit: usize) -> Self {
        let mut frames = frames;
        frames.truncate(limit);
        self.stack_trace = if frames.is_empty() { None } else { Some(frames) };
        self
    }
}

/// Marker recorded when a field's serialized length exceeded the
/// segmentation threshold and was replaced by a truncation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncatedField {
    pub original_length: usize,
    pub threshold: usize,
}

/// A single trace event line, as it appears (or would appear, absent
/// segmentation) in the main JSONL log.
///
/// `args`/`result` hold JSON-encoded *strings*, not nested JSON values,
/// matching the wire format in §6: the instrumented program's argument
/// and return values are serialized once by the pipeline and stored as
/// opaque text so the main log's own parse never needs to recurse into
/// arbitrary user data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub timestamp: i64,
    pub event: EventKind,
    pub thread: String,
    pub class: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_micros: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_fields: Option<BTreeMap<String, TruncatedField>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_log_file: Option<String>,
}

impl TraceEvent {
    /// Strip the two segmentation marker fields, as `expand` must when
    /// comparing an expanded sidecar back against its main-log line
    /// (§8 "Segmentation equivalence").
    #[must_use]
    pub fn without_segmentation_markers(mut self) -> Self {
        self.truncated_fields = None;
        self.full_log_file = None;
        self
    }

    #[must_use]
    pub const fn is_segmented(&self) -> bool {
        self.full_log_file.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_through_json() {
        for kind in [EventKind::Enter, EventKind::Exit, EventKind::Exception] {
            let s = serde_json::to_string(&kind).unwrap();
            let back: EventKind = serde_json::from_str(&s).unwrap();
            assert_eq!(kind, back);
        }
    }

    #[test]
    fn event_serializes_with_camel_case_field_names() {
        let event = TraceEvent {
            timestamp: 1_635_789_012_345,
            event: EventKind::Exit,
            thread: "main".into(),
            class: "UserController".into(),
            method: "createUser".into(),
            args: Some("[{\"name\":\"John\"}]".into()),
            result: Some("{\"id\":123}".into()),
            exception: None,
            duration_micros: Some(222_000),
            duration_millis: Some(222),
            truncated_fields: None,
            full_log_file: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["durationMicros"], 222_000);
        assert_eq!(json["durationMillis"], 222);
        assert!(json.get("exception").is_none());
        assert!(json.get("truncatedFields").is_none());
    }

    #[test]
    fn exception_info_truncates_stack_to_limit() {
        let info = ExceptionInfo::new("ValueError", "boom").with_stack_trace(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            3,
        );
        assert_eq!(info.stack_trace.unwrap().len(), 3);
    }

    #[test]
    fn without_segmentation_markers_clears_both_fields() {
        let mut event = sample_event();
        event.full_log_file = Some("flowtrace-jsonsl/x.json".into());
        event.truncated_fields = Some(BTreeMap::new());
        let cleaned = event.without_segmentation_markers();
        assert!(cleaned.full_log_file.is_none());
        assert!(cleaned.truncated_fields.is_none());
    }

    fn sample_event() -> TraceEvent {
        TraceEvent {
            timestamp: 0,
            event: EventKind::Enter,
            thread: "main".into(),
            class: String::new(),
            method: "f".into(),
            args: None,
            result: None,
            exception: None,
            duration_micros: None,
            duration_millis: None,
            truncated_fields: None,
            full_log_file: None,
        }
    }
}
