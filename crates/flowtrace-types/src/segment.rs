use crate::event::EventKind;

/// Build the sidecar filename for a segmented event: §3 "Filename:
/// `flowtrace-<timestamp>-<event>.json`".
///
/// Filenames embed the event's millisecond timestamp and kind so that
/// concurrent producers writing distinct events never contend on the same
/// path; two emissions within the same millisecond and same kind collide
/// (an open question in the source, resolved here as documented
/// last-write-wins — see `DESIGN.md`).
#[must_use]
pub fn segment_filename(timestamp: i64, event: EventKind) -> String {
    format!("flowtrace-{timestamp}-{event}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_embeds_timestamp_and_kind() {
        assert_eq!(
            segment_filename(1_635_789_012_345, EventKind::Exit),
            "flowtrace-1635789012345-EXIT.json"
        );
    }
}
