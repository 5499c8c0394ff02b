//! Environment variable source: each option is read under a
//! `FLOWTRACE_`-prefixed name, per §6 "Options are supplied as
//! environment variables for hosts that prefer them".

use crate::model::FileConfig;

const PREFIX: &str = "FLOWTRACE";

fn var(name: &str) -> Option<String> {
    std::env::var(format!("{PREFIX}_{name}")).ok()
}

/// Read the full option set from environment variables into a
/// `FileConfig`-shaped value (every field optional; absent env vars leave
/// the field `None` so the builder can fall through to file/default).
#[must_use]
pub fn from_env() -> FileConfig {
    FileConfig {
        package_prefix: var("PACKAGE_PREFIX"),
        logfile: var("LOGFILE"),
        stdout: var("STDOUT").and_then(|v| parse_bool(&v)),
        max_arg_length: var("MAX_ARG_LENGTH").and_then(|v| v.parse().ok()),
        truncate_threshold: var("TRUNCATE_THRESHOLD").and_then(|v| v.parse().ok()),
        segment_directory: var("SEGMENT_DIRECTORY"),
        enable_segmentation: var("ENABLE_SEGMENTATION").and_then(|v| parse_bool(&v)),
        enabled: var("ENABLED").and_then(|v| parse_bool(&v)),
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("nope"), None);
    }
}
