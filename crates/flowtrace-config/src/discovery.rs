//! File source: `.flowtrace/config.toml`, discovered upward from the
//! current working directory (§6 "Persisted state layout").

use std::path::Path;

use flowtrace_utils::error::{ConfigurationError, FlowTraceError};
use flowtrace_utils::paths::discover_config_upward;

use crate::model::FileConfig;

/// Load `.flowtrace/config.toml` if one is found walking upward from
/// `start`. Returns `FileConfig::default()` (all fields `None`) when no
/// file exists anywhere up to the filesystem root -- a missing file is
/// not an error, it just contributes nothing to precedence resolution.
pub fn load_file_config(start: &Path) -> Result<FileConfig, FlowTraceError> {
    let Some(path) = discover_config_upward(start) else {
        return Ok(FileConfig::default());
    };
    parse_file(path.as_std_path())
}

fn parse_file(path: &Path) -> Result<FileConfig, FlowTraceError> {
    let raw = std::fs::read_to_string(path).map_err(FlowTraceError::Io)?;
    #[derive(serde::Deserialize, Default)]
    struct Wrapper {
        #[serde(default)]
        flowtrace: FileConfig,
    }
    let wrapper: Wrapper = toml::from_str(&raw).map_err(|e| {
        FlowTraceError::Configuration(ConfigurationError::InvalidFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    })?;
    Ok(wrapper.flowtrace)
}
