//! `flowtrace init`: writes the persisted-state layout (§6)
//! `.flowtrace/config.toml` with default values.

use std::path::Path;

use camino::Utf8PathBuf;
use serde::Serialize;

use flowtrace_config::model::{EffectiveConfig, FileConfig};
use flowtrace_utils::error::{ConfigurationError, FlowTraceError};
use flowtrace_utils::paths;

#[derive(Serialize)]
struct Wrapper {
    flowtrace: FileConfig,
}

pub fn execute(force: bool, config_path: Option<&Path>) -> Result<(), FlowTraceError> {
    let path = resolve_path(config_path)?;

    if path.exists() && !force {
        return Err(FlowTraceError::Configuration(ConfigurationError::InvalidValue {
            key: "config".to_string(),
            value: path.to_string(),
            reason: "already exists (use --force to overwrite)".to_string(),
        }));
    }

    if let Some(parent) = path.parent() {
        paths::ensure_dir_all(parent).map_err(FlowTraceError::Io)?;
    }

    let defaults = EffectiveConfig::default();
    let wrapper = Wrapper {
        flowtrace: FileConfig {
            package_prefix: defaults.package_prefix,
            logfile: Some(defaults.logfile),
            stdout: Some(defaults.stdout),
            max_arg_length: Some(defaults.max_arg_length),
            truncate_threshold: Some(defaults.truncate_threshold),
            segment_directory: Some(defaults.segment_directory),
            enable_segmentation: Some(defaults.enable_segmentation),
            enabled: Some(defaults.enabled),
        },
    };

    let text = toml::to_string_pretty(&wrapper).map_err(|e| {
        FlowTraceError::Configuration(ConfigurationError::InvalidFile {
            path: path.to_string(),
            reason: e.to_string(),
        })
    })?;

    std::fs::write(path.as_std_path(), text).map_err(FlowTraceError::Io)?;
    println!("wrote {path}");
    Ok(())
}

fn resolve_path(config_path: Option<&Path>) -> Result<Utf8PathBuf, FlowTraceError> {
    match config_path {
        Some(p) => Utf8PathBuf::from_path_buf(p.to_path_buf()).map_err(|p| {
            FlowTraceError::Configuration(ConfigurationError::InvalidValue {
                key: "config".to_string(),
                value: p.display().to_string(),
                reason: "not valid UTF-8".to_string(),
            })
        }),
        None => Ok(paths::config_file_path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtrace_utils::paths::with_isolated_home;

    #[test]
    fn writes_default_config_under_flowtrace_home() {
        let guard = with_isolated_home();
        execute(false, None).unwrap();
        let path = paths::config_file_path();
        assert!(path.exists());
        let text = std::fs::read_to_string(path.as_std_path()).unwrap();
        assert!(text.contains("logfile"));
        drop(guard);
    }

    #[test]
    fn refuses_to_overwrite_without_force() {
        let guard = with_isolated_home();
        execute(false, None).unwrap();
        let err = execute(false, None).unwrap_err();
        assert!(matches!(
            err,
            FlowTraceError::Configuration(ConfigurationError::InvalidValue { .. })
        ));
        drop(guard);
    }

    #[test]
    fn force_overwrites_an_existing_config() {
        let guard = with_isolated_home();
        execute(false, None).unwrap();
        execute(true, None).unwrap();
        drop(guard);
    }

    #[test]
    fn writes_to_an_explicit_path_when_given() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.toml");
        execute(false, Some(&explicit)).unwrap();
        assert!(explicit.exists());
    }
}
