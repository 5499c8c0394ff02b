//! Merges CLI overrides, environment variables, file config, and defaults
//! into an `EffectiveConfig`, tracking the source of each resolved value.

use std::path::{Path, PathBuf};

use flowtrace_utils::error::FlowTraceError;

use crate::discovery::load_file_config;
use crate::model::{ConfigSource, EffectiveConfig, EffectiveValue, FileConfig};
use crate::sources::from_env;
use crate::validation::validate;

/// CLI-supplied overrides; every field is optional since most invocations
/// set only a few flags.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub package_prefix: Option<String>,
    pub logfile: Option<String>,
    pub stdout: Option<bool>,
    pub max_arg_length: Option<u32>,
    pub truncate_threshold: Option<u32>,
    pub segment_directory: Option<String>,
    pub enable_segmentation: Option<bool>,
    pub enabled: Option<bool>,
}

/// Builds an `EffectiveConfig` from CLI overrides, environment variables,
/// and a discovered `.flowtrace/config.toml`, in that precedence order.
pub struct ConfigBuilder {
    cli: CliOverrides,
    search_start: PathBuf,
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cli: CliOverrides::default(),
            search_start: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    #[must_use]
    pub fn with_cli_overrides(mut self, cli: CliOverrides) -> Self {
        self.cli = cli;
        self
    }

    #[must_use]
    pub fn with_search_start(mut self, path: &Path) -> Self {
        self.search_start = path.to_path_buf();
        self
    }

    /// Resolve the effective configuration, validating the result.
    pub fn build(self) -> Result<EffectiveConfig, FlowTraceError> {
        let env = from_env();
        let file = load_file_config(&self.search_start)?;
        let (config, _sources) = resolve(&self.cli, &env, &file);
        validate(&config)?;
        Ok(config)
    }

    /// Resolve with per-field source attribution, for `flowtrace config
    /// show`.
    pub fn build_with_sources(
        self,
    ) -> Result<(EffectiveConfig, EffectiveSources), FlowTraceError> {
        let env = from_env();
        let file = load_file_config(&self.search_start)?;
        let (config, sources) = resolve(&self.cli, &env, &file);
        validate(&config)?;
        Ok((config, sources))
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Source attribution for each resolved field, mirrored field-for-field
/// against `EffectiveConfig`.
#[derive(Debug, Clone)]
pub struct EffectiveSources {
    pub package_prefix: ConfigSource,
    pub logfile: ConfigSource,
    pub stdout: ConfigSource,
    pub max_arg_length: ConfigSource,
    pub truncate_threshold: ConfigSource,
    pub segment_directory: ConfigSource,
    pub enable_segmentation: ConfigSource,
    pub enabled: ConfigSource,
}

macro_rules! resolve_field {
    ($cli:expr, $env:expr, $file:expr, $default:expr) => {{
        if let Some(v) = $cli {
            EffectiveValue::new(v, ConfigSource::Cli)
        } else if let Some(v) = $env {
            EffectiveValue::new(v, ConfigSource::Env)
        } else if let Some(v) = $file {
            EffectiveValue::new(v, ConfigSource::File)
        } else {
            EffectiveValue::new($default, ConfigSource::Default)
        }
    }};
}

fn resolve(
    cli: &CliOverrides,
    env: &FileConfig,
    file: &FileConfig,
) -> (EffectiveConfig, EffectiveSources) {
    let defaults = EffectiveConfig::default();

    let package_prefix = resolve_field!(
        cli.package_prefix.clone(),
        env.package_prefix.clone(),
        file.package_prefix.clone(),
        defaults.package_prefix.clone()
    );
    let logfile = resolve_field!(
        cli.logfile.clone(),
        env.logfile.clone(),
        file.logfile.clone(),
        defaults.logfile.clone()
    );
    let stdout = resolve_field!(cli.stdout, env.stdout, file.stdout, defaults.stdout);
    let max_arg_length = resolve_field!(
        cli.max_arg_length,
        env.max_arg_length,
        file.max_arg_length,
        defaults.max_arg_length
    );
    let truncate_threshold = resolve_field!(
        cli.truncate_threshold,
        env.truncate_threshold,
        file.truncate_threshold,
        defaults.truncate_threshold
    );
    let segment_directory = resolve_field!(
        cli.segment_directory.clone(),
        env.segment_directory.clone(),
        file.segment_directory.clone(),
        defaults.segment_directory.clone()
    );
    let enable_segmentation = resolve_field!(
        cli.enable_segmentation,
        env.enable_segmentation,
        file.enable_segmentation,
        defaults.enable_segmentation
    );
    let enabled = resolve_field!(cli.enabled, env.enabled, file.enabled, defaults.enabled);

    let config = EffectiveConfig {
        package_prefix: package_prefix.value.clone(),
        logfile: logfile.value.clone(),
        stdout: stdout.value,
        max_arg_length: max_arg_length.value,
        truncate_threshold: truncate_threshold.value,
        segment_directory: segment_directory.value.clone(),
        enable_segmentation: enable_segmentation.value,
        enabled: enabled.value,
    };
    let sources = EffectiveSources {
        package_prefix: package_prefix.source,
        logfile: logfile.source,
        stdout: stdout.source,
        max_arg_length: max_arg_length.source,
        truncate_threshold: truncate_threshold.source,
        segment_directory: segment_directory.source,
        enable_segmentation: enable_segmentation.source,
        enabled: enabled.source,
    };
    (config, sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowtrace_utils::paths::with_isolated_home;

    #[test]
    fn cli_override_wins_over_everything() {
        let guard = with_isolated_home();
        let cli = CliOverrides {
            logfile: Some("cli.jsonl".to_string()),
            ..Default::default()
        };
        let config = ConfigBuilder::new()
            .with_cli_overrides(cli)
            .with_search_start(guard.path())
            .build()
            .unwrap();
        assert_eq!(config.logfile, "cli.jsonl");
    }

    #[test]
    fn file_beats_default_when_no_cli_or_env() {
        let guard = with_isolated_home();
        let dir = guard.path().join(".flowtrace");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            "[flowtrace]\ntruncate_threshold = 5000\n",
        )
        .unwrap();

        let (config, sources) = ConfigBuilder::new()
            .with_search_start(guard.path())
            .build_with_sources()
            .unwrap();
        assert_eq!(config.truncate_threshold, 5000);
        assert_eq!(sources.truncate_threshold, ConfigSource::File);
        assert_eq!(sources.logfile, ConfigSource::Default);
    }

    #[test]
    fn default_config_validates() {
        let guard = with_isolated_home();
        let config = ConfigBuilder::new()
            .with_search_start(guard.path())
            .build()
            .unwrap();
        assert_eq!(config.logfile, "flowtrace.jsonl");
        assert!(config.enabled);
    }
}
