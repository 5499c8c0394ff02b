use serde::{Deserialize, Serialize};

/// Where a resolved option's value came from, for the effective-config
/// report the CLI's `flowtrace config show` prints (teacher's
/// value-with-source-attribution idiom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    Cli,
    Env,
    File,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Cli => "cli",
            Self::Env => "env",
            Self::File => "file",
            Self::Default => "default",
        };
        f.write_str(s)
    }
}

/// A resolved value paired with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> EffectiveValue<T> {
    #[must_use]
    pub const fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// The resolved configuration surface, per §6's table: `package-prefix`,
/// `logfile`, `stdout`, `max-arg-length`, `truncate-threshold`,
/// `segment-directory`, `enable-segmentation`, `enabled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub package_prefix: Option<String>,
    pub logfile: String,
    pub stdout: bool,
    pub max_arg_length: u32,
    pub truncate_threshold: u32,
    pub segment_directory: String,
    pub enable_segmentation: bool,
    pub enabled: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            package_prefix: None,
            logfile: "flowtrace.jsonl".to_string(),
            stdout: false,
            max_arg_length: 0,
            truncate_threshold: 1000,
            segment_directory: "flowtrace-jsonsl".to_string(),
            enable_segmentation: true,
            enabled: true,
        }
    }
}

/// A raw TOML `[flowtrace]` section as read from `.flowtrace/config.toml`,
/// mirroring `EffectiveConfig` field-for-field but with every field
/// optional, since a file may set only a subset.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    #[serde(default)]
    pub package_prefix: Option<String>,
    #[serde(default)]
    pub logfile: Option<String>,
    #[serde(default)]
    pub stdout: Option<bool>,
    #[serde(default)]
    pub max_arg_length: Option<u32>,
    #[serde(default)]
    pub truncate_threshold: Option<u32>,
    #[serde(default)]
    pub segment_directory: Option<String>,
    #[serde(default)]
    pub enable_segmentation: Option<bool>,
    #[serde(default)]
    pub enabled: Option<bool>,
}
