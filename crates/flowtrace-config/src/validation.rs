use flowtrace_utils::error::{ConfigurationError, FlowTraceError};

use crate::model::EffectiveConfig;

/// Validate an `EffectiveConfig` for invalid option combinations (§7
/// `ConfigurationError`: "invalid option combination; fatal at startup").
pub fn validate(config: &EffectiveConfig) -> Result<(), FlowTraceError> {
    if config.logfile.trim().is_empty() {
        return Err(missing("logfile"));
    }
    if config.segment_directory.trim().is_empty() {
        return Err(missing("segment-directory"));
    }
    if config.enable_segmentation && config.truncate_threshold == 0 {
        return Err(invalid(
            "truncate-threshold",
            "0",
            "segmentation is enabled but threshold is 0, which would segment every field",
        ));
    }
    if let Some(prefix) = &config.package_prefix {
        if prefix.trim().is_empty() {
            return Err(invalid("package-prefix", prefix, "must not be blank"));
        }
    }
    Ok(())
}

fn missing(key: &str) -> FlowTraceError {
    FlowTraceError::Configuration(ConfigurationError::MissingRequired(key.to_string()))
}

fn invalid(key: &str, value: &str, reason: &str) -> FlowTraceError {
    FlowTraceError::Configuration(ConfigurationError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&EffectiveConfig::default()).is_ok());
    }

    #[test]
    fn empty_logfile_is_rejected() {
        let mut config = EffectiveConfig::default();
        config.logfile = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_threshold_with_segmentation_enabled_is_rejected() {
        let mut config = EffectiveConfig::default();
        config.truncate_threshold = 0;
        config.enable_segmentation = true;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_threshold_is_fine_when_segmentation_disabled() {
        let mut config = EffectiveConfig::default();
        config.truncate_threshold = 0;
        config.enable_segmentation = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn blank_package_prefix_is_rejected() {
        let mut config = EffectiveConfig::default();
        config.package_prefix = Some("   ".to_string());
        assert!(validate(&config).is_err());
    }
}
