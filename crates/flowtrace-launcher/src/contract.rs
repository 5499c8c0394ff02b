//! The Launcher Contract (§4.6): the thin external collaborator that
//! detects a target's host language, resolves `LauncherOptions` from the
//! configuration surface, and spawns the target with the agent-injection
//! environment set.
//!
//! Does not ship per-language agent artifacts (out of scope, per §1); a
//! real launcher would point `injection_env` at a concrete agent module
//! path for the detected language. This crate only builds the contract
//! around that gap.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use flowtrace_config::EffectiveConfig;
use flowtrace_types::HostLanguage;

use crate::command_spec::CommandSpec;
use crate::error::RunnerError;
use crate::process::{ProcessOutput, ProcessRunner};

/// Project markers checked, in order, against the target's working
/// directory to detect its host language (§6 "Selection Policy
/// defaults" names the same language set this mirrors).
const MARKERS: &[(&str, HostLanguage)] = &[
    ("Cargo.toml", HostLanguage::Rust),
    ("go.mod", HostLanguage::Go),
    ("pom.xml", HostLanguage::Java),
    ("build.gradle", HostLanguage::Java),
    ("build.gradle.kts", HostLanguage::Java),
    ("pyproject.toml", HostLanguage::Python),
    ("setup.py", HostLanguage::Python),
    ("package.json", HostLanguage::JavaScript),
    ("tsconfig.json", HostLanguage::TypeScript),
];

/// Inspect `project_dir` for a recognized project marker file. Returns
/// `HostLanguage::Unknown` when none match rather than failing, since
/// the builtin-exclude defaults already have a conservative fallback
/// for that case.
#[must_use]
pub fn detect_host_language(project_dir: &Utf8Path) -> HostLanguage {
    for (marker, language) in MARKERS {
        if project_dir.join(marker).is_file() {
            return *language;
        }
    }
    HostLanguage::Unknown
}

/// The resolved options a launcher hands to the spawned process: the
/// detected host language, the environment variables that switch on
/// instrumentation in that language's agent, and the working directory
/// and timeout to run under.
#[derive(Debug, Clone)]
pub struct LauncherOptions {
    pub host_language: HostLanguage,
    pub project_dir: Utf8PathBuf,
    pub injection_env: Vec<(String, String)>,
    pub timeout: Duration,
}

impl LauncherOptions {
    /// Resolve from an `EffectiveConfig` and the target's project
    /// directory: detect the host language, then translate the
    /// configuration surface's fields (§6) into the environment
    /// variables FlowTrace's own agents read at startup.
    #[must_use]
    pub fn resolve(config: &EffectiveConfig, project_dir: &Utf8Path) -> Self {
        let host_language = detect_host_language(project_dir);
        let mut injection_env = vec![
            ("FLOWTRACE_LOGFILE".to_string(), config.logfile.clone()),
            ("FLOWTRACE_STDOUT".to_string(), config.stdout.to_string()),
            (
                "FLOWTRACE_MAX_ARG_LENGTH".to_string(),
                config.max_arg_length.to_string(),
            ),
            (
                "FLOWTRACE_TRUNCATE_THRESHOLD".to_string(),
                config.truncate_threshold.to_string(),
            ),
            (
                "FLOWTRACE_SEGMENT_DIRECTORY".to_string(),
                config.segment_directory.clone(),
            ),
            (
                "FLOWTRACE_ENABLE_SEGMENTATION".to_string(),
                config.enable_segmentation.to_string(),
            ),
            ("FLOWTRACE_ENABLED".to_string(), config.enabled.to_string()),
        ];
        if let Some(prefix) = &config.package_prefix {
            injection_env.push(("FLOWTRACE_PACKAGE_PREFIX".to_string(), prefix.clone()));
        }

        Self {
            host_language,
            project_dir: project_dir.to_path_buf(),
            injection_env,
            timeout: Duration::from_secs(3600),
        }
    }
}

/// Build the `CommandSpec` that spawns `argv` under `options`: the
/// target's own command plus the working directory and injection
/// environment resolved above. The caller supplies a `ProcessRunner` so
/// the actual spawn mechanism (native process, or a test double) stays
/// pluggable, per the teacher's `ProcessRunner` seam.
pub fn launch(
    options: &LauncherOptions,
    argv: &[String],
    runner: &dyn ProcessRunner,
) -> Result<ProcessOutput, RunnerError> {
    let Some((program, rest)) = argv.split_first() else {
        return Err(RunnerError::ConfigurationInvalid {
            reason: "empty command".to_string(),
        });
    };

    let spec = CommandSpec::new(program.clone())
        .args(rest.iter().cloned())
        .cwd(options.project_dir.as_std_path())
        .envs(options.injection_env.iter().cloned());

    runner.run(&spec, options.timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessOutput as Output;

    struct EchoRunner;

    impl ProcessRunner for EchoRunner {
        fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<Output, RunnerError> {
            Ok(Output::new(
                format!("{:?} {:?}", cmd.program, cmd.args).into_bytes(),
                Vec::new(),
                Some(0),
                false,
            ))
        }
    }

    #[test]
    fn detects_rust_project_by_cargo_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]\n").unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert_eq!(detect_host_language(&path), HostLanguage::Rust);
    }

    #[test]
    fn detects_unknown_when_no_marker_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert_eq!(detect_host_language(&path), HostLanguage::Unknown);
    }

    #[test]
    fn resolve_translates_effective_config_into_injection_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let config = EffectiveConfig {
            logfile: "custom.jsonl".to_string(),
            ..EffectiveConfig::default()
        };
        let options = LauncherOptions::resolve(&config, &path);
        assert!(options
            .injection_env
            .contains(&("FLOWTRACE_LOGFILE".to_string(), "custom.jsonl".to_string())));
    }

    #[test]
    fn launch_rejects_empty_argv() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let options = LauncherOptions::resolve(&EffectiveConfig::default(), &path);
        let err = launch(&options, &[], &EchoRunner).unwrap_err();
        assert!(matches!(err, RunnerError::ConfigurationInvalid { .. }));
    }

    #[test]
    fn launch_builds_a_command_spec_and_runs_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let options = LauncherOptions::resolve(&EffectiveConfig::default(), &path);
        let argv = vec!["python3".to_string(), "app.py".to_string()];
        let output = launch(&options, &argv, &EchoRunner).unwrap();
        assert!(output.success());
    }
}
