//! `flowtrace run`: resolves configuration, detects the target's host
//! language, and spawns it through the Launcher Contract with
//! instrumentation switched on via the injection environment.

use std::io::Write;
use std::path::Path;

use camino::Utf8PathBuf;

use flowtrace_config::builder::ConfigBuilder;
use flowtrace_launcher::{launch, LauncherOptions, NativeRunner};
use flowtrace_utils::error::{ConfigurationError, FlowTraceError};

pub fn execute(argv: &[String], config_path: Option<&Path>) -> Result<(), FlowTraceError> {
    let mut builder = ConfigBuilder::new();
    if let Some(search_start) = config_path.and_then(Path::parent) {
        builder = builder.with_search_start(search_start);
    }
    let config = builder.build()?;

    let cwd = std::env::current_dir().map_err(FlowTraceError::Io)?;
    let project_dir = Utf8PathBuf::from_path_buf(cwd).map_err(|_| {
        FlowTraceError::Configuration(ConfigurationError::InvalidValue {
            key: "cwd".to_string(),
            value: String::new(),
            reason: "current directory is not valid UTF-8".to_string(),
        })
    })?;

    let options = LauncherOptions::resolve(&config, &project_dir);
    let target = argv.first().cloned().unwrap_or_default();

    let output = launch(&options, argv, &NativeRunner).map_err(|e| FlowTraceError::Instrumentation {
        module: target.clone(),
        reason: e.to_string(),
    })?;

    std::io::stdout().write_all(&output.stdout).ok();
    std::io::stderr().write_all(&output.stderr).ok();

    if !output.success() {
        return Err(FlowTraceError::Instrumentation {
            module: target,
            reason: match output.exit_code {
                Some(code) => format!("target exited with code {code}"),
                None => "target terminated by signal or timed out".to_string(),
            },
        });
    }
    Ok(())
}
