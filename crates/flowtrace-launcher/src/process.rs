use crate::error::RunnerError;
use std::time::Duration;

use super::CommandSpec;

// ============================================================================
// ProcessRunner Trait - Secure Process Execution Interface
// ============================================================================

/// Output from a process execution.
///
/// This is a simplified output type for the `ProcessRunner` trait,
/// containing the essential information from process execution.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Standard output from the process
    pub stdout: Vec<u8>,
    /// Standard error from the process
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
    /// Whether the execution timed out
    pub timed_out: bool,
}

impl ProcessOutput {
    /// Create a new `ProcessOutput` with the given values.
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>, timed_out: bool) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
            timed_out,
        }
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the process exited successfully (exit code 0).
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Trait for process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string evaluation).
/// This trait provides a synchronous interface for process execution.
///
/// # Security
///
/// All implementations MUST:
/// - Use `Command::new().args()` style APIs only
/// - NOT use shell string evaluation (`sh -c`, `cmd /C`)
/// - Pass arguments as discrete elements, not concatenated strings
///
/// # Threading
///
/// `ProcessRunner` is a synchronous interface. Implementations MAY internally
/// drive an async runtime (e.g., Tokio for timeouts) but MUST NOT expose async
/// in the public API. This aligns with NFR-ASYNC.
///
/// # Example
///
/// ```rust
/// use flowtrace_launcher::{ProcessRunner, CommandSpec, ProcessOutput, RunnerError};
/// use std::time::Duration;
///
/// struct SimpleRunner;
///
/// impl ProcessRunner for SimpleRunner {
///     fn run(&self, cmd: &CommandSpec, _timeout: Duration) -> Result<ProcessOutput, RunnerError> {
///         // Use argv-style execution via CommandSpec::to_command()
///         let output = cmd.to_command()
///             .output()
///             .map_err(|e| RunnerError::NativeExecutionFailed {
///                 reason: e.to_string(),
///             })?;
///
///         Ok(ProcessOutput::new(
///             output.stdout,
///             output.stderr,
///             output.status.code(),
///             false,
///         ))
///     }
/// }
///
/// // Usage example
/// let runner = SimpleRunner;
/// let cmd = CommandSpec::new("echo").arg("hello");
/// let result = runner.run(&cmd, Duration::from_secs(30));
/// assert!(result.is_ok());
/// ```
pub trait ProcessRunner {
    /// Execute a command with the given timeout.
    ///
    /// # Arguments
    ///
    /// * `cmd` - The command specification to execute
    /// * `timeout` - Maximum duration to wait for the process to complete
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessOutput)` - The process completed (possibly with non-zero exit code)
    /// * `Err(RunnerError::Timeout)` - The process timed out
    /// * `Err(RunnerError::*)` - Other execution errors
    ///
    /// # Security
    ///
    /// Implementations MUST use argv-style APIs only. The `CommandSpec` ensures
    /// arguments are passed as discrete elements, preventing shell injection.
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}

/// The default `ProcessRunner`: spawns the target natively and waits on
/// a background thread so a hang past `timeout` is reported as
/// `RunnerError::Timeout` instead of blocking the caller forever.
pub struct NativeRunner;

impl ProcessRunner for NativeRunner {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        let mut child = cmd
            .to_command()
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| RunnerError::NativeExecutionFailed {
                reason: e.to_string(),
            })?;

        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(child.wait_with_output());
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(output)) => Ok(ProcessOutput::new(
                output.stdout,
                output.stderr,
                output.status.code(),
                false,
            )),
            Ok(Err(e)) => Err(RunnerError::NativeExecutionFailed {
                reason: e.to_string(),
            }),
            Err(_) => Err(RunnerError::Timeout {
                timeout_seconds: timeout.as_secs(),
            }),
        }
    }
}
