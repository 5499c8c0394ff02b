use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;
use tokio::process::Command as TokioCommand;

// ============================================================================
// CommandSpec - Secure Process Execution Specification
// ============================================================================

/// Specification for a command to execute.
///
/// All process execution goes through this type to ensure argv-style invocation.
/// This prevents shell injection attacks by ensuring arguments are passed as
/// discrete elements rather than shell strings.
///
/// # Security
///
/// `CommandSpec` enforces that:
/// - Arguments are `Vec<OsString>`, NOT shell strings
/// - No shell string evaluation (`sh -c`, `cmd /C`) is used
/// - Arguments cross trust boundaries as discrete elements
///
/// # Example
///
/// ```rust
/// use flowtrace_launcher::command_spec::CommandSpec;
/// use std::ffi::OsString;
///
/// let cmd = CommandSpec::new("python3")
///     .arg("--print")
///     .arg("--output-format")
///     .arg("json")
///     .cwd("/path/to/workspace");
///
/// assert_eq!(cmd.program, OsString::from("python3"));
/// assert_eq!(cmd.args.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The program to execute
    pub program: OsString,
    /// Arguments as discrete elements (NOT shell strings)
    pub args: Vec<OsString>,
    /// Optional working directory
    pub cwd: Option<PathBuf>,
    /// Optional environment overrides
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    /// Create a new `CommandSpec` with the given program.
    ///
    /// # Arguments
    ///
    /// * `program` - The program to execute. Can be any type that converts to `OsString`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowtrace_launcher::command_spec::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("python3");
    /// ```
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    /// Add a single argument to the command.
    ///
    /// Arguments are stored as discrete `OsString` elements, ensuring no shell
    /// interpretation occurs.
    ///
    /// # Arguments
    ///
    /// * `arg` - The argument to add. Can be any type that converts to `OsString`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowtrace_launcher::command_spec::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("python3")
    ///     .arg("--print")
    ///     .arg("--verbose");
    /// ```
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments to the command.
    ///
    /// Arguments are stored as discrete `OsString` elements, ensuring no shell
    /// interpretation occurs.
    ///
    /// # Arguments
    ///
    /// * `args` - An iterator of arguments to add.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowtrace_launcher::command_spec::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("python3")
    ///     .args(["--print", "--output-format", "json"]);
    /// ```
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory for the command.
    ///
    /// # Arguments
    ///
    /// * `cwd` - The working directory path.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowtrace_launcher::command_spec::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("python3")
    ///     .cwd("/path/to/workspace");
    /// ```
    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Set an environment variable for the command.
    ///
    /// # Arguments
    ///
    /// * `key` - The environment variable name.
    /// * `value` - The environment variable value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowtrace_launcher::command_spec::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("python3")
    ///     .env("FLOWTRACE_AGENT", "1")
    ///     .env("DEBUG", "1");
    /// ```
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set multiple environment variables for the command.
    ///
    /// # Arguments
    ///
    /// * `envs` - An iterator of (key, value) pairs.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flowtrace_launcher::command_spec::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("python3")
    ///     .envs([("DEBUG", "1"), ("VERBOSE", "true")]);
    /// ```
    #[must_use]
    pub fn envs<I, K, V>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        let env_map = self.env.get_or_insert_with(HashMap::new);
        for (key, value) in envs {
            env_map.insert(key.into(), value.into());
        }
        self
    }

    /// Convert this `CommandSpec` into a `std::process::Command`.
    ///
    /// This is the primary way to execute a `CommandSpec`. The resulting `Command`
    /// uses argv-style argument passing, ensuring no shell injection is possible.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use flowtrace_launcher::command_spec::CommandSpec;
    ///
    /// let cmd = CommandSpec::new("echo")
    ///     .arg("hello")
    ///     .arg("world");
    ///
    /// let output = cmd.to_command().output().expect("failed to execute");
    /// ```
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }

    /// Convert this `CommandSpec` into a `tokio::process::Command`.
    ///
    /// This is used for async execution with timeout support.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use flowtrace_launcher::command_spec::CommandSpec;
    ///
    /// # async fn example() {
    /// let cmd = CommandSpec::new("echo")
    ///     .arg("hello");
    ///
    /// let output = cmd.to_tokio_command().output().await.expect("failed to execute");
    /// # }
    /// ```
    #[must_use]
    pub fn to_tokio_command(&self) -> TokioCommand {
        let mut cmd = TokioCommand::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        if let Some(ref env) = self.env {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        cmd
    }
}

impl Default for CommandSpec {
    fn default() -> Self {
        Self {
            program: OsString::new(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }
}
