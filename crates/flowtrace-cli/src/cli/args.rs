//! CLI argument definitions: the `flowtrace` command surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `flowtrace` - polyglot execution tracing
#[derive(Parser)]
#[command(name = "flowtrace")]
#[command(about = "Trace execution across polyglot codebases and query the resulting log")]
#[command(long_about = r#"
flowtrace instruments a target process so every function entry, exit, and
exception is recorded as a line of JSON, then lets you query that log
without re-running the program.

EXAMPLES:
  # Write the default configuration under .flowtrace/
  flowtrace init

  # Run a target under tracing, with instrumentation switched on via env
  flowtrace run -- python3 app.py

  # Query the resulting log
  flowtrace query flowtrace.jsonl schema
  flowtrace query flowtrace.jsonl search --filter "event=EXCEPTION" --json
  flowtrace query flowtrace.jsonl aggregate --group-by method --op count

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > environment
  variables > .flowtrace/config.toml > defaults. The config file is
  discovered by searching upward from the current directory.
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Write the persisted-state layout (`.flowtrace/config.toml`) with
    /// default values.
    ///
    /// EXAMPLES:
    ///   flowtrace init
    ///   flowtrace init --force
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Detect the target's host language, resolve configuration, and
    /// spawn it with instrumentation switched on.
    ///
    /// EXAMPLES:
    ///   flowtrace run -- python3 app.py
    ///   flowtrace run -- node server.js --port 8080
    Run {
        /// The target command and its arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        argv: Vec<String>,
    },

    /// Open a trace log and run one read-only query against it.
    ///
    /// EXAMPLES:
    ///   flowtrace query flowtrace.jsonl schema
    ///   flowtrace query flowtrace.jsonl search --filter "method=charge"
    ///   flowtrace query flowtrace.jsonl top-k --by-field method --k 5
    Query {
        /// Path to the trace log
        logfile: PathBuf,

        #[command(subcommand)]
        command: QueryCommands,
    },
}

/// Query Session operations, one subcommand per `flowtrace-query` function.
#[derive(Subcommand)]
pub enum QueryCommands {
    /// Report field coverage and a sample row.
    Schema {
        #[arg(long)]
        json: bool,
    },

    /// Filtered, projected, optionally sorted and limited row search.
    Search {
        /// Filter expression, e.g. "event=EXCEPTION"
        #[arg(long)]
        filter: Option<String>,
        /// Comma-separated field list to project
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        /// Field to sort ascending by
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Group rows and compute a numeric metric per group.
    Aggregate {
        /// Comma-separated group-by fields
        #[arg(long)]
        group_by: String,
        /// count | sum | avg | max | min
        #[arg(long)]
        op: String,
        /// Numeric field the metric runs over (ignored for `count`)
        #[arg(long)]
        field: Option<String>,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Most frequent values of one field.
    TopK {
        #[arg(long)]
        by_field: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Rows sorted ascending by timestamp.
    Timeline {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Group by a correlation key tuple, reporting count and time span.
    Flow {
        /// Comma-separated correlation key fields
        #[arg(long)]
        keys: String,
        #[arg(long)]
        json: bool,
    },

    /// Rows whose `result` field matches the error-keyword pattern.
    Errors {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// Head-of-matches rows.
    Sample {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },

    /// Serialize filtered, projected rows as CSV or JSON.
    Export {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        fields: Option<String>,
        /// csv | json
        #[arg(long, default_value = "json")]
        to: String,
    },

    /// Resolve the sidecar log for one segmented event.
    Expand {
        #[arg(long)]
        timestamp: i64,
        #[arg(long)]
        event: Option<String>,
        #[arg(long)]
        json: bool,
    },

    /// `search`, augmenting segmented rows with their sidecar content.
    SearchExpanded {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        fields: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        auto_expand: bool,
        #[arg(long)]
        json: bool,
    },
}

/// Build the CLI command structure without parsing arguments; used for
/// introspection in tests.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
