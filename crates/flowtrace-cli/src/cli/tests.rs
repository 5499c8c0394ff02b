//! CLI-surface tests: argument parsing and command wiring, independent
//! of any one subcommand's business logic (covered alongside each
//! command module instead).

use clap::{CommandFactory, Parser};

use super::args::{build_cli, Cli};

#[test]
fn cli_definition_is_internally_consistent() {
    build_cli().debug_assert();
}

#[test]
fn run_requires_at_least_one_argv_element() {
    let result = Cli::try_parse_from(["flowtrace", "run", "--"]);
    assert!(result.is_err());
}

#[test]
fn run_accepts_hyphenated_target_arguments() {
    let cli = Cli::try_parse_from(["flowtrace", "run", "--", "python3", "--version"]).unwrap();
    match cli.command {
        super::args::Commands::Run { argv } => {
            assert_eq!(argv, vec!["python3".to_string(), "--version".to_string()]);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn query_subcommand_requires_a_logfile_and_operation() {
    let result = Cli::try_parse_from(["flowtrace", "query"]);
    assert!(result.is_err());
}

#[test]
fn query_schema_parses_with_json_flag() {
    let cli = Cli::try_parse_from(["flowtrace", "query", "trace.jsonl", "schema", "--json"]).unwrap();
    match cli.command {
        super::args::Commands::Query { logfile, .. } => {
            assert_eq!(logfile.to_str().unwrap(), "trace.jsonl");
        }
        _ => panic!("expected Query"),
    }
}
