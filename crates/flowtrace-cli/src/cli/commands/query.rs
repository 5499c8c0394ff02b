//! `flowtrace query <logfile> <subcommand>`: opens a log into a
//! transient Query Session, runs one operation, and prints the result
//! either as a table-ish plain listing or as JSON.

use std::path::Path;

use camino::Utf8PathBuf;

use flowtrace_query::{
    AggOp, AggregateParams, ExpandParams, ExportFormat, QuerySession, SearchParams, TimelineParams,
    TopKParams,
};
use flowtrace_utils::error::{ConfigurationError, FlowTraceError, QueryError};

use crate::cli::args::QueryCommands;

pub fn execute(logfile: &Path, command: &QueryCommands) -> Result<(), FlowTraceError> {
    let path = Utf8PathBuf::from_path_buf(logfile.to_path_buf()).map_err(|p| {
        FlowTraceError::Query(QueryError::LogNotFound(p.display().to_string()))
    })?;

    let registry = QuerySession::new();
    let id = registry.open(&path)?;
    let result = run_one(&registry, &id, command);
    registry.close(&id);
    result
}

fn run_one(registry: &QuerySession, id: &str, command: &QueryCommands) -> Result<(), FlowTraceError> {
    match command {
        QueryCommands::Schema { json } => {
            let report = registry.schema(id)?;
            if *json {
                print_json(&serde_json::json!({
                    "rowCount": report.row_count,
                    "fieldCoverage": report.field_coverage,
                    "sampleRow": report.sample_row,
                    "malformedLines": report.malformed_lines,
                }));
            } else {
                println!("rows: {}", report.row_count);
                println!("malformed lines: {}", report.malformed_lines);
                for (field, coverage) in &report.field_coverage {
                    println!("  {field}: {:.1}%", coverage * 100.0);
                }
            }
        }

        QueryCommands::Search { filter, fields, limit, sort, json } => {
            let params = SearchParams {
                filter: filter.clone(),
                fields: fields.as_deref().map(split_csv),
                limit: *limit,
                sort: sort.clone(),
            };
            print_rows(&registry.search(id, &params)?, *json);
        }

        QueryCommands::Aggregate { group_by, op, field, filter, json } => {
            let params = AggregateParams {
                group_by: split_csv(group_by),
                op: parse_agg_op(op)?,
                field: field.clone(),
                filter: filter.clone(),
            };
            let rows = registry.aggregate(id, &params)?;
            if *json {
                let values: Vec<_> = rows
                    .iter()
                    .map(|r| serde_json::json!({"key": r.key, "value": r.value}))
                    .collect();
                print_json(&serde_json::Value::Array(values));
            } else {
                for row in &rows {
                    println!("{}\t{}", row.key, row.value);
                }
            }
        }

        QueryCommands::TopK { by_field, k, filter, json } => {
            let params = TopKParams {
                by_field: by_field.clone(),
                k: *k,
                filter: filter.clone(),
            };
            let rows = registry.top_k(id, &params)?;
            if *json {
                let values: Vec<_> = rows
                    .iter()
                    .map(|r| serde_json::json!({"value": r.value, "count": r.count}))
                    .collect();
                print_json(&serde_json::Value::Array(values));
            } else {
                for row in &rows {
                    println!("{}\t{}", row.value, row.count);
                }
            }
        }

        QueryCommands::Timeline { filter, fields, json } => {
            let params = TimelineParams {
                filter: filter.clone(),
                fields: fields.as_deref().map(split_csv),
            };
            print_rows(&registry.timeline(id, &params)?, *json);
        }

        QueryCommands::Flow { keys, json } => {
            let rows = registry.flow(id, &split_csv(keys))?;
            if *json {
                let values: Vec<_> = rows
                    .iter()
                    .map(|r| serde_json::json!({
                        "key": r.key, "count": r.count, "first": r.first, "last": r.last,
                    }))
                    .collect();
                print_json(&serde_json::Value::Array(values));
            } else {
                for row in &rows {
                    println!("{}\tcount={}\tfirst={}\tlast={}", row.key, row.count, row.first, row.last);
                }
            }
        }

        QueryCommands::Errors { filter, json } => {
            print_rows(&registry.errors(id, filter.as_deref())?, *json);
        }

        QueryCommands::Sample { filter, limit, json } => {
            print_rows(&registry.sample(id, filter.as_deref(), *limit)?, *json);
        }

        QueryCommands::Export { filter, fields, to } => {
            let format: ExportFormat = to.parse()?;
            let projected = fields.as_deref().map(split_csv);
            let out = registry.export(id, filter.as_deref(), projected.as_deref(), format)?;
            println!("{out}");
        }

        QueryCommands::Expand { timestamp, event, json } => {
            let params = ExpandParams {
                timestamp: *timestamp,
                event: event.clone(),
            };
            let result = registry.expand(id, &params)?;
            if *json {
                print_json(&serde_json::json!({
                    "truncatedLog": result.truncated_log,
                    "fullLog": result.full_log,
                    "truncatedFields": result.truncated_fields,
                    "message": result.message,
                }));
            } else {
                println!("{}", result.message);
            }
        }

        QueryCommands::SearchExpanded { filter, fields, limit, sort, auto_expand, json } => {
            let params = SearchParams {
                filter: filter.clone(),
                fields: fields.as_deref().map(split_csv),
                limit: *limit,
                sort: sort.clone(),
            };
            print_rows(&registry.search_expanded(id, &params, *auto_expand)?, *json);
        }
    }
    Ok(())
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',').map(|part| part.trim().to_string()).collect()
}

fn parse_agg_op(s: &str) -> Result<AggOp, FlowTraceError> {
    match s.to_ascii_lowercase().as_str() {
        "count" => Ok(AggOp::Count),
        "sum" => Ok(AggOp::Sum),
        "avg" => Ok(AggOp::Avg),
        "max" => Ok(AggOp::Max),
        "min" => Ok(AggOp::Min),
        other => Err(FlowTraceError::Configuration(ConfigurationError::InvalidValue {
            key: "op".to_string(),
            value: other.to_string(),
            reason: "expected one of count, sum, avg, max, min".to_string(),
        })),
    }
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string()));
}

fn print_rows(rows: &[serde_json::Value], json: bool) {
    if json {
        print_json(&serde_json::Value::Array(rows.to_vec()));
    } else {
        for row in rows {
            println!("{row}");
        }
    }
}
