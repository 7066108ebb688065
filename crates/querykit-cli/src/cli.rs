//! Command-line front end.

use std::io::Write;

use anyhow::Context;
use clap::{ArgAction, Parser};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing_subscriber::EnvFilter;

use crate::filter::{FilterSchema, ParsedFilter, DEFAULT_MAX_DEPTH};

/// Parse a URL query into a filter tree and print it as JSON.
#[derive(Debug, Clone, Parser)]
#[command(name = "querykit", version, about, long_about = None)]
pub struct Cli {
    /// Full URL or raw query string (leading `?` optional).
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Separator between the sub-expressions of `or` / `and`.
    #[arg(long, value_name = "CHAR", default_value_t = ',')]
    pub delimiter: char,

    /// Maximum nesting depth of `or` / `and`.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Print JSON on a single line.
    #[arg(long)]
    pub compact: bool,

    /// Also print field errors and exit with status 2 if there are any.
    #[arg(long)]
    pub show_errors: bool,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Clean,
    FieldErrors,
}

impl Cli {
    /// Filter settings selected by the flags.
    pub fn schema(&self) -> FilterSchema {
        FilterSchema::new()
            .delimiter(self.delimiter)
            .max_depth(self.max_depth)
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("querykit={level},querykit_cli={level}")));

    // A subscriber may already be installed (tests); keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parses the query named by `cli` and writes the JSON output to `out`.
pub fn execute<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<Status> {
    let parsed = cli
        .schema()
        .parse_query(&cli.query)
        .context("failed to build the filter schema")?;
    tracing::info!(errors = parsed.errors.len(), "query parsed");

    write_json(out, &parsed.node, cli.compact)?;
    if !cli.show_errors {
        return Ok(Status::Clean);
    }

    write_json(out, &errors_json(&parsed), cli.compact)?;
    Ok(if parsed.has_errors() {
        Status::FieldErrors
    } else {
        Status::Clean
    })
}

/// Field errors as a JSON object of `field -> message`.
pub fn errors_json(parsed: &ParsedFilter) -> Value {
    let errors: Map<String, Value> = parsed
        .errors
        .iter()
        .map(|(field, err)| (field.clone(), Value::String(err.to_string())))
        .collect();
    Value::Object(errors)
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T, compact: bool) -> anyhow::Result<()> {
    let written = if compact {
        serde_json::to_writer(&mut *out, value)
    } else {
        serde_json::to_writer_pretty(&mut *out, value)
    };
    written.context("failed to serialize output")?;
    writeln!(out).context("failed to write output")?;
    Ok(())
}
