//! Rendering of command results as JSON, YAML or tables
//!
//! `--query` takes a JMESPath expression evaluated by the `jpx-core` runtime, so the
//! `az`-style filters users already know (`[?state==`Ready`].name`) work unchanged.

use anyhow::{Context, Result};
use comfy_table::Table;
use jpx_core::{Expression, JmespathError, Runtime};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Table,
}

impl OutputFormat {
    /// Map the global `--output` flag, using `auto_as` for `auto`
    pub fn from_cli(format: crate::cli::OutputFormat, auto_as: OutputFormat) -> Self {
        match format {
            crate::cli::OutputFormat::Auto => auto_as,
            crate::cli::OutputFormat::Json => Self::Json,
            crate::cli::OutputFormat::Yaml => Self::Yaml,
            crate::cli::OutputFormat::Table => Self::Table,
        }
    }
}

fn runtime() -> &'static Runtime {
    static RUNTIME: OnceLock<Runtime> = OnceLock::new();
    RUNTIME.get_or_init(|| Runtime::builder().with_all_extensions().build())
}

/// Quote bare backtick literals (`` `eastus` `` becomes `` `"eastus"` ``).
///
/// The runtime only accepts JSON between backticks, while `az` users habitually
/// leave string literals unquoted.
fn quote_bare_literals(query: &str) -> String {
    static LITERAL: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = LITERAL
        .get_or_init(|| Regex::new(r"`([^`\\]*(?:\\.[^`\\]*)*)`").ok())
        .as_ref()
    else {
        return query.to_string();
    };

    re.replace_all(query, |caps: &regex::Captures| {
        let literal = caps[1].trim();
        if serde_json::from_str::<Value>(literal).is_ok() {
            caps[0].to_string()
        } else {
            format!("`{}`", Value::String(literal.to_string()))
        }
    })
    .into_owned()
}

fn compile(query: &str) -> std::result::Result<Expression<'static>, JmespathError> {
    runtime().compile(&quote_bare_literals(query))
}

/// Serialize `data` and narrow it with an optional JMESPath query
pub fn apply_query<T: Serialize>(data: T, query: Option<&str>) -> Result<Value> {
    let value = serde_json::to_value(data)?;
    let Some(query) = query else {
        return Ok(value);
    };

    let expr = compile(query).with_context(|| format!("Invalid JMESPath expression: {}", query))?;
    expr.search(&value).context("JMESPath query failed")
}

pub fn print_output<T: Serialize>(data: T, format: OutputFormat, query: Option<&str>) -> Result<()> {
    let value = apply_query(data, query)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&value)?),
        OutputFormat::Table => match render_table(&value) {
            Some(table) => println!("{}", table),
            None => println!("{}", cell(&value)),
        },
    }

    Ok(())
}

/// Lay out a list of records as columns, or a single record as Property/Value rows.
///
/// Columns are the union of keys across all records, in first-seen order, so a
/// server missing an optional field still lines up with the others.
fn render_table(value: &Value) -> Option<Table> {
    let mut table = Table::new();

    match value {
        Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
            let mut columns: Vec<&String> = Vec::new();
            for record in items.iter().filter_map(Value::as_object) {
                for key in record.keys() {
                    if !columns.contains(&key) {
                        columns.push(key);
                    }
                }
            }
            table.set_header(columns.iter().map(|c| c.as_str()));
            for record in items.iter().filter_map(Value::as_object) {
                table.add_row(columns.iter().map(|c| record.get(*c).map(cell).unwrap_or_default()));
            }
        }
        Value::Array(items) if !items.is_empty() => {
            table.set_header(["Value"]);
            for item in items {
                table.add_row([cell(item)]);
            }
        }
        Value::Object(record) => {
            table.set_header(["Property", "Value"]);
            for (key, val) in record {
                table.add_row([key.clone(), cell(val)]);
            }
        }
        _ => return None,
    }

    Some(table)
}

/// One table cell. Nested records (sku, storage, identity) are shown inline.
fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(record) => inline(record),
    }
}

fn inline(record: &Map<String, Value>) -> String {
    record
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| match v {
            Value::Object(_) | Value::Array(_) => format!("{}=[{}]", k, cell(v)),
            _ => format!("{}={}", k, cell(v)),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
