mod csv;
mod json;
mod table;

pub use csv::CsvFormatter;
pub use json::JsonFormatter;
pub use table::TableFormatter;

use clap::ValueEnum;
use serde_json::Value;

use crate::rest::Row;

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

#[derive(Debug, Clone, Default)]
pub struct FormatOptions {
    pub no_headers: bool,
}

pub trait OutputFormatter {
    fn format(result: &QueryResult, options: &FormatOptions) -> String;
}

/// A renderable result set.
///
/// Columns are the union of the row keys in first-seen order, so `SELECT *`
/// output is stable even when rows are sparse.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    raw: Vec<Row>,
}

impl QueryResult {
    pub fn from_rows(raw: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &raw {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }

        let rows = raw
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|col| row.get(col).map(display_value).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self { columns, rows, raw }
    }

    pub fn format(&self, format: &OutputFormat, no_headers: bool) -> String {
        let options = FormatOptions { no_headers };
        match format {
            OutputFormat::Table => TableFormatter::format(self, &options),
            OutputFormat::Json => JsonFormatter::format(self, &options),
            OutputFormat::Csv => CsvFormatter::format(self, &options),
        }
    }

    /// The untouched row objects, for JSON output
    pub fn to_json_rows(&self) -> &[Row] {
        &self.raw
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
        }
        other => other.to_string(),
    }
}
