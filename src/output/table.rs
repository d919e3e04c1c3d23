use std::borrow::Cow;
use std::collections::HashSet;

use comfy_table::{Table, presets::ASCII_BORDERS_ONLY_CONDENSED};

use super::{FormatOptions, OutputFormatter, QueryResult};

/// Maximum width for cells holding nested JSON (result payloads, metadata)
const MAX_JSON_COLUMN_WIDTH: usize = 60;

/// Truncate a string to max_len chars, adding "..." if truncated
fn truncate_value(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.chars().count() <= max_len {
        Cow::Borrowed(s)
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        Cow::Owned(format!("{}...", truncated))
    }
}

pub struct TableFormatter;

impl OutputFormatter for TableFormatter {
    fn format(result: &QueryResult, options: &FormatOptions) -> String {
        if result.rows.is_empty() {
            return "(0 rows)".to_string();
        }

        let mut table = Table::new();
        // ASCII_BORDERS_ONLY_CONDENSED is close to psql style
        table.load_preset(ASCII_BORDERS_ONLY_CONDENSED);

        // Columns carrying nested JSON anywhere get width-limited
        let truncate_cols: HashSet<usize> = result
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, col)| {
                let nested = result
                    .to_json_rows()
                    .iter()
                    .any(|row| matches!(row.get(col), Some(v) if v.is_object() || v.is_array()));
                if nested { Some(idx) } else { None }
            })
            .collect();

        if !options.no_headers {
            table.set_header(&result.columns);
        }

        for row in &result.rows {
            let cells: Vec<Cow<'_, str>> = row
                .iter()
                .enumerate()
                .map(|(idx, val)| {
                    if truncate_cols.contains(&idx) {
                        truncate_value(val, MAX_JSON_COLUMN_WIDTH)
                    } else {
                        Cow::Borrowed(val.as_str())
                    }
                })
                .collect();
            table.add_row(cells);
        }

        let output = table.to_string();
        format!("{}\n({} rows)", output, result.rows.len())
    }
}
