use super::{FormatOptions, OutputFormatter, QueryResult};

pub struct CsvFormatter;

impl OutputFormatter for CsvFormatter {
    fn format(result: &QueryResult, options: &FormatOptions) -> String {
        let mut lines = Vec::new();

        if !options.no_headers {
            lines.push(result.columns.join(","));
        }

        for row in &result.rows {
            let escaped: Vec<String> = row
                .iter()
                .map(|val| {
                    if val.contains(',') || val.contains('"') || val.contains('\n') {
                        format!("\"{}\"", val.replace('"', "\"\""))
                    } else {
                        val.clone()
                    }
                })
                .collect();
            lines.push(escaped.join(","));
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::Row;
    use serde_json::json;

    #[test]
    fn test_csv_escaping() {
        let mut row = Row::new();
        row.insert("name".to_string(), json!("a,b"));
        row.insert("note".to_string(), json!("say \"hi\""));
        let result = QueryResult::from_rows(vec![row]);

        let output = CsvFormatter::format(&result, &FormatOptions::default());
        let mut lines = output.lines();
        assert_eq!(lines.next(), Some("name,note"));
        assert_eq!(lines.next(), Some("\"a,b\",\"say \"\"hi\"\"\""));
    }

    #[test]
    fn test_csv_no_headers() {
        let mut row = Row::new();
        row.insert("id".to_string(), json!(1));
        let result = QueryResult::from_rows(vec![row]);

        let output = CsvFormatter::format(&result, &FormatOptions { no_headers: true });
        assert_eq!(output, "1");
    }
}
