use super::{FormatOptions, OutputFormatter, QueryResult};

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(result: &QueryResult, _options: &FormatOptions) -> String {
        serde_json::to_string_pretty(result.to_json_rows()).unwrap_or_else(|_| "[]".to_string())
    }
}
