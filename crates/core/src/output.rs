//! Table and JSON rendering for command output.

use crate::error::CoreError;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde_json::{Map, Value};

/// Output format selected with `--output`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Column/row data ready for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tabular {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Tabular {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    /// Build a table from JSON records.
    ///
    /// Columns are the union of top-level keys in first-seen order. Records
    /// that are not objects land in a single `value` column.
    pub fn from_records(records: &[Value]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in records {
            match record {
                Value::Object(map) => {
                    for key in map.keys() {
                        if !columns.iter().any(|c| c == key) {
                            columns.push(key.clone());
                        }
                    }
                }
                _ => {
                    if !columns.iter().any(|c| c == "value") {
                        columns.push("value".to_string());
                    }
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|col| match record {
                        Value::Object(map) => map.get(col).map(cell_text).unwrap_or_default(),
                        other if col == "value" => cell_text(other),
                        _ => String::new(),
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.rows
                .iter()
                .map(|row| {
                    let map: Map<String, Value> = self
                        .columns
                        .iter()
                        .cloned()
                        .zip(row.iter().map(|c| Value::String(c.clone())))
                        .collect();
                    Value::Object(map)
                })
                .collect(),
        )
    }

    pub fn to_table_string(&self) -> String {
        if self.columns.is_empty() {
            return "(no rows)".to_string();
        }
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(self.columns.clone());
        for row in &self.rows {
            table.add_row(row.clone());
        }
        table.to_string()
    }

    pub fn render(&self, format: OutputFormat) -> Result<String, CoreError> {
        match format {
            OutputFormat::Table => Ok(self.to_table_string()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&self.to_json())?),
        }
    }
}

/// Text for a single table cell.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// Render a list of JSON records.
///
/// JSON output keeps the records untouched; table output flattens them with
/// [`Tabular::from_records`].
pub fn render_records(records: &[Value], format: OutputFormat) -> Result<String, CoreError> {
    match format {
        OutputFormat::Table => Ok(Tabular::from_records(records).to_table_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(records)?),
    }
}

/// Render a single JSON value; objects become a two-column key/value table.
pub fn render_value(value: &Value, format: OutputFormat) -> Result<String, CoreError> {
    match (format, value) {
        (OutputFormat::Json, _) => Ok(serde_json::to_string_pretty(value)?),
        (OutputFormat::Table, Value::Object(map)) => {
            let mut table = Tabular::new(["field", "value"]);
            for (key, v) in map {
                table.push_row([key.clone(), cell_text(v)]);
            }
            Ok(table.to_table_string())
        }
        (OutputFormat::Table, Value::Array(items)) => render_records(items, format),
        (OutputFormat::Table, scalar) => Ok(cell_text(scalar)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_records_union_of_keys() {
        let records = vec![
            json!({"name": "alice", "age": 30}),
            json!({"name": "bob", "email": "bob@example.com"}),
        ];
        let table = Tabular::from_records(&records);
        assert_eq!(table.columns, vec!["name", "age", "email"]);
        assert_eq!(table.rows[0], vec!["alice", "30", ""]);
        assert_eq!(table.rows[1], vec!["bob", "", "bob@example.com"]);
    }

    #[test]
    fn test_nested_values_render_as_compact_json() {
        let records = vec![json!({"tags": ["a", "b"], "meta": {"x": 1}, "gone": null})];
        let table = Tabular::from_records(&records);
        assert_eq!(table.rows[0], vec![r#"["a","b"]"#, r#"{"x":1}"#, ""]);
    }

    #[test]
    fn test_non_object_records_use_value_column() {
        let table = Tabular::from_records(&[json!("users"), json!(3)]);
        assert_eq!(table.columns, vec!["value"]);
        assert_eq!(table.rows, vec![vec!["users"], vec!["3"]]);
    }

    #[test]
    fn test_table_rendering_contains_cells() {
        let mut table = Tabular::new(["index", "docs"]);
        table.push_row(["orders", "12"]);
        let rendered = table.render(OutputFormat::Table).unwrap();
        assert!(rendered.contains("index"));
        assert!(rendered.contains("orders"));
        assert!(rendered.contains("12"));
    }

    #[test]
    fn test_json_rendering() {
        let mut table = Tabular::new(["index", "docs"]);
        table.push_row(["orders", "12"]);
        let rendered = table.render(OutputFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed, json!([{"index": "orders", "docs": "12"}]));
    }

    #[test]
    fn test_empty_table() {
        assert_eq!(Tabular::default().to_table_string(), "(no rows)");
    }

    #[test]
    fn test_render_value_object_as_key_value_table() {
        let rendered = render_value(&json!({"status": "green"}), OutputFormat::Table).unwrap();
        assert!(rendered.contains("status"));
        assert!(rendered.contains("green"));
    }
}
