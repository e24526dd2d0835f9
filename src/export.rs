use clap::ValueEnum;

use crate::engine::value::{Record, Value, ValueType};
use crate::table::{cell_text, ResultTable};

/// How a query result is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Coloured console tables
    #[default]
    Table,
    Json,
    Csv,
}

pub fn to_csv(value: &Value) -> String {
    let table = ResultTable::from_value(value);
    let mut output = String::new();

    // Header
    let headers: Vec<String> = table.columns.iter().map(|c| csv_escape(&c.name)).collect();
    output.push_str(&headers.join(","));
    output.push('\n');

    // Rows
    for row in &table.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| csv_escape(&cell_to_csv(cell)))
            .collect();
        output.push_str(&cells.join(","));
        output.push('\n');
    }

    output
}

pub fn to_json(value: &Value) -> String {
    serde_json::to_string_pretty(&value_to_json(value)).unwrap_or_else(|_| "null".to_string())
}

/// Structural JSON form of a value. Records become objects keyed by member
/// name, recursively.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::json!(*i),
        Value::Long(l) => serde_json::json!(*l),
        Value::Text(s) => serde_json::Value::String(s.clone()),
        Value::Timestamp(ts) => serde_json::Value::String(ts.to_rfc3339()),
        Value::Record(record) => {
            let mut obj = serde_json::Map::new();
            for member in record.type_info().members() {
                obj.insert(member.name.to_string(), value_to_json(&(member.get)(value)));
            }
            serde_json::Value::Object(obj)
        }
        Value::List(seq) => serde_json::Value::Array(seq.iter().map(value_to_json).collect()),
    }
}

fn cell_to_csv(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::Timestamp(ts) => ts.to_rfc3339(),
        Value::List(seq) if *seq.element_type() != ValueType::Text => seq.len().to_string(),
        other => cell_text(other),
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
