pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::io;

use crate::OutputFormat;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) -> io::Result<()> {
    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Json => json::write_json(value, &mut out),
        OutputFormat::Table => table::write_table(&Report::from_value(value), &mut out),
        OutputFormat::Csv => csv_out::write_csv(&Report::from_value(value), &mut out),
        OutputFormat::Minimal => minimal::write_minimal(&Report::from_value(value), &mut out),
    }
}

/// One named value of a command result. Names of scenario outputs are
/// `object.output`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<'a> {
    pub name: String,
    pub value: &'a Value,
}

impl Field<'_> {
    /// Per-period values, when the field is a series.
    pub fn series(&self) -> Option<Vec<Decimal>> {
        match self.value {
            Value::Array(items) => items.iter().map(decimal).collect(),
            _ => None,
        }
    }
}

/// A command's output split into what the text formatters render: the
/// result as named fields (or listing rows), plus the envelope's issues
/// and methodology.
#[derive(Debug, Default)]
pub struct Report<'a> {
    pub fields: Vec<Field<'a>>,
    pub rows: Option<&'a [Value]>,
    pub warnings: Vec<&'a str>,
    pub methodology: Option<&'a str>,
}

impl<'a> Report<'a> {
    pub fn from_value(value: &'a Value) -> Self {
        let mut report = Report::default();
        match value {
            Value::Array(rows) => report.rows = Some(rows.as_slice()),
            Value::Object(map) => match map.get("result") {
                Some(result) => {
                    report.warnings = map
                        .get("warnings")
                        .and_then(Value::as_array)
                        .map(|w| w.iter().filter_map(Value::as_str).collect())
                        .unwrap_or_default();
                    report.methodology = map.get("methodology").and_then(Value::as_str);
                    flatten_result(result, &mut report.fields);
                }
                None => flatten("", value, &mut report.fields),
            },
            other => report.fields.push(Field {
                name: "value".into(),
                value: other,
            }),
        }
        report
    }

    pub fn field(&self, name: &str) -> Option<&Field<'a>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A full evaluation nests outputs under `objects.<id>.outputs`; skipped
/// objects contribute only their status.
fn flatten_result<'a>(result: &'a Value, fields: &mut Vec<Field<'a>>) {
    match result.get("objects").and_then(Value::as_object) {
        Some(objects) => {
            for (id, object) in objects {
                flatten_object_result(id, object, fields);
            }
        }
        None => flatten("", result, fields),
    }
}

fn flatten_object_result<'a>(id: &str, object: &'a Value, fields: &mut Vec<Field<'a>>) {
    if let Some(status) = object.get("status").filter(|s| s.as_str() != Some("evaluated")) {
        fields.push(Field {
            name: format!("{id}.status"),
            value: status,
        });
    }
    if let Some(outputs) = object.get("outputs").and_then(Value::as_object) {
        push_entries(id, outputs, fields);
    }
}

fn flatten<'a>(prefix: &str, value: &'a Value, fields: &mut Vec<Field<'a>>) {
    match value {
        Value::Object(map) => push_entries(prefix, map, fields),
        _ => fields.push(Field {
            name: prefix.to_string(),
            value,
        }),
    }
}

fn push_entries<'a>(prefix: &str, map: &'a Map<String, Value>, fields: &mut Vec<Field<'a>>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        flatten(&name, val, fields);
    }
}

/// Decimals serialise as strings; plain JSON numbers are accepted too.
pub fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.to_string().parse().ok(),
        _ => None,
    }
}

/// Text for a single cell: numbers trimmed of trailing zeros, everything
/// else as written.
pub fn scalar_text(value: &Value) -> String {
    if let Some(d) = decimal(value) {
        return d.normalize().to_string();
    }
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
