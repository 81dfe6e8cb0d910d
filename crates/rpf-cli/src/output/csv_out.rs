use serde_json::Value;
use std::io::{self, Write};

use super::{scalar_text, Report};

/// CSV in long form: one `output,period,value` row per scalar and one per
/// period of each series (periods count from 1). Listings keep their columns.
pub fn write_csv(report: &Report<'_>, out: &mut impl Write) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    if let Some(rows) = report.rows {
        write_rows(&mut wtr, rows)?;
    } else {
        wtr.write_record(["output", "period", "value"])?;
        for field in &report.fields {
            match (field.value, field.series()) {
                (Value::Array(_), Some(series)) => {
                    for (t, v) in series.iter().enumerate() {
                        wtr.write_record([field.name.clone(), (t + 1).to_string(), v.normalize().to_string()])?;
                    }
                }
                (value, _) => {
                    wtr.write_record([field.name.as_str(), "", cell(value).as_str()])?;
                }
            }
        }
    }

    wtr.flush()
}

fn write_rows<W: Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> io::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for row in rows {
            wtr.write_record([cell(row)])?;
        }
        return Ok(());
    };

    let headers: Vec<&str> = first.keys().map(String::as_str).collect();
    wtr.write_record(&headers)?;
    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|h| row.get(*h).map(cell).unwrap_or_default())
            .collect();
        wtr.write_record(&record)?;
    }
    Ok(())
}

/// Non-numeric lists (dependency names, input ids) share one `;`-joined cell.
fn cell(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(";"),
        other => scalar_text(other),
    }
}
