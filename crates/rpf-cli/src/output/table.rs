use colored::Colorize;
use rust_decimal::Decimal;
use serde_json::Value;
use std::io::{self, Write};
use tabled::{builder::Builder, Table};

use super::{scalar_text, Field, Report};

/// Scalars in one table, series summarised one per row in another, then the
/// envelope's issues and methodology.
pub fn write_table(report: &Report<'_>, out: &mut impl Write) -> io::Result<()> {
    if let Some(rows) = report.rows {
        return write_rows(rows, out);
    }

    let (series, scalars): (Vec<&Field<'_>>, Vec<&Field<'_>>) =
        report.fields.iter().partition(|f| f.series().is_some());

    if !scalars.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Output", "Value"]);
        for field in scalars {
            builder.push_record([field.name.clone(), scalar_text(field.value)]);
        }
        writeln!(out, "{}", Table::from(builder))?;
    }

    if !series.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Series", "Periods", "First", "Min", "Max", "Last", "Total"]);
        for field in series {
            let values = field.series().unwrap_or_default();
            builder.push_record(series_row(&field.name, &values));
        }
        writeln!(out, "\n{}", Table::from(builder))?;
    }

    if !report.warnings.is_empty() {
        writeln!(out, "\n{}", "Issues:".yellow().bold())?;
        for w in &report.warnings {
            writeln!(out, "  - {w}")?;
        }
    }
    if let Some(methodology) = report.methodology {
        writeln!(out, "\nMethodology: {methodology}")?;
    }
    Ok(())
}

fn series_row(name: &str, values: &[Decimal]) -> Vec<String> {
    let show = |d: Option<Decimal>| d.map(|v| v.round_dp(2).normalize().to_string()).unwrap_or_default();
    let total = values.iter().try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v));
    vec![
        name.to_string(),
        values.len().to_string(),
        show(values.first().copied()),
        show(values.iter().min().copied()),
        show(values.iter().max().copied()),
        show(values.last().copied()),
        show(total),
    ]
}

fn write_rows(rows: &[Value], out: &mut impl Write) -> io::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        if rows.is_empty() {
            return writeln!(out, "(empty)");
        }
        for row in rows {
            writeln!(out, "{}", scalar_text(row))?;
        }
        return Ok(());
    };

    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in rows {
        builder.push_record(headers.iter().map(|h| row.get(h.as_str()).map(list_cell).unwrap_or_default()));
    }
    writeln!(out, "{}", Table::from(builder))
}

fn list_cell(value: &Value) -> String {
    match value {
        Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join(", "),
        other => scalar_text(other),
    }
}
