use std::io::{self, Write};

use super::{scalar_text, Report};

/// Headline figures, most specific first: a scenario's equity IRR, then a
/// solver's IRR, then debt capacity.
const HEADLINES: [(&str, Option<&str>); 6] = [
    ("equity_cashflow.equity_irr", Some("equity_cashflow.irr_status")),
    ("equity_irr", Some("irr_status")),
    ("irr", Some("irr_status")),
    ("max_debt", None),
    ("debt_sizing.max_debt", None),
    ("moic", None),
];

/// Print just the key answer. An IRR that did not converge carries its
/// status so a best-effort rate is never mistaken for a solved one.
pub fn write_minimal(report: &Report<'_>, out: &mut impl Write) -> io::Result<()> {
    if let Some(rows) = report.rows {
        return writeln!(out, "{} rows", rows.len());
    }

    for (key, status_key) in HEADLINES {
        let Some(field) = report.field(key).filter(|f| !f.value.is_null()) else {
            continue;
        };
        let value = scalar_text(field.value);
        let status = status_key
            .and_then(|s| report.field(s))
            .map(|f| scalar_text(f.value))
            .filter(|s| s != "converged");
        return match status {
            Some(status) => writeln!(out, "{value} ({status})"),
            None => writeln!(out, "{value}"),
        };
    }

    match report.fields.first() {
        Some(field) => writeln!(out, "{}: {}", field.name, scalar_text(field.value)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn render(value: &Value) -> String {
        let mut buf = Vec::new();
        write_minimal(&Report::from_value(value), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_scenario_prints_equity_irr() {
        let value = json!({ "result": {
            "debt_sizing.max_debt": "62515336.25",
            "equity_cashflow.equity_irr": "0.3714",
            "equity_cashflow.irr_status": "converged"
        }});
        assert_eq!(render(&value), "0.3714\n");
    }

    #[test]
    fn test_unconverged_irr_carries_its_status() {
        let value = json!({ "result": { "irr": "1.25", "irr_status": "iteration_limit", "moic": "2" } });
        assert_eq!(render(&value), "1.25 (iteration_limit)\n");
    }

    #[test]
    fn test_sizing_prints_max_debt() {
        let value = json!({ "result": { "sizing_cfads": "8275000", "max_debt": "62515336.2500" } });
        assert_eq!(render(&value), "62515336.25\n");
    }
}
