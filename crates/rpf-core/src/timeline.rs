use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, IssueKind};
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::EngineResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineInput {
    /// Model year in which construction begins (may be negative)
    pub construction_start_year: i64,
    pub construction_years: u32,
    pub operating_years: u32,
    /// Years between end of operations and the terminal-value year
    pub terminal_year_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    pub construction_start_year: i64,
    pub cod_year: i64,
    pub operations_end_year: i64,
    pub terminal_year: i64,
    pub total_model_years: i64,
    pub year_array: Vec<i64>,
    pub construction_years: u32,
    pub operating_years: u32,
}

impl TimelineInput {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        Ok(Self {
            construction_start_year: inputs.integer("construction_start_year")?,
            construction_years: inputs.count("construction_years")?,
            operating_years: inputs.count("operating_years")?,
            terminal_year_offset: inputs.count_or("terminal_year_offset", 0)?,
        })
    }
}

/// Lay out the model years. Integer addition only; a zero-length
/// construction phase puts COD on the start year.
pub fn build_timeline(input: &TimelineInput) -> Timeline {
    let start = input.construction_start_year;
    let cod_year = start + i64::from(input.construction_years);
    let operations_end_year = cod_year + i64::from(input.operating_years);
    let terminal_year = operations_end_year + i64::from(input.terminal_year_offset);

    Timeline {
        construction_start_year: start,
        cod_year,
        operations_end_year,
        terminal_year,
        total_model_years: terminal_year - start + 1,
        year_array: (start..=terminal_year).collect(),
        construction_years: input.construction_years,
        operating_years: input.operating_years,
    }
}

pub fn evaluate(
    inputs: &ObjectInputs,
    _deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = TimelineInput::from_inputs(inputs)?;
    let t = build_timeline(&input);

    if t.operating_years == 0 {
        diag.note(
            inputs.object(),
            IssueKind::ConfigurationNote,
            Some("operating_years"),
            "no operating years; every per-period series is empty",
        );
    }

    let mut out = Outputs::new();
    out.insert("cod_year".into(), Decimal::from(t.cod_year).into());
    out.insert("operations_end_year".into(), Decimal::from(t.operations_end_year).into());
    out.insert("terminal_year".into(), Decimal::from(t.terminal_year).into());
    out.insert("total_model_years".into(), Decimal::from(t.total_model_years).into());
    out.insert(
        "year_array".into(),
        t.year_array.iter().map(|y| Decimal::from(*y)).collect::<Vec<_>>().into(),
    );
    out.insert("construction_years".into(), Decimal::from(t.construction_years).into());
    out.insert("operating_years".into(), Decimal::from(t.operating_years).into());
    Ok(out)
}
