use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value;
use crate::types::{Money, Multiple, Rate};
use crate::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalInput {
    pub terminal_multiple: Multiple,
    pub discount_rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalValue {
    pub final_year_ebitda: Money,
    pub terminal_value: Money,
    pub present_value_terminal: Money,
}

/// Exit value on a multiple of last-period EBITDA, discounted back over
/// `terminal_year` periods.
pub fn terminal_value(
    final_year_ebitda: Money,
    terminal_year: i64,
    input: &TerminalInput,
) -> EngineResult<TerminalValue> {
    let terminal_value = final_year_ebitda
        .checked_mul(input.terminal_multiple)
        .ok_or_else(|| EngineError::overflow("terminal value"))?;
    let growth = time_value::compound_factor(input.discount_rate, terminal_year)?;
    let present_value_terminal = terminal_value
        .checked_div(growth)
        .ok_or_else(|| EngineError::overflow("terminal value discounting"))?;
    Ok(TerminalValue {
        final_year_ebitda,
        terminal_value,
        present_value_terminal,
    })
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = TerminalInput {
        terminal_multiple: inputs.number("terminal_multiple")?,
        discount_rate: inputs.number("discount_rate")?,
    };
    if input.discount_rate <= -Decimal::ONE {
        return Err(inputs.invalid("discount_rate", "must be above -100%"));
    }

    let revenue = deps.series("total_revenue")?;
    let opex = deps.series_of_len("annual_opex", revenue.len())?;
    let final_year_ebitda = match (revenue.last(), opex.last()) {
        (Some(r), Some(o)) => r
            .checked_sub(*o)
            .ok_or_else(|| EngineError::overflow("final-year EBITDA"))?,
        _ => {
            diag.guard(
                inputs.object(),
                "final_year_ebitda",
                "no operating periods; terminal EBITDA set to 0",
            );
            Decimal::ZERO
        }
    };

    let tv = terminal_value(final_year_ebitda, deps.integer("terminal_year")?, &input)?;

    let mut out = Outputs::new();
    out.insert("final_year_ebitda".into(), tv.final_year_ebitda.into());
    out.insert("terminal_value".into(), tv.terminal_value.into());
    out.insert("present_value_terminal".into(), tv.present_value_terminal.into());
    Ok(out)
}
