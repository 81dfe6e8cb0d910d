use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value;
use crate::types::{Money, Rate};
use crate::{EngineError, EngineResult};

/// Sustaining capital spend during operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationalCapexInput {
    pub annual_opex_capex: Money,
    pub opex_capex_escalation: Rate,
    /// Operating year of the one-off replacement, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_replacement_year: Option<u32>,
    pub major_replacement_cost: Money,
}

impl OperationalCapexInput {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        let major_replacement_year = match inputs.optional_number("major_replacement_year")? {
            Some(_) => Some(inputs.count("major_replacement_year")?),
            None => None,
        };
        let input = Self {
            annual_opex_capex: inputs.number("annual_opex_capex")?,
            opex_capex_escalation: inputs.number("opex_capex_escalation")?,
            major_replacement_year,
            major_replacement_cost: inputs.number_or("major_replacement_cost", Decimal::ZERO)?,
        };
        if input.opex_capex_escalation <= -Decimal::ONE {
            return Err(inputs.invalid("opex_capex_escalation", "must be above -100%"));
        }
        Ok(input)
    }
}

/// Operational capex for one year: the escalated base plus the major
/// replacement in exactly its configured year.
pub fn operational_capex(input: &OperationalCapexInput, operating_year: u32) -> EngineResult<Money> {
    let base = time_value::escalate(
        input.annual_opex_capex,
        input.opex_capex_escalation,
        i64::from(operating_year) - 1,
    )?;
    let major = if input.major_replacement_year == Some(operating_year) {
        input.major_replacement_cost
    } else {
        Decimal::ZERO
    };
    base.checked_add(major)
        .ok_or_else(|| EngineError::overflow(format!("operational capex in operating year {operating_year}")))
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = OperationalCapexInput::from_inputs(inputs)?;
    let years = deps.count("operating_years")?;

    let series = (1..=years)
        .map(|y| operational_capex(&input, y))
        .collect::<EngineResult<Vec<Money>>>()?;

    let mut out = Outputs::new();
    out.insert("annual_operational_capex".into(), series.into());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sustaining() -> OperationalCapexInput {
        OperationalCapexInput {
            annual_opex_capex: dec!(500_000),
            opex_capex_escalation: dec!(0.025),
            major_replacement_year: Some(10),
            major_replacement_cost: dec!(5_000_000),
        }
    }

    #[test]
    fn test_base_escalates_from_second_year() {
        assert_eq!(operational_capex(&sustaining(), 1).unwrap(), dec!(500_000));
        assert_eq!(operational_capex(&sustaining(), 2).unwrap(), dec!(512_500));
    }

    #[test]
    fn test_replacement_lands_in_exact_year_only() {
        let input = sustaining();
        let y9 = operational_capex(&input, 9).unwrap();
        let y10 = operational_capex(&input, 10).unwrap();
        let y11 = operational_capex(&input, 11).unwrap();
        assert!(y10 - y9 > dec!(5_000_000));
        assert!(y11 < dec!(1_000_000));
    }

    #[test]
    fn test_no_replacement_year_configured() {
        let mut input = sustaining();
        input.major_replacement_year = None;
        assert!(operational_capex(&input, 10).unwrap() < dec!(1_000_000));
    }
}
