use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, IssueKind};
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::{Money, Rate};
use crate::EngineResult;

const PHASING_TOLERANCE: Decimal = dec!(0.0001);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapexInput {
    pub total_capex: Money,
    /// Share of CAPEX spent in construction year 0
    pub year0_percentage: Rate,
    pub year1_percentage: Rate,
    pub contingency: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapexPhasing {
    pub total_capex_amount: Money,
    pub year0_capex: Money,
    pub year1_capex: Money,
}

impl CapexInput {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        let input = Self {
            total_capex: inputs.number("total_capex")?,
            year0_percentage: inputs.number("year0_percentage")?,
            year1_percentage: inputs.number("year1_percentage")?,
            contingency: inputs.number_or("contingency", Decimal::ZERO)?,
        };
        if input.total_capex < Decimal::ZERO {
            return Err(inputs.invalid("total_capex", "cannot be negative"));
        }
        if input.contingency < Decimal::ZERO {
            return Err(inputs.invalid("contingency", "cannot be negative"));
        }
        Ok(input)
    }

    /// Whether the phasing shares add up to the whole budget.
    pub fn is_fully_phased(&self) -> bool {
        (self.year0_percentage + self.year1_percentage - Decimal::ONE).abs() < PHASING_TOLERANCE
    }
}

/// Contingency-loaded CAPEX split across the two construction years.
/// The split is taken as given; shares that do not sum to one are reported,
/// not rescaled.
pub fn phase_capex(input: &CapexInput) -> CapexPhasing {
    let total_capex_amount = input.total_capex * (Decimal::ONE + input.contingency);
    CapexPhasing {
        total_capex_amount,
        year0_capex: total_capex_amount * input.year0_percentage,
        year1_capex: total_capex_amount * input.year1_percentage,
    }
}

pub fn evaluate(
    inputs: &ObjectInputs,
    _deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = CapexInput::from_inputs(inputs)?;

    if !input.is_fully_phased() {
        diag.note(
            inputs.object(),
            IssueKind::ConfigurationNote,
            Some("year1_percentage"),
            format!(
                "CAPEX phasing sums to {} rather than 100%",
                input.year0_percentage + input.year1_percentage
            ),
        );
    }

    let phasing = phase_capex(&input);
    let mut out = Outputs::new();
    out.insert("total_capex_amount".into(), phasing.total_capex_amount.into());
    out.insert("year0_capex".into(), phasing.year0_capex.into());
    out.insert("year1_capex".into(), phasing.year1_capex.into());
    Ok(out)
}
