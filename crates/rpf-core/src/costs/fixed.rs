use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value;
use crate::types::{Money, Rate};
use crate::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedCostsInput {
    pub om_contract_base: Money,
    pub om_escalation: Rate,
    pub land_lease: Money,
    pub insurance: Money,
    pub other_opex: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedCostsYear {
    pub operating_year: u32,
    pub om_cost: Money,
    pub lease_cost: Money,
    pub insurance_cost: Money,
    pub fixed_costs: Money,
}

impl FixedCostsInput {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        let input = Self {
            om_contract_base: inputs.number("om_contract_base")?,
            om_escalation: inputs.number("om_escalation")?,
            land_lease: inputs.number("land_lease")?,
            insurance: inputs.number("insurance")?,
            other_opex: inputs.number_or("other_opex", Decimal::ZERO)?,
        };
        if input.om_escalation <= -Decimal::ONE {
            return Err(inputs.invalid("om_escalation", "must be above -100%"));
        }
        Ok(input)
    }
}

/// Fixed operating costs for one year. The O&M contract escalates from the
/// first operating year; lease, insurance and other costs are flat.
pub fn fixed_costs(input: &FixedCostsInput, operating_year: u32) -> EngineResult<FixedCostsYear> {
    let om_cost = time_value::escalate(
        input.om_contract_base,
        input.om_escalation,
        i64::from(operating_year),
    )?;
    let fixed_costs = [input.land_lease, input.insurance, input.other_opex]
        .into_iter()
        .try_fold(om_cost, Decimal::checked_add)
        .ok_or_else(|| EngineError::overflow(format!("fixed costs in operating year {operating_year}")))?;
    Ok(FixedCostsYear {
        operating_year,
        om_cost,
        lease_cost: input.land_lease,
        insurance_cost: input.insurance,
        fixed_costs,
    })
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = FixedCostsInput::from_inputs(inputs)?;
    let years = deps.count("operating_years")?;
    let rows = (1..=years)
        .map(|y| fixed_costs(&input, y))
        .collect::<EngineResult<Vec<_>>>()?;

    let column = |f: fn(&FixedCostsYear) -> Money| rows.iter().map(f).collect::<Vec<_>>();

    let mut out = Outputs::new();
    out.insert("fixed_costs".into(), column(|r| r.fixed_costs).into());
    out.insert("om_cost".into(), column(|r| r.om_cost).into());
    out.insert("lease_cost".into(), column(|r| r.lease_cost).into());
    out.insert("insurance_cost".into(), column(|r| r.insurance_cost).into());
    Ok(out)
}
