use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::{Money, Rate};
use crate::EngineResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructionEquity {
    pub construction_equity_total: Money,
    /// Investment tax credit earned on the contingency-loaded CAPEX
    pub itc_value: Money,
}

pub fn construction_equity(amount: Money, itc_percentage: Rate, total_capex_amount: Money) -> ConstructionEquity {
    ConstructionEquity {
        construction_equity_total: amount,
        itc_value: total_capex_amount * itc_percentage,
    }
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let amount = inputs.number("construction_equity_amount")?;
    let itc = inputs.number("itc_percentage")?;
    if amount < Decimal::ZERO {
        return Err(inputs.invalid("construction_equity_amount", "cannot be negative"));
    }
    if itc < Decimal::ZERO || itc > Decimal::ONE {
        return Err(inputs.invalid("itc_percentage", "must be between 0 and 1"));
    }

    let equity = construction_equity(amount, itc, deps.number("total_capex_amount")?);
    let mut out = Outputs::new();
    out.insert("construction_equity_total".into(), equity.construction_equity_total.into());
    out.insert("itc_value".into(), equity.itc_value.into());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_itc_follows_capex() {
        let e = construction_equity(dec!(25_000_000), dec!(0.30), dec!(105_000_000));
        assert_eq!(e.construction_equity_total, dec!(25_000_000));
        assert_eq!(e.itc_value, dec!(31_500_000));
    }
}
