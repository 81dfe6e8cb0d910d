use rust_decimal::Decimal;

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::{Money, Rate};
use crate::EngineResult;

/// Construction facility drawn including its upfront fee.
pub fn construction_debt_total(amount: Money, fee_pct: Rate) -> Money {
    amount * (Decimal::ONE + fee_pct)
}

pub fn evaluate(
    inputs: &ObjectInputs,
    _deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let amount = inputs.number("construction_debt_amount")?;
    let fee = inputs.number_or("construction_debt_fee_pct", Decimal::ZERO)?;
    if amount < Decimal::ZERO {
        return Err(inputs.invalid("construction_debt_amount", "cannot be negative"));
    }
    if fee < Decimal::ZERO {
        return Err(inputs.invalid("construction_debt_fee_pct", "cannot be negative"));
    }

    let mut out = Outputs::new();
    out.insert(
        "construction_debt_total".into(),
        construction_debt_total(amount, fee).into(),
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_is_added_to_principal() {
        assert_eq!(construction_debt_total(dec!(80_000_000), dec!(0.01)), dec!(80_800_000));
        assert_eq!(construction_debt_total(dec!(80_000_000), Decimal::ZERO), dec!(80_000_000));
    }
}
