use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::Money;
use crate::{EngineError, EngineResult};

/// Per-period operating spend: fixed costs plus operational capex.
pub fn annual_opex(fixed_costs: &[Money], operational_capex: &[Money]) -> EngineResult<Vec<Money>> {
    fixed_costs
        .iter()
        .zip(operational_capex)
        .enumerate()
        .map(|(t, (f, c))| {
            f.checked_add(*c)
                .ok_or_else(|| EngineError::overflow(format!("operating spend in period {}", t + 1)))
        })
        .collect()
}

pub fn evaluate(
    _inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let fixed = deps.series("fixed_costs")?;
    let capex = deps.series_of_len("annual_operational_capex", fixed.len())?;

    let mut out = Outputs::new();
    out.insert("annual_opex".into(), annual_opex(fixed, capex)?.into());
    out.insert("fixed_costs".into(), fixed.to_vec().into());
    out.insert("operational_capex".into(), capex.to_vec().into());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fixed_and_sustaining_spend_are_summed() {
        let opex = annual_opex(&[dec!(5_725_000), dec!(5_853_125)], &[dec!(500_000), dec!(512_500)]).unwrap();
        assert_eq!(opex, vec![dec!(6_225_000), dec!(6_365_625)]);
        assert!(annual_opex(&[Decimal::MAX], &[dec!(1)]).is_err());
    }
}
