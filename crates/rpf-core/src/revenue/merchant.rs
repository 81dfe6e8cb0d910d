use rust_decimal::Decimal;

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::{Energy, Money};
use crate::{EngineError, EngineResult};

/// Merchant sales for one period. A contracted period earns no merchant
/// revenue, so toll and merchant income never overlap.
pub fn merchant_revenue(
    annual_discharge_mwh: Energy,
    merchant_price: Money,
    is_contracted: bool,
) -> EngineResult<Money> {
    if is_contracted {
        return Ok(Decimal::ZERO);
    }
    annual_discharge_mwh
        .checked_mul(merchant_price)
        .ok_or_else(|| EngineError::overflow("merchant revenue"))
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let price = inputs.number("merchant_price")?;
    let discharge = deps.series("annual_discharge_mwh")?;
    let contracted = deps.series_of_len("is_contracted", discharge.len())?;

    let revenue = discharge
        .iter()
        .zip(contracted)
        .map(|(mwh, flag)| merchant_revenue(*mwh, price, !flag.is_zero()))
        .collect::<EngineResult<Vec<Money>>>()?;

    let mut out = Outputs::new();
    out.insert("merchant_revenue".into(), revenue.into());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectId;
    use indexmap::IndexMap;
    use rust_decimal_macros::dec;

    #[test]
    fn test_contracted_period_earns_nothing() {
        assert_eq!(merchant_revenue(dec!(69350), dec!(70), true).unwrap(), Decimal::ZERO);
        assert_eq!(merchant_revenue(dec!(69350), dec!(70), false).unwrap(), dec!(4_854_500));
        assert!(merchant_revenue(Decimal::MAX, dec!(70), false).is_err());
    }

    #[test]
    fn test_evaluate_switches_on_contract_flag() {
        let mut values = IndexMap::new();
        values.insert("merchant_price".to_string(), dec!(50).into());
        let inputs = ObjectInputs::new(ObjectId::MerchantRevenue, values);
        let deps = DependencyBundle::for_object(ObjectId::MerchantRevenue)
            .with("annual_discharge_mwh", vec![dec!(100), dec!(100), dec!(90)])
            .with("is_contracted", vec![dec!(1), dec!(0), dec!(0)]);

        let out = evaluate(&inputs, &deps, &mut Diagnostics::new()).unwrap();
        assert_eq!(
            out["merchant_revenue"].as_series().unwrap(),
            &[dec!(0), dec!(5000), dec!(4500)]
        );
    }
}
