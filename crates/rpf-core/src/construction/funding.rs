use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::{Money, Rate};
use crate::EngineResult;

/// Sources and uses may differ by this much before it is reported.
pub const SOURCES_USES_TOLERANCE: Money = dec!(1);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funding {
    pub total_funding: Money,
    pub equity_contribution: Money,
    pub debt_drawdown: Money,
    pub equity_year0: Money,
    pub equity_year1: Money,
    pub debt_year0: Money,
    pub debt_year1: Money,
    /// Sources minus uses; positive means over-funded
    pub sources_uses_delta: Money,
}

impl Funding {
    pub fn is_balanced(&self) -> bool {
        self.sources_uses_delta.abs() <= SOURCES_USES_TOLERANCE
    }
}

/// Aggregate construction sources and split the drawdowns between the two
/// construction years.
pub fn aggregate_funding(
    equity_total: Money,
    debt_total: Money,
    total_capex_amount: Money,
    equity_year0_pct: Rate,
    debt_year0_pct: Rate,
) -> Funding {
    let total_funding = equity_total + debt_total;
    let equity_year0 = equity_total * equity_year0_pct;
    let debt_year0 = debt_total * debt_year0_pct;
    Funding {
        total_funding,
        equity_contribution: equity_total,
        debt_drawdown: debt_total,
        equity_year0,
        equity_year1: equity_total - equity_year0,
        debt_year0,
        debt_year1: debt_total - debt_year0,
        sources_uses_delta: total_funding - total_capex_amount,
    }
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let equity_pct = inputs.number("equity_year0_pct")?;
    let debt_pct = inputs.number("debt_year0_pct")?;
    for (field, pct) in [("equity_year0_pct", equity_pct), ("debt_year0_pct", debt_pct)] {
        if pct < Decimal::ZERO || pct > Decimal::ONE {
            return Err(inputs.invalid(field, "must be between 0 and 1"));
        }
    }

    let f = aggregate_funding(
        deps.number("construction_equity_total")?,
        deps.number("construction_debt_total")?,
        deps.number("total_capex_amount")?,
        equity_pct,
        debt_pct,
    );

    let mut out = Outputs::new();
    out.insert("total_funding".into(), f.total_funding.into());
    out.insert("equity_contribution".into(), f.equity_contribution.into());
    out.insert("debt_drawdown".into(), f.debt_drawdown.into());
    out.insert("equity_year0".into(), f.equity_year0.into());
    out.insert("equity_year1".into(), f.equity_year1.into());
    out.insert("debt_year0".into(), f.debt_year0.into());
    out.insert("debt_year1".into(), f.debt_year1.into());
    out.insert("sources_uses_delta".into(), f.sources_uses_delta.into());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_scenario_is_over_funded() {
        let f = aggregate_funding(dec!(25_000_000), dec!(80_800_000), dec!(105_000_000), dec!(0.8), dec!(0.8));
        assert_eq!(f.total_funding, dec!(105_800_000));
        assert_eq!(f.sources_uses_delta, dec!(800_000));
        assert!(!f.is_balanced());
    }

    #[test]
    fn test_drawdowns_sum_to_totals() {
        let f = aggregate_funding(dec!(30), dec!(70), dec!(100), dec!(0.6), dec!(0.25));
        assert_eq!(f.equity_year0 + f.equity_year1, dec!(30));
        assert_eq!(f.debt_year0, dec!(17.5));
        assert!(f.is_balanced());
    }

    #[test]
    fn test_one_dollar_tolerance() {
        let f = aggregate_funding(dec!(30), dec!(71), dec!(100), dec!(1), dec!(1));
        assert!(f.is_balanced());
        let f = aggregate_funding(dec!(30), dec!(71.01), dec!(100), dec!(1), dec!(1));
        assert!(!f.is_balanced());
    }
}
