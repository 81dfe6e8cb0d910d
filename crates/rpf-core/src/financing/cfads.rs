use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::{Diagnostics, IssueKind};
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::Money;
use crate::{EngineError, EngineResult};

/// Construction-phase amounts netted in the early periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionFlows {
    pub total_funding: Money,
    pub year0_capex: Money,
    pub year1_capex: Money,
}

impl ConstructionFlows {
    pub fn year0(&self) -> Money {
        self.total_funding - self.year0_capex
    }

    pub fn year1(&self) -> Money {
        -self.year1_capex
    }
}

/// Cashflow before debt for each construction period.
///
/// Funding nets against year-0 spend in the first period and year-1 spend
/// falls in the second. A single construction year carries both; later
/// construction years carry nothing.
pub fn construction_periods(construction_years: u32, flows: &ConstructionFlows) -> Vec<Money> {
    match construction_years {
        0 => Vec::new(),
        1 => vec![flows.year0() + flows.year1()],
        n => {
            let mut periods = vec![Decimal::ZERO; n as usize];
            periods[0] = flows.year0();
            periods[1] = flows.year1();
            periods
        }
    }
}

/// Operating CFADS per period: revenue less operating spend less
/// operational capex.
pub fn operating_cfads(
    total_revenue: &[Money],
    annual_opex: &[Money],
    operational_capex: &[Money],
) -> EngineResult<Vec<Money>> {
    total_revenue
        .iter()
        .zip(annual_opex)
        .zip(operational_capex)
        .enumerate()
        .map(|(t, ((r, o), c))| {
            r.checked_sub(*o)
                .and_then(|v| v.checked_sub(*c))
                .ok_or_else(|| EngineError::overflow(format!("CFADS in operating period {}", t + 1)))
        })
        .collect()
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let construction_years = deps.count("construction_years")?;
    let flows = ConstructionFlows {
        total_funding: deps.number("total_funding")?,
        year0_capex: deps.number("year0_capex")?,
        year1_capex: deps.number("year1_capex")?,
    };
    let revenue = deps.series("total_revenue")?;
    let opex = deps.series_of_len("annual_opex", revenue.len())?;
    let operational_capex = deps.series_of_len("annual_operational_capex", revenue.len())?;

    if construction_years == 0 {
        diag.note(
            inputs.object(),
            IssueKind::ConfigurationNote,
            Some("construction_years"),
            "no construction periods; funding and CAPEX are not netted into the cashflow",
        );
    }

    let cfads = operating_cfads(revenue, opex, operational_capex)?;
    let mut all_periods = construction_periods(construction_years, &flows);
    all_periods.extend_from_slice(&cfads);

    let mut out = Outputs::new();
    out.insert("cashflow_before_debt".into(), all_periods.into());
    out.insert("cfads_operating".into(), cfads.into());
    out.insert("cashflow_before_debt_year0".into(), flows.year0().into());
    out.insert("cashflow_before_debt_year1".into(), flows.year1().into());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn flows() -> ConstructionFlows {
        ConstructionFlows {
            total_funding: dec!(105_800_000),
            year0_capex: dec!(84_000_000),
            year1_capex: dec!(21_000_000),
        }
    }

    #[test]
    fn test_two_year_construction() {
        let p = construction_periods(2, &flows());
        assert_eq!(p, vec![dec!(21_800_000), dec!(-21_000_000)]);
    }

    #[test]
    fn test_single_construction_year_folds_both_phases() {
        let p = construction_periods(1, &flows());
        assert_eq!(p, vec![dec!(800_000)]);
    }

    #[test]
    fn test_longer_construction_pads_with_zero() {
        let p = construction_periods(4, &flows());
        assert_eq!(p.len(), 4);
        assert_eq!(p[2], Decimal::ZERO);
        assert_eq!(p[3], Decimal::ZERO);
        assert!(construction_periods(0, &flows()).is_empty());
    }

    #[test]
    fn test_operating_cfads_deducts_opex_and_operational_capex() {
        let cfads = operating_cfads(
            &[dec!(15_000_000), dec!(15_300_000)],
            &[dec!(6_225_000), dec!(6_365_625)],
            &[dec!(500_000), dec!(512_500)],
        )
        .unwrap();
        assert_eq!(cfads, vec![dec!(8_275_000), dec!(8_421_875)]);
    }
}
