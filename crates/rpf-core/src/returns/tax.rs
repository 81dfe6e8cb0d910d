use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::{Money, Rate};
use crate::EngineResult;

/// How the interest deduction is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestMethod {
    /// Interest split out of the amortisation schedule
    Schedule,
    /// Fixed share of each year's debt service
    Proxy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxInput {
    pub tax_rate: Rate,
    /// Straight-line depreciation life in operating years
    pub depr_years: u32,
    pub interest_method: InterestMethod,
    pub interest_proxy_pct: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSchedule {
    pub annual_depreciation: Money,
    pub depreciation_by_year: Vec<Money>,
    pub interest_deduction_by_year: Vec<Money>,
    pub taxable_income_by_year: Vec<Money>,
    pub tax_by_year: Vec<Money>,
    pub total_tax: Money,
}

impl TaxInput {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        let interest_method = match inputs.choice_or("interest_method", "schedule")?.as_str() {
            "schedule" => InterestMethod::Schedule,
            "proxy" => InterestMethod::Proxy,
            other => {
                return Err(inputs.invalid(
                    "interest_method",
                    format!("expected 'schedule' or 'proxy', got '{other}'"),
                ))
            }
        };
        let input = Self {
            tax_rate: inputs.number("tax_rate")?,
            depr_years: inputs.count("depr_years")?,
            interest_method,
            interest_proxy_pct: inputs.number_or("interest_proxy_pct", Decimal::ZERO)?,
        };
        if input.tax_rate < Decimal::ZERO || input.tax_rate > Decimal::ONE {
            return Err(inputs.invalid("tax_rate", "must be between 0 and 1"));
        }
        if input.interest_proxy_pct < Decimal::ZERO || input.interest_proxy_pct > Decimal::ONE {
            return Err(inputs.invalid("interest_proxy_pct", "must be between 0 and 1"));
        }
        Ok(input)
    }
}

/// Period inputs to the tax calculation, all indexed by operating year.
pub struct TaxBase<'a> {
    pub total_capex_amount: Money,
    pub cfads: &'a [Money],
    pub debt_service: &'a [Money],
    pub scheduled_interest: &'a [Money],
}

/// Straight-line depreciation over the first `depr_years` operating years,
/// interest deduction, and tax floored at zero each year. Losses are not
/// carried forward.
pub fn tax_schedule(base: &TaxBase<'_>, input: &TaxInput, warnings: &mut Vec<String>) -> TaxSchedule {
    let annual_depreciation = if input.depr_years == 0 {
        warnings.push("depreciation life is zero; no depreciation charged".into());
        Decimal::ZERO
    } else {
        base.total_capex_amount / Decimal::from(input.depr_years)
    };

    let mut schedule = TaxSchedule {
        annual_depreciation,
        depreciation_by_year: Vec::with_capacity(base.cfads.len()),
        interest_deduction_by_year: Vec::with_capacity(base.cfads.len()),
        taxable_income_by_year: Vec::with_capacity(base.cfads.len()),
        tax_by_year: Vec::with_capacity(base.cfads.len()),
        total_tax: Decimal::ZERO,
    };

    for (i, cfads) in base.cfads.iter().enumerate() {
        let depreciation = if (i as u32) < input.depr_years {
            annual_depreciation
        } else {
            Decimal::ZERO
        };
        let interest = match input.interest_method {
            InterestMethod::Schedule => base.scheduled_interest.get(i).copied(),
            InterestMethod::Proxy => base.debt_service.get(i).map(|ds| ds * input.interest_proxy_pct),
        }
        .unwrap_or(Decimal::ZERO);

        let taxable = cfads - interest - depreciation;
        let tax = (taxable * input.tax_rate).max(Decimal::ZERO);

        schedule.depreciation_by_year.push(depreciation);
        schedule.interest_deduction_by_year.push(interest);
        schedule.taxable_income_by_year.push(taxable);
        schedule.tax_by_year.push(tax);
        schedule.total_tax += tax;
    }

    schedule
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = TaxInput::from_inputs(inputs)?;
    let cfads = deps.series("cfads_operating")?;
    let base = TaxBase {
        total_capex_amount: deps.number("total_capex_amount")?,
        cfads,
        debt_service: deps.series_of_len("debt_service_by_year", cfads.len())?,
        scheduled_interest: deps.series_of_len("interest_by_year", cfads.len())?,
    };

    let mut warnings = Vec::new();
    let t = tax_schedule(&base, &input, &mut warnings);
    for w in warnings {
        diag.guard(inputs.object(), "depr_years", w);
    }

    let mut out = Outputs::new();
    out.insert("annual_depreciation".into(), t.annual_depreciation.into());
    out.insert("depreciation_by_year".into(), t.depreciation_by_year.into());
    out.insert("interest_deduction_by_year".into(), t.interest_deduction_by_year.into());
    out.insert("taxable_income_by_year".into(), t.taxable_income_by_year.into());
    out.insert("tax_by_year".into(), t.tax_by_year.into());
    out.insert("total_tax".into(), t.total_tax.into());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn input(method: InterestMethod) -> TaxInput {
        TaxInput {
            tax_rate: dec!(0.30),
            depr_years: 2,
            interest_method: method,
            interest_proxy_pct: dec!(0.50),
        }
    }

    fn base<'a>(cfads: &'a [Money], ds: &'a [Money], interest: &'a [Money]) -> TaxBase<'a> {
        TaxBase {
            total_capex_amount: dec!(1_000),
            cfads,
            debt_service: ds,
            scheduled_interest: interest,
        }
    }

    #[test]
    fn test_depreciation_stops_after_life() {
        let cfads = [dec!(1_000); 3];
        let zeros = [Decimal::ZERO; 3];
        let t = tax_schedule(&base(&cfads, &zeros, &zeros), &input(InterestMethod::Schedule), &mut Vec::new());
        assert_eq!(t.depreciation_by_year, vec![dec!(500), dec!(500), dec!(0)]);
        assert_eq!(t.tax_by_year, vec![dec!(150), dec!(150), dec!(300)]);
        assert_eq!(t.total_tax, dec!(600));
    }

    #[test]
    fn test_schedule_and_proxy_interest() {
        let cfads = [dec!(1_000); 2];
        let ds = [dec!(400); 2];
        let interest = [dec!(100), dec!(60)];
        let b = base(&cfads, &ds, &interest);

        let s = tax_schedule(&b, &input(InterestMethod::Schedule), &mut Vec::new());
        assert_eq!(s.interest_deduction_by_year, vec![dec!(100), dec!(60)]);

        let p = tax_schedule(&b, &input(InterestMethod::Proxy), &mut Vec::new());
        assert_eq!(p.interest_deduction_by_year, vec![dec!(200), dec!(200)]);
        assert!(p.total_tax < s.total_tax);
    }

    #[test]
    fn test_losses_pay_no_tax() {
        let cfads = [dec!(100)];
        let zeros = [Decimal::ZERO];
        let t = tax_schedule(&base(&cfads, &zeros, &zeros), &input(InterestMethod::Schedule), &mut Vec::new());
        assert_eq!(t.taxable_income_by_year, vec![dec!(-400)]);
        assert_eq!(t.tax_by_year, vec![Decimal::ZERO]);
    }

    #[test]
    fn test_zero_life_is_guarded() {
        let mut i = input(InterestMethod::Schedule);
        i.depr_years = 0;
        let cfads = [dec!(100)];
        let zeros = [Decimal::ZERO];
        let mut w = Vec::new();
        let t = tax_schedule(&base(&cfads, &zeros, &zeros), &i, &mut w);
        assert_eq!(t.annual_depreciation, Decimal::ZERO);
        assert_eq!(w.len(), 1);
    }
}
