use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::error::EngineError;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value::{self, AmortisationYear};
use crate::types::{Money, Multiple, Rate};
use crate::EngineResult;

/// Where the operating-debt principal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalSource {
    /// Take the target-DSCR sized amount
    Sized,
    /// Use the `debt_amount` input
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingDebtInput {
    pub principal_source: PrincipalSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_amount: Option<Money>,
    pub debt_rate: Rate,
    pub debt_term: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSchedule {
    pub principal: Money,
    /// Level annual debt service
    pub debt_service: Money,
    pub years: Vec<AmortisationYear>,
    /// CFADS / debt service; zero in years with nothing due
    pub dscr_by_year: Vec<Multiple>,
    /// Lowest DSCR among years with debt service
    pub min_dscr: Multiple,
}

impl OperatingDebtInput {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        let principal_source = match inputs.choice_or("principal_source", "sized")?.as_str() {
            "sized" => PrincipalSource::Sized,
            "manual" => PrincipalSource::Manual,
            other => {
                return Err(inputs.invalid(
                    "principal_source",
                    format!("expected 'sized' or 'manual', got '{other}'"),
                ))
            }
        };
        let debt_amount = match principal_source {
            PrincipalSource::Manual => Some(inputs.number("debt_amount")?),
            PrincipalSource::Sized => inputs.optional_number("debt_amount")?,
        };
        let input = Self {
            principal_source,
            debt_amount,
            debt_rate: inputs.number("debt_rate")?,
            debt_term: inputs.count("debt_term")?,
        };
        if input.debt_rate < Decimal::ZERO {
            return Err(inputs.invalid("debt_rate", "cannot be negative"));
        }
        if input.debt_amount.is_some_and(|a| a < Decimal::ZERO) {
            return Err(inputs.invalid("debt_amount", "cannot be negative"));
        }
        Ok(input)
    }

    /// Principal to amortise, given the sized amount from debt sizing.
    pub fn principal(&self, sized: Money) -> EngineResult<Money> {
        match self.principal_source {
            PrincipalSource::Sized => Ok(sized),
            PrincipalSource::Manual => self.debt_amount.ok_or_else(|| EngineError::MissingInput {
                object: "operating_debt".into(),
                field: "debt_amount".into(),
            }),
        }
    }
}

fn zero_schedule(principal: Money, years: usize) -> Vec<AmortisationYear> {
    (1..=years as u32)
        .map(|year| AmortisationYear {
            year,
            opening_balance: principal,
            interest: Decimal::ZERO,
            principal: Decimal::ZERO,
            debt_service: Decimal::ZERO,
            closing_balance: principal,
        })
        .collect()
}

/// Amortise `principal` over the operating years covered by `cfads` and
/// measure coverage year by year. A zero rate or term yields no schedule
/// and a warning.
pub fn schedule_debt(
    principal: Money,
    debt_rate: Rate,
    debt_term: u32,
    cfads: &[Money],
    warnings: &mut Vec<String>,
) -> DebtSchedule {
    let horizon = cfads.len();
    let amortised = time_value::annual_debt_service(principal, debt_rate, debt_term).zip(
        time_value::amortisation_schedule(principal, debt_rate, debt_term, horizon as u32),
    );

    let (debt_service, years) = match amortised {
        Some(found) => found,
        None => {
            warnings.push("debt rate or term is zero; debt service set to 0".into());
            (Decimal::ZERO, zero_schedule(principal, horizon))
        }
    };

    if debt_term as usize > horizon && !debt_service.is_zero() {
        warnings.push(format!(
            "debt term of {debt_term} years runs past the {horizon} operating years; balance outstanding at end"
        ));
    }

    let dscr_by_year: Vec<Multiple> = years
        .iter()
        .zip(cfads)
        .map(|(y, cf)| {
            if y.debt_service.is_zero() {
                Decimal::ZERO
            } else {
                cf / y.debt_service
            }
        })
        .collect();

    let min_dscr = years
        .iter()
        .zip(&dscr_by_year)
        .filter(|(y, _)| !y.debt_service.is_zero())
        .map(|(_, d)| *d)
        .min()
        .unwrap_or(Decimal::ZERO);

    DebtSchedule {
        principal,
        debt_service,
        years,
        dscr_by_year,
        min_dscr,
    }
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = OperatingDebtInput::from_inputs(inputs)?;
    let cfads = deps.series("cfads_operating")?;
    let principal = input.principal(deps.number("max_debt")?)?;

    let mut warnings = Vec::new();
    let s = schedule_debt(principal, input.debt_rate, input.debt_term, cfads, &mut warnings);
    for w in warnings {
        diag.guard(inputs.object(), "debt_service", w);
    }

    let column = |f: fn(&AmortisationYear) -> Money| s.years.iter().map(f).collect::<Vec<_>>();

    let mut out = Outputs::new();
    out.insert("principal".into(), s.principal.into());
    out.insert("debt_service".into(), s.debt_service.into());
    out.insert("debt_service_by_year".into(), column(|y| y.debt_service).into());
    out.insert("interest_by_year".into(), column(|y| y.interest).into());
    out.insert("principal_by_year".into(), column(|y| y.principal).into());
    out.insert("closing_balance_by_year".into(), column(|y| y.closing_balance).into());
    out.insert("dscr_by_year".into(), s.dscr_by_year.clone().into());
    out.insert("min_dscr".into(), s.min_dscr.into());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectId;
    use indexmap::IndexMap;
    use rust_decimal_macros::dec;

    #[test]
    fn test_schedule_covers_operating_horizon() {
        let mut w = Vec::new();
        let s = schedule_debt(dec!(1_000_000), dec!(0.06), 10, &[dec!(200_000); 20], &mut w);
        assert!(w.is_empty());
        assert_eq!(s.years.len(), 20);
        assert!((s.debt_service - dec!(133_224.60)).abs() < dec!(0.01));
        assert_eq!(s.years[15].debt_service, Decimal::ZERO);
        assert_eq!(s.dscr_by_year[15], Decimal::ZERO);
        // First year carries a full level payment
        assert!((s.dscr_by_year[0] - dec!(1.5012)).abs() < dec!(0.0001));
        assert!(s.min_dscr > dec!(1.5));
    }

    #[test]
    fn test_zero_rate_is_guarded() {
        let mut w = Vec::new();
        let s = schedule_debt(dec!(1_000_000), Decimal::ZERO, 10, &[dec!(1); 3], &mut w);
        assert_eq!(s.debt_service, Decimal::ZERO);
        assert_eq!(s.years.len(), 3);
        assert_eq!(s.min_dscr, Decimal::ZERO);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn test_term_longer_than_operations_warns() {
        let mut w = Vec::new();
        let s = schedule_debt(dec!(1_000_000), dec!(0.06), 10, &[dec!(200_000); 5], &mut w);
        assert_eq!(w.len(), 1);
        assert!(s.years[4].closing_balance > Decimal::ZERO);
    }

    #[test]
    fn test_manual_source_requires_amount() {
        let mut values = IndexMap::new();
        values.insert("principal_source".to_string(), "manual".into());
        values.insert("debt_rate".to_string(), dec!(0.05).into());
        values.insert("debt_term".to_string(), dec!(10).into());
        let inputs = ObjectInputs::new(ObjectId::OperatingDebt, values);
        assert!(matches!(
            OperatingDebtInput::from_inputs(&inputs),
            Err(EngineError::MissingInput { .. })
        ));
    }

    #[test]
    fn test_unknown_principal_source_is_invalid() {
        let mut values = IndexMap::new();
        values.insert("principal_source".to_string(), "guess".into());
        values.insert("debt_rate".to_string(), dec!(0.05).into());
        values.insert("debt_term".to_string(), dec!(10).into());
        let inputs = ObjectInputs::new(ObjectId::OperatingDebt, values);
        assert!(matches!(
            OperatingDebtInput::from_inputs(&inputs),
            Err(EngineError::InvalidInput { .. })
        ));
    }
}
