use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value;
use crate::types::{Money, Rate};
use crate::EngineResult;

/// Tolling agreement terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TollContract {
    /// Operating years covered by the toll, counted from COD
    pub contract_years: u32,
    pub toll_payment_year1: Money,
    pub toll_escalation: Rate,
    /// Share of the toll actually earned (0-1)
    pub toll_availability_factor: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractedYear {
    pub operating_year: u32,
    pub is_contracted: bool,
    pub toll_payment_current_year: Money,
    pub contracted_revenue: Money,
}

impl TollContract {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        let contract = Self {
            contract_years: inputs.count("contract_years")?,
            toll_payment_year1: inputs.number("toll_payment_year1")?,
            toll_escalation: inputs.number("toll_escalation")?,
            toll_availability_factor: inputs.number_or("toll_availability_factor", Decimal::ONE)?,
        };
        if contract.toll_escalation <= -Decimal::ONE {
            return Err(inputs.invalid("toll_escalation", "must be above -100%"));
        }
        if contract.toll_availability_factor < Decimal::ZERO
            || contract.toll_availability_factor > Decimal::ONE
        {
            return Err(inputs.invalid("toll_availability_factor", "must be between 0 and 1"));
        }
        Ok(contract)
    }

    pub fn is_contracted(&self, operating_year: u32) -> bool {
        operating_year <= self.contract_years
    }
}

/// Toll revenue for one operating year. Zero once the contract has run off;
/// merchant revenue takes over from the following year.
pub fn contracted_revenue(contract: &TollContract, operating_year: u32) -> EngineResult<ContractedYear> {
    let is_contracted = contract.is_contracted(operating_year);
    let toll_payment_current_year = time_value::escalate(
        contract.toll_payment_year1,
        contract.toll_escalation,
        i64::from(operating_year) - 1,
    )?;
    let contracted_revenue = if is_contracted {
        toll_payment_current_year * contract.toll_availability_factor
    } else {
        Decimal::ZERO
    };

    Ok(ContractedYear {
        operating_year,
        is_contracted,
        toll_payment_current_year,
        contracted_revenue,
    })
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let contract = TollContract::from_inputs(inputs)?;
    let years = deps.count("operating_years")?;

    let rows = (1..=years)
        .map(|y| contracted_revenue(&contract, y))
        .collect::<EngineResult<Vec<_>>>()?;

    let mut out = Outputs::new();
    out.insert(
        "is_contracted".into(),
        rows.iter()
            .map(|r| if r.is_contracted { Decimal::ONE } else { Decimal::ZERO })
            .collect::<Vec<_>>()
            .into(),
    );
    out.insert(
        "toll_payment_current_year".into(),
        rows.iter().map(|r| r.toll_payment_current_year).collect::<Vec<_>>().into(),
    );
    out.insert(
        "contracted_revenue".into(),
        rows.iter().map(|r| r.contracted_revenue).collect::<Vec<_>>().into(),
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn toll() -> TollContract {
        TollContract {
            contract_years: 10,
            toll_payment_year1: dec!(15_000_000),
            toll_escalation: dec!(0.02),
            toll_availability_factor: Decimal::ONE,
        }
    }

    #[test]
    fn test_first_year_pays_base_toll() {
        let r = contracted_revenue(&toll(), 1).unwrap();
        assert!(r.is_contracted);
        assert_eq!(r.contracted_revenue, dec!(15_000_000));
    }

    #[test]
    fn test_toll_escalates() {
        let r = contracted_revenue(&toll(), 2).unwrap();
        assert_eq!(r.contracted_revenue, dec!(15_300_000));
    }

    #[test]
    fn test_contract_boundary_is_inclusive() {
        assert!(contracted_revenue(&toll(), 10).unwrap().is_contracted);
        let after = contracted_revenue(&toll(), 11).unwrap();
        assert!(!after.is_contracted);
        assert_eq!(after.contracted_revenue, Decimal::ZERO);
        // The escalated toll is still reported for reference
        assert!(after.toll_payment_current_year > dec!(15_000_000));
    }

    #[test]
    fn test_availability_scales_revenue() {
        let mut c = toll();
        c.toll_availability_factor = dec!(0.9);
        assert_eq!(contracted_revenue(&c, 1).unwrap().contracted_revenue, dec!(13_500_000));
    }

    #[test]
    fn test_runaway_escalation_is_an_error() {
        let mut c = toll();
        c.toll_escalation = dec!(2);
        assert!(contracted_revenue(&c, 10).is_ok());
        let err = contracted_revenue(&c, 60).unwrap_err();
        assert!(matches!(err, crate::EngineError::NumericOverflow { .. }), "{err}");
    }
}
