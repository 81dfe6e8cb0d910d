use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::diagnostics::Diagnostics;
use crate::error::EngineError;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::EngineResult;

/// Which statistic of the CFADS profile the debt is sized against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingBasis {
    /// Weakest year within the debt term
    #[default]
    Minimum,
    Average,
    /// First operating year only
    FirstYear,
}

impl SizingBasis {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "minimum" => Some(SizingBasis::Minimum),
            "average" => Some(SizingBasis::Average),
            "first_year" => Some(SizingBasis::FirstYear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtSizingInput {
    /// Minimum CFADS / debt service the lender accepts (e.g. 1.35x)
    pub target_dscr: Multiple,
    pub debt_rate: Rate,
    pub debt_term: u32,
    #[serde(default)]
    pub basis: SizingBasis,
}

/// Standalone sizing request: a CFADS profile plus lender terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtSizingRequest {
    pub cfads: Vec<Money>,
    #[serde(flatten)]
    pub terms: DebtSizingInput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtSizing {
    /// The CFADS figure the debt service is sized against
    pub sizing_cfads: Money,
    pub max_annual_ds: Money,
    pub max_debt: Money,
    pub actual_annual_ds: Money,
    pub achievable_dscr: Multiple,
}

impl DebtSizing {
    fn no_capacity(sizing_cfads: Money) -> Self {
        DebtSizing {
            sizing_cfads,
            max_annual_ds: Decimal::ZERO,
            max_debt: Decimal::ZERO,
            actual_annual_ds: Decimal::ZERO,
            achievable_dscr: Decimal::ZERO,
        }
    }
}

impl DebtSizingInput {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        let basis = inputs.choice_or("sizing_basis", "minimum")?;
        let basis = SizingBasis::parse(&basis).ok_or_else(|| {
            inputs.invalid(
                "sizing_basis",
                format!("unknown basis '{basis}' (expected minimum, average or first_year)"),
            )
        })?;
        let input = Self {
            target_dscr: inputs.number("target_dscr")?,
            debt_rate: inputs.number("debt_rate")?,
            debt_term: inputs.count("debt_term")?,
            basis,
        };
        input
            .validate()
            .map_err(|(field, reason)| inputs.invalid(field, reason))?;
        Ok(input)
    }

    fn validate(&self) -> Result<(), (&'static str, &'static str)> {
        if self.target_dscr < Decimal::ONE {
            return Err(("target_dscr", "must be at least 1.0x"));
        }
        if self.debt_rate < Decimal::ZERO {
            return Err(("debt_rate", "cannot be negative"));
        }
        Ok(())
    }
}

/// The CFADS the debt is sized against, taken over the periods the debt is
/// outstanding.
pub fn sizing_cfads(cfads: &[Money], debt_term: u32, basis: SizingBasis) -> Money {
    let window = &cfads[..cfads.len().min(debt_term as usize)];
    match basis {
        SizingBasis::Minimum => window.iter().copied().min().unwrap_or(Decimal::ZERO),
        SizingBasis::Average if window.is_empty() => Decimal::ZERO,
        SizingBasis::Average => window.iter().copied().sum::<Decimal>() / Decimal::from(window.len()),
        SizingBasis::FirstYear => window.first().copied().unwrap_or(Decimal::ZERO),
    }
}

/// Size debt so that the sizing CFADS still covers the target DSCR.
/// Undefined cases (zero rate or term, no positive CFADS) give zero
/// capacity and push a warning rather than fail.
pub fn size_debt(cfads: &[Money], input: &DebtSizingInput, warnings: &mut Vec<String>) -> DebtSizing {
    let sizing = sizing_cfads(cfads, input.debt_term, input.basis);

    if input.debt_rate.is_zero() || input.debt_term == 0 {
        warnings.push("debt rate or term is zero; no debt capacity computed".into());
        return DebtSizing::no_capacity(sizing);
    }
    if sizing <= Decimal::ZERO {
        warnings.push(format!(
            "sizing CFADS over the debt term is {}; no debt capacity",
            sizing.round_dp(2)
        ));
        return DebtSizing::no_capacity(sizing);
    }

    let max_annual_ds = sizing / input.target_dscr;
    let Some((max_debt, actual_annual_ds)) =
        time_value::max_principal(max_annual_ds, input.debt_rate, input.debt_term).and_then(|p| {
            time_value::annual_debt_service(p, input.debt_rate, input.debt_term).map(|ds| (p, ds))
        })
    else {
        warnings.push("annuity factor is undefined for these debt terms".into());
        return DebtSizing::no_capacity(sizing);
    };

    let achievable_dscr = if actual_annual_ds.is_zero() {
        Decimal::ZERO
    } else {
        sizing / actual_annual_ds
    };

    DebtSizing {
        sizing_cfads: sizing,
        max_annual_ds,
        max_debt,
        actual_annual_ds,
        achievable_dscr,
    }
}

/// Size debt for a CFADS profile outside a scenario.
pub fn size_debt_to_target(request: &DebtSizingRequest) -> EngineResult<ComputationOutput<DebtSizing>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    request.terms.validate().map_err(|(field, reason)| EngineError::InvalidInput {
        object: "debt_sizing".into(),
        field: field.into(),
        reason: reason.into(),
    })?;
    if request.cfads.is_empty() {
        return Err(EngineError::InvalidInput {
            object: "debt_sizing".into(),
            field: "cfads".into(),
            reason: "at least one period of CFADS is required".into(),
        });
    }

    let result = size_debt(&request.cfads, &request.terms, &mut warnings);
    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Target-DSCR debt sizing (monthly annuity over the debt term)",
        &request.terms,
        warnings,
        elapsed,
        result,
    ))
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = DebtSizingInput::from_inputs(inputs)?;
    let cfads = deps.series("cfads_operating")?;

    let mut warnings = Vec::new();
    let sized = size_debt(cfads, &input, &mut warnings);
    for w in warnings {
        diag.guard(inputs.object(), "max_debt", w);
    }

    let mut out = Outputs::new();
    out.insert("sizing_cfads".into(), sized.sizing_cfads.into());
    out.insert("max_annual_ds".into(), sized.max_annual_ds.into());
    out.insert("max_debt".into(), sized.max_debt.into());
    out.insert("actual_annual_ds".into(), sized.actual_annual_ds.into());
    out.insert("achievable_dscr".into(), sized.achievable_dscr.into());
    Ok(out)
}
