use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::diagnostics::{Diagnostics, IssueKind};
use crate::error::EngineError;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value::{self, IrrStatus, IRR_GUESS};
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, OutputValue, Rate};
use crate::EngineResult;

/// Everything that lands in the equity cashflow vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityFlows {
    pub construction_years: u32,
    pub equity_contribution: Money,
    /// Operating-period series, one entry per operating year
    pub cfads: Vec<Money>,
    pub debt_service: Vec<Money>,
    pub tax: Vec<Money>,
    pub itc_value: Money,
    pub terminal_value: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityReturns {
    pub equity_cf_by_period: Vec<Money>,
    pub equity_cf_construction: Money,
    /// Average operating-period equity cashflow, before terminal value
    pub equity_cf_operations: Money,
    pub equity_cf_terminal: Money,
    pub equity_irr: Rate,
    pub irr_status: IrrStatus,
    pub irr_iterations: u32,
    pub equity_moic: Multiple,
}

/// Build the equity vector, length `construction_years + operating_years`.
///
/// Each construction period funds an equal share of the contribution. With
/// no construction periods the contribution is netted into the first
/// operating period. The ITC lands in the first operating period and the
/// terminal value in the last.
pub fn equity_cashflows(flows: &EquityFlows) -> Vec<Money> {
    let mut vector: Vec<Money> = Vec::with_capacity(flows.construction_years as usize + flows.cfads.len());

    if flows.construction_years > 0 {
        let per_period = flows.equity_contribution / Decimal::from(flows.construction_years);
        vector.extend(std::iter::repeat(-per_period).take(flows.construction_years as usize));
    }

    for (i, cfads) in flows.cfads.iter().enumerate() {
        let ds = flows.debt_service.get(i).copied().unwrap_or(Decimal::ZERO);
        let tax = flows.tax.get(i).copied().unwrap_or(Decimal::ZERO);
        let mut cf = cfads - ds - tax;
        if i == 0 {
            cf += flows.itc_value;
            if flows.construction_years == 0 {
                cf -= flows.equity_contribution;
            }
        }
        vector.push(cf);
    }

    if let Some(last) = vector.last_mut() {
        *last += flows.terminal_value;
    }
    vector
}

pub fn equity_returns(flows: &EquityFlows, irr_guess: Rate) -> EquityReturns {
    let vector = equity_cashflows(flows);
    let operating = &vector[flows.construction_years as usize..];

    let equity_cf_operations = if operating.is_empty() {
        Decimal::ZERO
    } else {
        (operating.iter().sum::<Money>() - flows.terminal_value) / Decimal::from(operating.len() as u64)
    };

    let solution = time_value::irr(&vector, irr_guess);

    EquityReturns {
        equity_cf_construction: -flows.equity_contribution,
        equity_cf_operations,
        equity_cf_terminal: flows.terminal_value,
        equity_irr: solution.rate,
        irr_status: solution.status,
        irr_iterations: solution.iterations,
        equity_moic: time_value::moic(&vector),
        equity_cf_by_period: vector,
    }
}

/// Returns on an arbitrary cashflow vector, first flow at t = 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowReturnsInput {
    pub cash_flows: Vec<Money>,
    #[serde(default)]
    pub irr_guess: Option<Rate>,
    #[serde(default)]
    pub discount_rate: Option<Rate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashflowReturns {
    pub irr: Rate,
    pub irr_status: IrrStatus,
    pub iterations: u32,
    pub moic: Multiple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npv: Option<Money>,
}

pub fn analyze_cashflows(input: &CashflowReturnsInput) -> EngineResult<ComputationOutput<CashflowReturns>> {
    let start = Instant::now();
    let mut warnings = Vec::new();

    if input.cash_flows.is_empty() {
        return Err(EngineError::InvalidInput {
            object: "equity_cashflow".into(),
            field: "cash_flows".into(),
            reason: "at least one cash flow is required".into(),
        });
    }

    let solution = time_value::irr(&input.cash_flows, input.irr_guess.unwrap_or(IRR_GUESS));
    match solution.status {
        IrrStatus::Converged => {}
        IrrStatus::NoSignChange | IrrStatus::Empty => {
            warnings.push("IRR undefined: cash flows do not change sign; reported as 0".into())
        }
        other => warnings.push(format!(
            "IRR did not converge ({}); last estimate reported",
            other.as_str()
        )),
    }

    let npv = input
        .discount_rate
        .map(|r| time_value::npv(r, &input.cash_flows))
        .transpose()?;

    let result = CashflowReturns {
        irr: solution.rate,
        irr_status: solution.status,
        iterations: solution.iterations,
        moic: time_value::moic(&input.cash_flows),
        npv,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Newton-Raphson IRR with MOIC",
        input,
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
    let guess = inputs.number_or("irr_guess", IRR_GUESS)?;
    let operating_years = deps.count("operating_years")? as usize;
    let flows = EquityFlows {
        construction_years: deps.count("construction_years")?,
        equity_contribution: deps.number("equity_contribution")?,
        cfads: deps.series_of_len("cfads_operating", operating_years)?.to_vec(),
        debt_service: deps.series_of_len("debt_service_by_year", operating_years)?.to_vec(),
        tax: deps.series_of_len("tax_by_year", operating_years)?.to_vec(),
        itc_value: deps.number("itc_value")?,
        terminal_value: deps.number("terminal_value")?,
    };

    let r = equity_returns(&flows, guess);
    match r.irr_status {
        IrrStatus::Converged => {}
        IrrStatus::NoSignChange | IrrStatus::Empty => diag.note(
            inputs.object(),
            IssueKind::IrrUndefined,
            Some("equity_irr"),
            "equity cashflow has no sign change; IRR reported as 0",
        ),
        status => diag.note(
            inputs.object(),
            IssueKind::IrrNotConverged,
            Some("equity_irr"),
            format!(
                "IRR solve stopped after {} iterations ({}); last estimate reported",
                r.irr_iterations,
                status.as_str()
            ),
        ),
    }

    let mut out = Outputs::new();
    out.insert("equity_cf_by_period".into(), r.equity_cf_by_period.into());
    out.insert("equity_cf_construction".into(), r.equity_cf_construction.into());
    out.insert("equity_cf_operations".into(), r.equity_cf_operations.into());
    out.insert("equity_cf_terminal".into(), r.equity_cf_terminal.into());
    out.insert("equity_irr".into(), r.equity_irr.into());
    out.insert(
        "irr_status".into(),
        OutputValue::Text(r.irr_status.as_str().to_string()),
    );
    out.insert("equity_moic".into(), r.equity_moic.into());
    Ok(out)
}
