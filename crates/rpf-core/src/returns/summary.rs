use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value;
use crate::types::{Money, Rate};
use crate::EngineResult;

/// Project-level cash position after debt service and tax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowSummary {
    pub net_cash_flow_by_year: Vec<Money>,
    /// Running total; the final period includes the terminal value
    pub cumulative_cash_flow: Vec<Money>,
    /// NPV of cashflow before debt plus terminal value
    pub project_npv: Money,
}

pub struct SummaryFlows<'a> {
    pub construction_years: u32,
    /// All periods, construction first
    pub cashflow_before_debt: &'a [Money],
    /// Operating periods only
    pub debt_service: &'a [Money],
    pub tax: &'a [Money],
    pub itc_value: Money,
    pub terminal_value: Money,
}

pub fn summarise(flows: &SummaryFlows<'_>, discount_rate: Rate) -> EngineResult<CashflowSummary> {
    let offset = flows.construction_years as usize;

    let net_cash_flow_by_year: Vec<Money> = flows
        .cashflow_before_debt
        .iter()
        .enumerate()
        .map(|(t, cf)| {
            let Some(op) = t.checked_sub(offset) else {
                return *cf;
            };
            let ds = flows.debt_service.get(op).copied().unwrap_or(Decimal::ZERO);
            let tax = flows.tax.get(op).copied().unwrap_or(Decimal::ZERO);
            let itc = if op == 0 { flows.itc_value } else { Decimal::ZERO };
            cf - ds - tax + itc
        })
        .collect();

    let mut running = Decimal::ZERO;
    let mut cumulative_cash_flow: Vec<Money> = net_cash_flow_by_year
        .iter()
        .map(|cf| {
            running += cf;
            running
        })
        .collect();
    if let Some(last) = cumulative_cash_flow.last_mut() {
        *last += flows.terminal_value;
    }

    let mut project_flows = flows.cashflow_before_debt.to_vec();
    if let Some(last) = project_flows.last_mut() {
        *last += flows.terminal_value;
    }
    let project_npv = time_value::npv(discount_rate, &project_flows)?;

    Ok(CashflowSummary {
        net_cash_flow_by_year,
        cumulative_cash_flow,
        project_npv,
    })
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let discount_rate = inputs.number_or("discount_rate", dec!(0.08))?;
    if discount_rate <= -Decimal::ONE {
        return Err(inputs.invalid("discount_rate", "must be above -100%"));
    }

    let construction_years = deps.count("construction_years")?;
    let cfbd = deps.series("cashflow_before_debt")?;
    let operating = cfbd.len().saturating_sub(construction_years as usize);
    let flows = SummaryFlows {
        construction_years,
        cashflow_before_debt: cfbd,
        debt_service: deps.series_of_len("debt_service_by_year", operating)?,
        tax: deps.series_of_len("tax_by_year", operating)?,
        itc_value: deps.number("itc_value")?,
        terminal_value: deps.number("terminal_value")?,
    };

    let s = summarise(&flows, discount_rate)?;
    let mut out = Outputs::new();
    out.insert("net_cash_flow_by_year".into(), s.net_cash_flow_by_year.into());
    out.insert("cumulative_cash_flow".into(), s.cumulative_cash_flow.into());
    out.insert("project_npv".into(), s.project_npv.into());
    Ok(out)
}
