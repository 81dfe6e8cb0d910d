use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{Money, Rate};
use crate::EngineResult;

pub const IRR_GUESS: Rate = dec!(0.10);
const IRR_STEP_TOLERANCE: Decimal = dec!(0.0001);
const IRR_DERIVATIVE_FLOOR: Decimal = dec!(0.0000000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const IRR_FLOOR: Rate = dec!(-0.99);
const IRR_CEILING: Rate = dec!(10);

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// How an IRR solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrrStatus {
    /// Step size fell below tolerance
    Converged,
    /// Iteration budget exhausted; rate is a best-effort estimate
    IterationLimit,
    /// NPV slope too flat to take a Newton step
    DerivativeVanished,
    /// Discounting overflowed at an extreme rate
    Overflow,
    /// All flows share a sign, so no rate zeroes the NPV
    NoSignChange,
    Empty,
}

impl IrrStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IrrStatus::Converged => "converged",
            IrrStatus::IterationLimit => "iteration_limit",
            IrrStatus::DerivativeVanished => "derivative_vanished",
            IrrStatus::Overflow => "overflow",
            IrrStatus::NoSignChange => "no_sign_change",
            IrrStatus::Empty => "empty",
        }
    }

    pub fn is_defined(self) -> bool {
        !matches!(self, IrrStatus::NoSignChange | IrrStatus::Empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrrSolution {
    pub rate: Rate,
    pub iterations: u32,
    pub status: IrrStatus,
}

/// Net Present Value of a series of cash flows, first flow undiscounted
pub fn npv(rate: Rate, cash_flows: &[Money]) -> EngineResult<Money> {
    if rate <= dec!(-1) {
        return Err(EngineError::DivisionByZero {
            context: "NPV discount rate at or below -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount *= one_plus_r;
        }
        if discount.is_zero() {
            return Err(EngineError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result += cf / discount;
    }

    Ok(result)
}

/// NPV and its analytic derivative `Σ −t·cf/(1+r)^(t+1)`.
/// `None` when discounting under- or overflows Decimal range.
fn npv_with_slope(rate: Rate, cash_flows: &[Money]) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;
    let mut value = Decimal::ZERO;
    let mut slope = Decimal::ZERO;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount.checked_mul(one_plus_r)?;
        }
        value = value.checked_add(cf.checked_div(discount)?)?;
        if t > 0 {
            let t_dec = Decimal::from(t as i64);
            let term = t_dec
                .checked_mul(*cf)?
                .checked_div(discount.checked_mul(one_plus_r)?)?;
            slope = slope.checked_sub(term)?;
        }
    }

    Some((value, slope))
}

/// Internal Rate of Return by Newton-Raphson.
///
/// Never fails: a vector without a sign change yields rate 0 with
/// [`IrrStatus::NoSignChange`], and an unconverged solve returns the last
/// iterate tagged with the reason it stopped.
pub fn irr(cash_flows: &[Money], guess: Rate) -> IrrSolution {
    if cash_flows.is_empty() {
        return IrrSolution {
            rate: Decimal::ZERO,
            iterations: 0,
            status: IrrStatus::Empty,
        };
    }

    let has_negative = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    let has_positive = cash_flows.iter().any(|cf| *cf > Decimal::ZERO);
    if !has_negative || !has_positive {
        return IrrSolution {
            rate: Decimal::ZERO,
            iterations: 0,
            status: IrrStatus::NoSignChange,
        };
    }

    let mut rate = guess;

    for i in 0..MAX_IRR_ITERATIONS {
        let Some((value, slope)) = npv_with_slope(rate, cash_flows) else {
            return IrrSolution {
                rate,
                iterations: i,
                status: IrrStatus::Overflow,
            };
        };

        if slope.abs() < IRR_DERIVATIVE_FLOOR {
            return IrrSolution {
                rate,
                iterations: i,
                status: IrrStatus::DerivativeVanished,
            };
        }

        let Some(next) = value.checked_div(slope).and_then(|step| rate.checked_sub(step)) else {
            return IrrSolution {
                rate,
                iterations: i,
                status: IrrStatus::Overflow,
            };
        };

        if (next - rate).abs() < IRR_STEP_TOLERANCE {
            return IrrSolution {
                rate: next,
                iterations: i + 1,
                status: IrrStatus::Converged,
            };
        }

        // Guard against divergence
        rate = next.clamp(IRR_FLOOR, IRR_CEILING);
    }

    IrrSolution {
        rate,
        iterations: MAX_IRR_ITERATIONS,
        status: IrrStatus::IterationLimit,
    }
}

/// Multiple on invested capital: total inflows over total outflows.
pub fn moic(cash_flows: &[Money]) -> Decimal {
    let inflows: Money = cash_flows.iter().filter(|cf| **cf > Decimal::ZERO).sum();
    let outflows: Money = cash_flows
        .iter()
        .filter(|cf| **cf < Decimal::ZERO)
        .sum::<Money>()
        .abs();
    if outflows.is_zero() {
        Decimal::ZERO
    } else {
        inflows / outflows
    }
}

/// Monthly rate and payment count for an annual rate and a term in years.
/// `None` when either is zero, as no amortisation is defined, or when the
/// payment count does not fit.
fn monthly_terms(annual_rate: Rate, term_years: u32) -> Option<(Rate, u32)> {
    if annual_rate <= Decimal::ZERO || term_years == 0 {
        return None;
    }
    Some((annual_rate / MONTHS_PER_YEAR, term_years.checked_mul(12)?))
}

/// Present value of 1 per month for `n` months: `(1 − (1+r_m)^−n) / r_m`.
pub fn monthly_annuity_factor(annual_rate: Rate, term_years: u32) -> Option<Decimal> {
    let (r_m, n) = monthly_terms(annual_rate, term_years)?;
    let growth = (Decimal::ONE + r_m).checked_powi(n as i64)?;
    if growth.is_zero() {
        return None;
    }
    Some((Decimal::ONE - Decimal::ONE / growth) / r_m)
}

/// Level annual debt service for a fully-amortising loan with monthly payments:
/// `P × r_m(1+r_m)^n / ((1+r_m)^n − 1) × 12`.
pub fn annual_debt_service(principal: Money, annual_rate: Rate, term_years: u32) -> Option<Money> {
    let (r_m, n) = monthly_terms(annual_rate, term_years)?;
    let growth = (Decimal::ONE + r_m).checked_powi(n as i64)?;
    let denominator = growth - Decimal::ONE;
    if denominator.is_zero() {
        return None;
    }
    principal
        .checked_mul(r_m * growth)?
        .checked_div(denominator)?
        .checked_mul(MONTHS_PER_YEAR)
}

/// Largest principal a given annual debt service can amortise.
pub fn max_principal(annual_debt_service: Money, annual_rate: Rate, term_years: u32) -> Option<Money> {
    let factor = monthly_annuity_factor(annual_rate, term_years)?;
    Some(annual_debt_service / MONTHS_PER_YEAR * factor)
}

/// One operating year of a monthly amortisation schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortisationYear {
    pub year: u32,
    pub opening_balance: Money,
    pub interest: Money,
    pub principal: Money,
    pub debt_service: Money,
    pub closing_balance: Money,
}

/// Roll a level monthly payment schedule up into annual totals for
/// `horizon_years`; years past the term carry zeros.
pub fn amortisation_schedule(
    principal: Money,
    annual_rate: Rate,
    term_years: u32,
    horizon_years: u32,
) -> Option<Vec<AmortisationYear>> {
    let (r_m, n) = monthly_terms(annual_rate, term_years)?;
    let monthly_payment = annual_debt_service(principal, annual_rate, term_years)? / MONTHS_PER_YEAR;

    let mut balance = principal;
    let mut schedule = Vec::with_capacity(horizon_years as usize);
    let mut month = 0u32;

    for year in 1..=horizon_years {
        let opening = balance;
        let mut interest = Decimal::ZERO;
        let mut repaid = Decimal::ZERO;
        for _ in 0..12 {
            if month >= n || balance <= Decimal::ZERO {
                break;
            }
            month += 1;
            let i = balance * r_m;
            // Final payment clears rounding residue
            let p = if month == n {
                balance
            } else {
                (monthly_payment - i).min(balance)
            };
            interest += i;
            repaid += p;
            balance -= p;
        }
        schedule.push(AmortisationYear {
            year,
            opening_balance: opening,
            interest,
            principal: repaid,
            debt_service: interest + repaid,
            closing_balance: balance,
        });
    }

    Some(schedule)
}

/// `(1 + rate)^periods`, for any signed number of periods.
pub fn compound_factor(rate: Rate, periods: i64) -> EngineResult<Decimal> {
    let base = Decimal::ONE + rate;
    if base <= Decimal::ZERO {
        return Err(EngineError::DivisionByZero {
            context: "compounding base at or below zero".into(),
        });
    }
    base.checked_powi(periods)
        .ok_or_else(|| EngineError::overflow(format!("compound factor over {periods} periods")))
}

/// `amount × (1 + rate)^periods`. Escalating past Decimal range is an
/// error, never a panic.
pub fn escalate(amount: Money, rate: Rate, periods: i64) -> EngineResult<Money> {
    compound_factor(rate, periods)?
        .checked_mul(amount)
        .ok_or_else(|| EngineError::overflow(format!("escalating {amount} over {periods} periods")))
}
