use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use rpf_core::financing::sizing::{self, DebtSizingInput, DebtSizingRequest, SizingBasis};
use rpf_core::returns::equity::{self, CashflowReturnsInput};

use crate::input;

/// Arguments for IRR / MOIC on a cashflow vector
#[derive(Args)]
pub struct IrrArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Cash flows, first at t = 0 (comma-separated, e.g. "-100,30,30,130")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub flows: Option<Vec<Decimal>>,

    /// Newton-Raphson starting rate
    #[arg(long)]
    pub guess: Option<Decimal>,

    /// Also report NPV at this rate
    #[arg(long)]
    pub discount_rate: Option<Decimal>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let returns_input: CashflowReturnsInput = match input::load(args.input.as_deref())? {
        Some(loaded) => loaded,
        None => CashflowReturnsInput {
            cash_flows: args.flows.ok_or("--flows is required (or provide --input)")?,
            irr_guess: args.guess,
            discount_rate: args.discount_rate,
        },
    };

    let result = equity::analyze_cashflows(&returns_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for target-DSCR debt sizing
#[derive(Args)]
pub struct SizeDebtArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// CFADS per operating year (comma-separated)
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cfads: Option<Vec<Decimal>>,

    /// Target DSCR, e.g. 1.35
    #[arg(long, default_value = "1.35")]
    pub target_dscr: Decimal,

    /// Annual interest rate as a decimal (0.055 = 5.5%)
    #[arg(long, default_value = "0.055")]
    pub rate: Decimal,

    /// Debt term in years
    #[arg(long, default_value_t = 15)]
    pub term: u32,

    /// CFADS statistic over the term: minimum, average or first_year
    #[arg(long, default_value = "minimum")]
    pub basis: String,
}

pub fn run_size_debt(args: SizeDebtArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: DebtSizingRequest = match input::load(args.input.as_deref())? {
        Some(loaded) => loaded,
        None => {
            let basis = SizingBasis::parse(&args.basis).ok_or_else(|| {
                format!("unknown --basis '{}' (expected minimum, average or first_year)", args.basis)
            })?;
            DebtSizingRequest {
                cfads: args.cfads.ok_or("--cfads is required (or provide --input)")?,
                terms: DebtSizingInput {
                    target_dscr: args.target_dscr,
                    debt_rate: args.rate,
                    debt_term: args.term,
                    basis,
                },
            }
        }
    };

    let result = sizing::size_debt_to_target(&request)?;
    Ok(serde_json::to_value(result)?)
}
