mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::evaluate::{EvaluateArgs, PlanArgs};
use commands::solver::{IrrArgs, SizeDebtArgs};

/// Renewable project-finance cashflow engine
#[derive(Parser)]
#[command(
    name = "rpf",
    version,
    about = "Renewable project-finance cashflow engine",
    long_about = "Evaluates a network of project-finance calculation objects (timeline, \
                  revenue, costs, CAPEX and funding, CFADS, debt sizing, tax, terminal \
                  value and equity returns) with decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Round outputs for presentation ($ to whole units, multiples to 2 dp, rates to 4 dp)
    #[arg(long, global = true)]
    display: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a scenario (defaults when no input is given)
    Evaluate(EvaluateArgs),
    /// List the built-in calculation objects
    Objects,
    /// Print the evaluation order of a scenario's objects
    Plan(PlanArgs),
    /// IRR, MOIC and optional NPV of a cashflow vector
    Irr(IrrArgs),
    /// Size debt against a CFADS profile at a target DSCR
    SizeDebt(SizeDebtArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env("RPF_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Evaluate(args) => commands::evaluate::run_evaluate(args, cli.display),
        Commands::Objects => commands::evaluate::run_objects(),
        Commands::Plan(args) => commands::evaluate::run_plan(args),
        Commands::Irr(args) => commands::solver::run_irr(args),
        Commands::SizeDebt(args) => commands::solver::run_size_debt(args),
        Commands::Version => {
            println!("rpf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            if let Err(e) = output::format_output(&cli.output, &value) {
                eprintln!("{}: cannot write output: {}", "error".red().bold(), e);
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
