use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use dcf_valuation_core::monte_carlo::{simulate, SimulationInput};

use crate::input;
use crate::input::assumptions::AssumptionArgs;
use crate::input::company::CompanyArgs;

/// Arguments for a Monte Carlo DCF run
#[derive(Args)]
pub struct MonteCarloArgs {
    #[command(flatten)]
    pub company: CompanyArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Standard deviation of the revenue growth draw
    #[arg(long, default_value = "0.02")]
    pub growth_std_dev: Decimal,

    /// Standard deviation of the EBIT margin draw
    #[arg(long, default_value = "0.03")]
    pub margin_std_dev: Decimal,

    /// Number of trials
    #[arg(long, default_value = "1000")]
    pub trials: u32,

    /// Master seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the per-trial values and draws in the output
    #[arg(long)]
    pub include_trials: bool,

    /// Path to JSON input file with simulation parameters (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_monte_carlo(args: MonteCarloArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let sim_input: SimulationInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        simulation_from_flags(&args)?
    };

    simulation_value(&sim_input, args.include_trials)
}

fn simulation_from_flags(args: &MonteCarloArgs) -> Result<SimulationInput, Box<dyn std::error::Error>> {
    let dcf_input = args.company.resolve(args.assumptions.resolve()?)?.input;
    if args.growth_std_dev > dec!(1) || args.margin_std_dev > dec!(1) {
        tracing::warn!(
            growth_std_dev = %args.growth_std_dev,
            margin_std_dev = %args.margin_std_dev,
            "standard deviations above 100% are unusual; inputs are fractions"
        );
    }
    Ok(SimulationInput {
        horizon_periods: dcf_input.horizon(),
        base_revenue: dcf_input.base_revenue,
        assumptions: dcf_input.assumptions,
        growth_std_dev: args.growth_std_dev,
        margin_std_dev: args.margin_std_dev,
        trials: args.trials,
        seed: args.seed,
    })
}

fn simulation_value(
    sim_input: &SimulationInput,
    include_trials: bool,
) -> Result<Value, Box<dyn std::error::Error>> {
    let result = simulate(sim_input)?;
    let mut value = serde_json::to_value(result)?;

    if !include_trials {
        if let Some(obj) = value["result"].as_object_mut() {
            obj.remove("enterprise_values");
            obj.remove("draws");
        }
    }

    Ok(value)
}
