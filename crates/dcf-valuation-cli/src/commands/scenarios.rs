use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use dcf_valuation_core::scenarios::{sensitivity_grid, RateAxis, SensitivityInput};

use crate::input;
use crate::input::assumptions::AssumptionArgs;
use crate::input::company::CompanyArgs;

/// Arguments for the discount rate x terminal growth grid
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub company: CompanyArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Discount rate axis as min:max:step (default 0.07:0.10:0.005)
    #[arg(long)]
    pub discount_axis: Option<String>,

    /// Terminal growth axis as min:max:step (default 0.01:0.04:0.005)
    #[arg(long)]
    pub growth_axis: Option<String>,

    /// Path to JSON file with cash flows and both axes (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Parse an axis given as `min:max:step`.
pub fn parse_axis(spec: &str) -> Result<RateAxis, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        return Err(format!("Rate axis must be min:max:step, got '{}'", spec).into());
    }
    let parse = |s: &str| -> Result<Decimal, Box<dyn std::error::Error>> {
        s.trim()
            .parse::<Decimal>()
            .map_err(|e| format!("Invalid rate '{}' in axis '{}': {}", s, spec, e).into())
    };
    Ok(RateAxis::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
}

/// Resolve both axes, falling back to the reference sweeps.
pub fn resolve_axes(
    discount_axis: Option<&str>,
    growth_axis: Option<&str>,
) -> Result<(RateAxis, RateAxis), Box<dyn std::error::Error>> {
    let d = match discount_axis {
        Some(spec) => parse_axis(spec)?,
        None => RateAxis::default_discount_rates(),
    };
    let g = match growth_axis {
        Some(spec) => parse_axis(spec)?,
        None => RateAxis::default_terminal_growth_rates(),
    };
    Ok((d, g))
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let grid_input: SensitivityInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        grid_input_from_flags(&args)?
    };

    let result = sensitivity_grid(&grid_input)?;
    Ok(serde_json::to_value(result)?)
}

fn grid_input_from_flags(args: &SensitivityArgs) -> Result<SensitivityInput, Box<dyn std::error::Error>> {
    let dcf_input = args.company.resolve(args.assumptions.resolve()?)?.input;
    let projection = dcf_input.projection()?;
    let (d_axis, g_axis) = resolve_axes(args.discount_axis.as_deref(), args.growth_axis.as_deref())?;
    Ok(SensitivityInput::from_projection(&projection, &d_axis, &g_axis)?)
}
