use clap::Args;
use serde_json::{json, Value};

use dcf_valuation_core::valuation::{build_projection, calculate_dcf, DcfInput, ProjectionInput};

use crate::input;
use crate::input::assumptions::AssumptionArgs;
use crate::input::company::CompanyArgs;

/// Arguments for a free cash flow projection
#[derive(Args)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub company: CompanyArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for a DCF valuation
#[derive(Args)]
pub struct ValueArgs {
    #[command(flatten)]
    pub company: CompanyArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Path to JSON input file with DCF parameters (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let projection_input: ProjectionInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        projection_from_flags(&args.company, &args.assumptions)?
    };

    projection_rows(&projection_input)
}

fn projection_from_flags(
    company: &CompanyArgs,
    assumptions: &AssumptionArgs,
) -> Result<ProjectionInput, Box<dyn std::error::Error>> {
    let resolved = company.resolve(assumptions.resolve()?)?.input;
    Ok(ProjectionInput {
        horizon_periods: resolved.horizon(),
        base_revenue: resolved.base_revenue,
        assumptions: resolved.assumptions,
        first_forecast_year: resolved.first_forecast_year,
    })
}

fn projection_rows(projection_input: &ProjectionInput) -> Result<Value, Box<dyn std::error::Error>> {
    let projection = build_projection(projection_input)?;

    // One flat row per year so table and csv output line up
    let rows: Vec<Value> = projection
        .years()
        .iter()
        .map(|y| {
            json!({
                "year": y.period.label,
                "revenue": y.revenue,
                "ebit": y.ebit,
                "nopat": y.nopat,
                "depreciation": y.depreciation,
                "capex": y.capex,
                "nwc_change": y.nwc_change,
                "free_cash_flow": y.free_cash_flow,
            })
        })
        .collect();
    Ok(Value::Array(rows))
}

pub fn run_value(args: ValueArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let (dcf_input, market_price) = if let Some(ref path) = args.input {
        (input::file::read_json::<DcfInput>(path)?, None)
    } else if let Some(data) = input::stdin::read_stdin::<DcfInput>()? {
        (data, None)
    } else {
        let resolved = args.company.resolve(args.assumptions.resolve()?)?;
        let market = resolved
            .snapshot
            .as_ref()
            .and_then(|s| s.market_price_per_share());
        (resolved.input, market)
    };

    valuation_value(&dcf_input, market_price)
}

fn valuation_value(
    dcf_input: &DcfInput,
    market_price: Option<f64>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let result = calculate_dcf(dcf_input)?;
    let mut value = serde_json::to_value(result)?;

    if let (Some(price), Some(obj)) = (market_price, value["result"].as_object_mut()) {
        obj.insert("market_price_per_share".into(), json!(price));
    }

    Ok(value)
}
