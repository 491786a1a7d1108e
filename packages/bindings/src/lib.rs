use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use dcf_valuation_core::export::{projections_sheet, sensitivity_sheet};
use dcf_valuation_core::financials::FinancialSnapshot;
use dcf_valuation_core::scenarios::{RateAxis, SensitivityInput};
use dcf_valuation_core::valuation::{AssumptionSet, DcfInput, DEFAULT_HORIZON_PERIODS};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[napi]
pub fn build_projection(input_json: String) -> NapiResult<String> {
    let input: dcf_valuation_core::valuation::ProjectionInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        dcf_valuation_core::valuation::build_projection(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn run_dcf(input_json: String) -> NapiResult<String> {
    let input: DcfInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf_valuation_core::valuation::calculate_dcf(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct FinancialsRequest {
    snapshot: FinancialSnapshot,
    #[serde(default)]
    assumptions: AssumptionSet,
    horizon_periods: Option<u32>,
}

/// DCF straight from a provider snapshot in raw currency units.
#[napi]
pub fn run_dcf_from_financials(input_json: String) -> NapiResult<String> {
    let req: FinancialsRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    req.snapshot.validate().map_err(to_napi_error)?;
    let input = DcfInput::from_financials(
        &req.snapshot,
        req.assumptions,
        req.horizon_periods.unwrap_or(DEFAULT_HORIZON_PERIODS),
    )
    .map_err(to_napi_error)?;
    let output = dcf_valuation_core::valuation::calculate_dcf(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_grid(input_json: String) -> NapiResult<String> {
    let input: SensitivityInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        dcf_valuation_core::scenarios::sensitivity_grid(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Monte Carlo
// ---------------------------------------------------------------------------

#[napi]
pub fn monte_carlo_dcf(input_json: String) -> NapiResult<String> {
    let input: dcf_valuation_core::monte_carlo::SimulationInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = dcf_valuation_core::monte_carlo::simulate(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Projections and Sensitivity Table sheets over the reference rate axes.
#[napi]
pub fn export_sheets(input_json: String) -> NapiResult<String> {
    let input: DcfInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let valuation = dcf_valuation_core::valuation::calculate_dcf(&input).map_err(to_napi_error)?;
    let grid_input = SensitivityInput::from_projection(
        &valuation.result.projection,
        &RateAxis::default_discount_rates(),
        &RateAxis::default_terminal_growth_rates(),
    )
    .map_err(to_napi_error)?;
    let grid =
        dcf_valuation_core::scenarios::sensitivity_grid(&grid_input).map_err(to_napi_error)?;

    let sheets = [
        projections_sheet(&valuation.result),
        sensitivity_sheet(&grid.result),
    ];
    serde_json::to_string(&sheets).map_err(to_napi_error)
}
