use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::error::DcfError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::DcfResult;

use super::assumptions::AssumptionSet;
use super::discount::discount;
use super::equity::{equity_value, price_per_share};
use super::forecast::{project, project_calendar, Projection, DEFAULT_HORIZON_PERIODS};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Input parameters for a Discounted Cash Flow valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfInput {
    /// Trailing annual revenue the forecast compounds from
    pub base_revenue: Money,
    /// Forecast and discounting assumptions
    #[serde(default)]
    pub assumptions: AssumptionSet,
    /// Number of explicit forecast years (default: 5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizon_periods: Option<u32>,
    /// Calendar year of the first forecast period
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_forecast_year: Option<i32>,
    /// Cash and equivalents for the equity bridge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash: Option<Money>,
    /// Debt for the equity bridge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt: Option<Money>,
    /// Shares outstanding, in the same scale as the monetary unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<Decimal>,
}

impl DcfInput {
    pub fn new(base_revenue: Money, assumptions: AssumptionSet) -> Self {
        DcfInput {
            base_revenue,
            assumptions,
            horizon_periods: None,
            first_forecast_year: None,
            cash: None,
            debt: None,
            shares_outstanding: None,
        }
    }

    pub fn horizon(&self) -> u32 {
        self.horizon_periods.unwrap_or(DEFAULT_HORIZON_PERIODS)
    }

    /// Baseline projection, calendar-labelled when a first forecast year is set.
    pub fn projection(&self) -> DcfResult<Projection> {
        match self.first_forecast_year {
            Some(first) => project_calendar(self.base_revenue, &self.assumptions, self.horizon(), first),
            None => project(self.base_revenue, &self.assumptions, self.horizon()),
        }
    }
}

/// Output of the DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationOutput {
    /// Year-by-year free cash flow build
    pub projection: Projection,
    /// `1 / (1 + r)^i` per forecast year
    pub discount_factors: Vec<Rate>,
    /// Discounted free cash flow per forecast year
    pub discounted_cash_flows: Vec<Money>,
    /// Sum of present values of explicit-period FCFs
    pub pv_of_fcf: Money,
    /// Gordon growth terminal value
    pub terminal_value: Money,
    /// Present value of terminal value
    pub pv_of_terminal: Money,
    /// Enterprise value = PV(FCFs) + PV(TV)
    pub enterprise_value: Money,
    /// Equity value = EV - debt + cash (if bridge data provided)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equity_value: Option<Money>,
    /// Per-share equity value; absent when the share count is zero or unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_share: Option<Money>,
    /// Terminal value as a percentage of enterprise value
    pub terminal_value_pct: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run the FCF projection, discount it and bridge to equity.
pub fn calculate_dcf(input: &DcfInput) -> DcfResult<ComputationOutput<ValuationOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let a = &input.assumptions;
    let horizon = input.horizon();

    // --- Project cash flows ---
    let projection = input.projection()?;

    if projection
        .years()
        .iter()
        .any(|y| y.free_cash_flow < Decimal::ZERO)
    {
        warnings.push("One or more projected free cash flows are negative".into());
    }

    // --- Discount ---
    let discounted = discount(&projection, a.discount_rate, a.terminal_growth_rate)?;
    let enterprise_value = discounted.enterprise_value;

    // --- Terminal value percentage warning ---
    // Zero or near-zero EV leaves the share undefined; report it as zero.
    let tv_pct = discounted
        .pv_of_terminal
        .checked_div(enterprise_value)
        .unwrap_or(Decimal::ZERO);
    if tv_pct > dec!(0.75) {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; consider extending the explicit forecast period",
            tv_pct.saturating_mul(dec!(100))
        ));
    }

    // --- Equity bridge ---
    let (equity, per_share) = compute_equity_bridge(input, enterprise_value, &mut warnings)?;

    info!(
        enterprise_value = %enterprise_value,
        horizon,
        warnings = warnings.len(),
        "dcf valuation complete"
    );

    let output = ValuationOutput {
        projection,
        discount_factors: discounted.discount_factors,
        discounted_cash_flows: discounted.discounted_cash_flows,
        pv_of_fcf: discounted.pv_of_fcf,
        terminal_value: discounted.terminal_value,
        pv_of_terminal: discounted.pv_of_terminal,
        enterprise_value,
        equity_value: equity,
        price_per_share: per_share,
        terminal_value_pct: tv_pct,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "FCFF DCF (constant growth, Gordon terminal value)",
        input,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn compute_equity_bridge(
    input: &DcfInput,
    enterprise_value: Money,
    warnings: &mut Vec<String>,
) -> DcfResult<(Option<Money>, Option<Money>)> {
    let equity = match (input.cash, input.debt) {
        (None, None) => None,
        (cash, debt) => Some(equity_value(
            enterprise_value,
            cash.unwrap_or(Decimal::ZERO),
            debt.unwrap_or(Decimal::ZERO),
        )?),
    };

    let Some(eq) = equity else {
        return Ok((None, None));
    };

    match price_per_share(eq, input.shares_outstanding) {
        Ok(pps) => Ok((Some(eq), Some(pps))),
        Err(DcfError::DivisionByZero { context }) => {
            warnings.push(format!("Price per share unavailable: division by zero in {context}"));
            Ok((Some(eq), None))
        }
        Err(e) => Err(e),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
