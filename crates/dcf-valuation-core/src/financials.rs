//! Boundary to the external financial-statement provider.
//!
//! The core never fetches data itself. A provider hands over a
//! [`FinancialSnapshot`] in raw currency units and the valuation entry points
//! take the converted figures as explicit parameters.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::DcfError;
use crate::types::money_from_f64;
use crate::valuation::{AssumptionSet, DcfInput};
use crate::DcfResult;

/// Reported figures are divided by this to express them in millions.
const MILLIONS: Decimal = dec!(1000000);

/// Figures extracted from a company's statements, in raw currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    pub ticker: String,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    pub latest_annual_revenue: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cash_balance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_term_debt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares_outstanding: Option<f64>,
    /// End date of the fiscal year the revenue figure belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_year_end: Option<NaiveDate>,
    #[serde(default)]
    pub historical_operating_cash_flow: Vec<f64>,
    /// Capital expenditure per year; providers report it with either sign
    #[serde(default)]
    pub historical_capex: Vec<f64>,
}

impl FinancialSnapshot {
    /// Check the fields the valuation cannot run without.
    pub fn validate(&self) -> DcfResult<()> {
        if !self.latest_annual_revenue.is_finite() {
            return Err(DcfError::DataUnavailable(format!(
                "{}: latest annual revenue is missing",
                self.ticker
            )));
        }
        Ok(())
    }

    /// Operating cash flow less capex for each year both series cover.
    pub fn historical_free_cash_flows(&self) -> Vec<f64> {
        self.historical_operating_cash_flow
            .iter()
            .zip(&self.historical_capex)
            .map(|(ocf, capex)| ocf - capex.abs())
            .collect()
    }

    /// Market-implied share price, when market cap and share count are known.
    pub fn market_price_per_share(&self) -> Option<f64> {
        match (self.market_cap, self.shares_outstanding) {
            (Some(cap), Some(shares)) if shares > 0.0 && cap.is_finite() => Some(cap / shares),
            _ => None,
        }
    }

    /// First forecast year: the year after the reported fiscal year.
    pub fn first_forecast_year(&self) -> Option<i32> {
        self.fiscal_year_end.map(|d| d.year() + 1)
    }
}

/// Source of company financials, implemented outside the core.
pub trait FinancialsProvider {
    fn fetch_financials(&self, ticker: &str) -> DcfResult<FinancialSnapshot>;
}

/// Provider over snapshots already held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticFinancialsProvider {
    snapshots: HashMap<String, FinancialSnapshot>,
}

impl StaticFinancialsProvider {
    pub fn new(snapshots: impl IntoIterator<Item = FinancialSnapshot>) -> Self {
        let snapshots = snapshots
            .into_iter()
            .map(|s| (s.ticker.to_uppercase(), s))
            .collect();
        StaticFinancialsProvider { snapshots }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl FinancialsProvider for StaticFinancialsProvider {
    fn fetch_financials(&self, ticker: &str) -> DcfResult<FinancialSnapshot> {
        let snapshot = self
            .snapshots
            .get(&ticker.trim().to_uppercase())
            .ok_or_else(|| {
                DcfError::DataUnavailable(format!("no financials available for ticker '{ticker}'"))
            })?;
        snapshot.validate()?;
        Ok(snapshot.clone())
    }
}

impl DcfInput {
    /// Build DCF inputs from a snapshot, expressing every figure in millions.
    ///
    /// The share count is scaled the same way so price per share stays in
    /// currency units per share.
    pub fn from_financials(
        snapshot: &FinancialSnapshot,
        assumptions: AssumptionSet,
        horizon_periods: u32,
    ) -> DcfResult<DcfInput> {
        let in_millions = |field: &str, v: f64| -> DcfResult<Decimal> {
            Ok(money_from_f64(field, v)? / MILLIONS)
        };

        Ok(DcfInput {
            base_revenue: in_millions("latest_annual_revenue", snapshot.latest_annual_revenue)?,
            assumptions,
            horizon_periods: Some(horizon_periods),
            first_forecast_year: snapshot.first_forecast_year(),
            cash: snapshot
                .cash_balance
                .map(|v| in_millions("cash_balance", v))
                .transpose()?,
            debt: snapshot
                .long_term_debt
                .map(|v| in_millions("long_term_debt", v))
                .transpose()?,
            shares_outstanding: snapshot
                .shares_outstanding
                .map(|v| in_millions("shares_outstanding", v))
                .transpose()?,
        })
    }
}
