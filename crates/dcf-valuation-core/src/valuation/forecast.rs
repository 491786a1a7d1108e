use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DcfError;
use crate::time_value::compound_factor;
use crate::types::{Money, ProjectionPeriod};
use crate::DcfResult;

use super::assumptions::AssumptionSet;

/// Default explicit forecast horizon, in annual periods.
pub const DEFAULT_HORIZON_PERIODS: u32 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One projected year of the free cash flow build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastYear {
    pub period: ProjectionPeriod,
    pub revenue: Money,
    pub ebit: Money,
    pub nopat: Money,
    pub depreciation: Money,
    pub capex: Money,
    pub nwc_change: Money,
    pub free_cash_flow: Money,
}

/// Chronologically ordered forecast years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    years: Vec<ForecastYear>,
}

impl Projection {
    pub fn years(&self) -> &[ForecastYear] {
        &self.years
    }

    /// Number of explicit forecast periods.
    pub fn horizon(&self) -> u32 {
        self.years.len() as u32
    }

    pub fn free_cash_flows(&self) -> Vec<Money> {
        self.years.iter().map(|y| y.free_cash_flow).collect()
    }

    pub fn final_year(&self) -> Option<&ForecastYear> {
        self.years.last()
    }
}

/// JSON envelope for running a projection on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionInput {
    pub base_revenue: Money,
    #[serde(default)]
    pub assumptions: AssumptionSet,
    #[serde(default = "default_horizon")]
    pub horizon_periods: u32,
    /// Calendar year of the first forecast period; ordinal labels when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_forecast_year: Option<i32>,
}

fn default_horizon() -> u32 {
    DEFAULT_HORIZON_PERIODS
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project revenue through free cash flow for `horizon_periods` years.
///
/// Revenue in period `i` is `base_revenue * (1 + growth_rate)^i`: every period
/// compounds from the base figure rather than from the prior projected year.
pub fn project(
    base_revenue: Money,
    assumptions: &AssumptionSet,
    horizon_periods: u32,
) -> DcfResult<Projection> {
    build_years(base_revenue, assumptions, horizon_periods, None)
}

/// Same as [`project`] but labels periods with calendar years starting at `first_year`.
pub fn project_calendar(
    base_revenue: Money,
    assumptions: &AssumptionSet,
    horizon_periods: u32,
    first_year: i32,
) -> DcfResult<Projection> {
    build_years(base_revenue, assumptions, horizon_periods, Some(first_year))
}

/// Run a projection from its JSON envelope.
pub fn build_projection(input: &ProjectionInput) -> DcfResult<Projection> {
    build_years(
        input.base_revenue,
        &input.assumptions,
        input.horizon_periods,
        input.first_forecast_year,
    )
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn build_years(
    base_revenue: Money,
    assumptions: &AssumptionSet,
    horizon_periods: u32,
    first_year: Option<i32>,
) -> DcfResult<Projection> {
    if horizon_periods == 0 {
        return Err(DcfError::InvalidInput {
            field: "horizon_periods".into(),
            reason: "Forecast horizon must be at least one period".into(),
        });
    }

    let mut years = Vec::with_capacity(horizon_periods as usize);

    for i in 1..=horizon_periods {
        let revenue = base_revenue
            .checked_mul(compound_factor(assumptions.growth_rate, i)?)
            .ok_or_else(|| DcfError::InvalidInput {
                field: "base_revenue".into(),
                reason: format!("Revenue in period {i} overflows decimal range"),
            })?;
        let overflow = || DcfError::InvalidInput {
            field: "assumptions".into(),
            reason: format!("Line items in period {i} overflow decimal range"),
        };
        let ebit = revenue
            .checked_mul(assumptions.ebit_margin)
            .ok_or_else(overflow)?;
        let nopat = ebit
            .checked_mul(Decimal::ONE - assumptions.tax_rate)
            .ok_or_else(overflow)?;
        let depreciation = revenue
            .checked_mul(assumptions.depreciation_pct)
            .ok_or_else(overflow)?;
        let capex = revenue
            .checked_mul(assumptions.capex_pct)
            .ok_or_else(overflow)?;
        let nwc_change = revenue
            .checked_mul(assumptions.nwc_change_pct)
            .ok_or_else(overflow)?;

        // FCF = NOPAT + D&A - CapEx - Delta NWC
        let free_cash_flow = nopat
            .checked_add(depreciation)
            .and_then(|x| x.checked_sub(capex))
            .and_then(|x| x.checked_sub(nwc_change))
            .ok_or_else(overflow)?;

        years.push(ForecastYear {
            period: ProjectionPeriod::new(i, first_year)?,
            revenue,
            ebit,
            nopat,
            depreciation,
            capex,
            nwc_change,
            free_cash_flow,
        });
    }

    debug!(
        horizon = horizon_periods,
        base_revenue = %base_revenue,
        final_fcf = %years[years.len() - 1].free_cash_flow,
        "built projection"
    );

    Ok(Projection { years })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_year1_build() {
        let p = project(dec!(100), &AssumptionSet::default(), 5).unwrap();
        let y1 = &p.years()[0];

        // Revenue = 100 * 1.05 = 105
        assert_eq!(y1.revenue, dec!(105));
        // EBIT = 105 * 0.25 = 26.25
        assert_eq!(y1.ebit, dec!(26.25));
        // NOPAT = 26.25 * 0.79 = 20.7375
        assert_eq!(y1.nopat, dec!(20.7375));
        assert_eq!(y1.depreciation, dec!(5.25));
        assert_eq!(y1.capex, dec!(6.30));
        assert_eq!(y1.nwc_change, dec!(2.10));
        // FCF = 20.7375 + 5.25 - 6.30 - 2.10 = 17.5875
        assert_eq!(y1.free_cash_flow, dec!(17.5875));
    }

    #[test]
    fn test_growth_compounds_from_base() {
        let p = project(dec!(100), &AssumptionSet::default(), 5).unwrap();
        assert_eq!(p.years()[1].revenue, dec!(110.25));
        assert_eq!(p.years()[4].revenue, dec!(127.62815625));
    }

    #[test]
    fn test_horizon_length_and_order() {
        let p = project(dec!(100), &AssumptionSet::default(), 7).unwrap();
        assert_eq!(p.horizon(), 7);
        for (idx, y) in p.years().iter().enumerate() {
            assert_eq!(y.period.year, idx as i32 + 1);
        }
        assert_eq!(p.final_year().unwrap().period.label, "Year 7");
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let err = project(dec!(100), &AssumptionSet::default(), 0).unwrap_err();
        assert!(matches!(err, DcfError::InvalidInput { .. }));
    }

    #[test]
    fn test_calendar_labels() {
        let p = project_calendar(dec!(100), &AssumptionSet::default(), 5, 2024).unwrap();
        let labels: Vec<&str> = p.years().iter().map(|y| y.period.label.as_str()).collect();
        assert_eq!(labels, vec!["2024", "2025", "2026", "2027", "2028"]);
    }

    #[test]
    fn test_calendar_year_overflow_rejected() {
        let err = project_calendar(dec!(100), &AssumptionSet::default(), 5, i32::MAX).unwrap_err();
        assert!(matches!(
            err,
            DcfError::InvalidInput { ref field, .. } if field == "first_forecast_year"
        ));
    }

    #[test]
    fn test_line_item_overflow_rejected() {
        let a = AssumptionSet {
            growth_rate: Decimal::ZERO,
            ebit_margin: dec!(3),
            ..AssumptionSet::default()
        };
        let err = project(Decimal::MAX / dec!(2), &a, 1).unwrap_err();
        assert!(matches!(
            err,
            DcfError::InvalidInput { ref field, .. } if field == "assumptions"
        ));
    }

    #[test]
    fn test_zero_growth_flat_revenue() {
        let a = AssumptionSet {
            growth_rate: Decimal::ZERO,
            ..AssumptionSet::default()
        };
        let p = project(dec!(250), &a, 3).unwrap();
        assert!(p.years().iter().all(|y| y.revenue == dec!(250)));
    }

    #[test]
    fn test_build_projection_defaults() {
        let input: ProjectionInput =
            serde_json::from_value(serde_json::json!({ "base_revenue": 100 })).unwrap();
        let p = build_projection(&input).unwrap();
        assert_eq!(p.horizon(), DEFAULT_HORIZON_PERIODS);
        assert_eq!(p.years()[0].free_cash_flow, dec!(17.5875));
    }
}
