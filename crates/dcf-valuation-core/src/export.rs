//! Tabular layout of valuation results for spreadsheet export.
//!
//! Sheets are plain header + string rows; writing them to a file format is
//! left to the caller.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::scenarios::SensitivityGrid;
use crate::valuation::ValuationOutput;

pub const PROJECTIONS_SHEET: &str = "Projections";
pub const SENSITIVITY_SHEET: &str = "Sensitivity Table";

const MONEY_DP: u32 = 2;
const FACTOR_DP: u32 = 6;
const RATE_DP: u32 = 3;

/// One named table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn width(&self) -> usize {
        self.header.len()
    }
}

fn fixed(value: Decimal, dp: u32) -> String {
    format!("{:.*}", dp as usize, value.round_dp(dp))
}

/// Year-by-year projection with discounting columns, amounts in millions.
pub fn projections_sheet(valuation: &ValuationOutput) -> Sheet {
    let header = [
        "Year",
        "Revenue (M)",
        "EBIT (M)",
        "NOPAT (M)",
        "Depreciation (M)",
        "CapEx (M)",
        "\u{2206}NWC (M)",
        "FCF (M)",
        "Discount Factor",
        "Discounted FCF (M)",
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();

    let rows = valuation
        .projection
        .years()
        .iter()
        .enumerate()
        .map(|(i, y)| {
            let factor = valuation.discount_factors.get(i).copied();
            let discounted = valuation.discounted_cash_flows.get(i).copied();
            vec![
                y.period.label.clone(),
                fixed(y.revenue, MONEY_DP),
                fixed(y.ebit, MONEY_DP),
                fixed(y.nopat, MONEY_DP),
                fixed(y.depreciation, MONEY_DP),
                fixed(y.capex, MONEY_DP),
                fixed(y.nwc_change, MONEY_DP),
                fixed(y.free_cash_flow, MONEY_DP),
                factor.map(|f| fixed(f, FACTOR_DP)).unwrap_or_default(),
                discounted.map(|d| fixed(d, MONEY_DP)).unwrap_or_default(),
            ]
        })
        .collect();

    Sheet {
        name: PROJECTIONS_SHEET.to_string(),
        header,
        rows,
    }
}

/// Discount rate rows against terminal growth columns, values in billions.
///
/// Undefined cells export as empty strings.
pub fn sensitivity_sheet(grid: &SensitivityGrid) -> Sheet {
    let mut header = vec!["Discount Rate \\ Terminal Growth".to_string()];
    header.extend(grid.terminal_growth_rates.iter().map(|g| fixed(*g, RATE_DP)));

    let rows = grid
        .discount_rates
        .iter()
        .zip(&grid.matrix)
        .map(|(d, row)| {
            let mut cells = Vec::with_capacity(row.len() + 1);
            cells.push(fixed(*d, RATE_DP));
            cells.extend(
                row.iter()
                    .map(|cell| cell.map(|v| fixed(v, MONEY_DP)).unwrap_or_default()),
            );
            cells
        })
        .collect();

    Sheet {
        name: SENSITIVITY_SHEET.to_string(),
        header,
        rows,
    }
}
