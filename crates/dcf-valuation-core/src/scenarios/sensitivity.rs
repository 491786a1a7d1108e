use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::error::DcfError;
use crate::time_value::{compound_factor, present_value};
use crate::types::*;
use crate::valuation::Projection;
use crate::DcfResult;

/// Grid values are reported in thousands of the input unit (billions for millions).
const GRID_SCALE: Decimal = dec!(1000);

/// A rate sweep from `min` to `max` (inclusive) in `step` increments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateAxis {
    pub min: Rate,
    pub max: Rate,
    pub step: Rate,
}

impl RateAxis {
    pub fn new(min: Rate, max: Rate, step: Rate) -> Self {
        RateAxis { min, max, step }
    }

    /// Discount rates 7.0% to 10.0% in 50bp steps.
    pub fn default_discount_rates() -> Self {
        RateAxis::new(dec!(0.07), dec!(0.10), dec!(0.005))
    }

    /// Terminal growth rates 1.0% to 4.0% in 50bp steps.
    pub fn default_terminal_growth_rates() -> Self {
        RateAxis::new(dec!(0.01), dec!(0.04), dec!(0.005))
    }

    /// Generate the sweep values; `max` is appended when the step overshoots it.
    pub fn values(&self) -> DcfResult<Vec<Rate>> {
        if self.step <= Decimal::ZERO {
            return Err(DcfError::InvalidInput {
                field: "step".into(),
                reason: "Step must be positive".into(),
            });
        }
        if self.min > self.max {
            return Err(DcfError::InvalidInput {
                field: "min".into(),
                reason: "Min must be <= max".into(),
            });
        }

        let mut values = Vec::new();
        let mut current = self.min;
        while current <= self.max {
            values.push(current);
            current += self.step;
        }
        if let Some(&last) = values.last() {
            if last < self.max {
                values.push(self.max);
            }
        }

        Ok(values)
    }
}

/// Input for the discount-rate x terminal-growth sensitivity grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    /// Baseline free cash flows in forecast order; the last one seeds the terminal value
    pub free_cash_flows: Vec<Money>,
    /// Row axis
    pub discount_rates: Vec<Rate>,
    /// Column axis
    pub terminal_growth_rates: Vec<Rate>,
}

impl SensitivityInput {
    /// Grid over a baseline projection's cash flows.
    pub fn from_projection(
        projection: &Projection,
        discount_axis: &RateAxis,
        growth_axis: &RateAxis,
    ) -> DcfResult<Self> {
        Ok(SensitivityInput {
            free_cash_flows: projection.free_cash_flows(),
            discount_rates: discount_axis.values()?,
            terminal_growth_rates: growth_axis.values()?,
        })
    }
}

/// Enterprise value (in thousands of the input unit) per (discount rate, terminal growth) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub discount_rates: Vec<Rate>,
    pub terminal_growth_rates: Vec<Rate>,
    /// matrix[i][j] = EV at discount_rates[i], terminal_growth_rates[j]; `None` where undefined
    pub matrix: Vec<Vec<Option<Money>>>,
    /// (row, col) of every undefined cell
    pub undefined_cells: Vec<(usize, usize)>,
    /// Cell closest to the midpoint of both axes
    pub base_case_position: (usize, usize),
}

impl SensitivityGrid {
    /// Look up a cell by its rates.
    pub fn value_at(&self, discount_rate: Rate, terminal_growth_rate: Rate) -> Option<Money> {
        let row = self.discount_rates.iter().position(|r| *r == discount_rate)?;
        let col = self
            .terminal_growth_rates
            .iter()
            .position(|g| *g == terminal_growth_rate)?;
        self.matrix[row][col]
    }

    pub fn base_case_value(&self) -> Option<Money> {
        let (row, col) = self.base_case_position;
        self.matrix.get(row).and_then(|r| r.get(col)).copied().flatten()
    }
}

/// Enterprise value of `free_cash_flows` at one (d, g) pair, before scaling.
///
/// The whole flow sequence is re-discounted at `d`; the terminal value comes
/// from the final flow. `d == g` is rejected as [`DcfError::UndefinedGridCell`];
/// a terminal value outside the decimal range as
/// [`DcfError::DivergentTerminalValue`].
pub fn grid_cell(
    free_cash_flows: &[Money],
    discount_rate: Rate,
    terminal_growth_rate: Rate,
) -> DcfResult<Money> {
    let final_fcf = *free_cash_flows.last().ok_or_else(|| {
        DcfError::InsufficientData("Sensitivity grid requires at least one cash flow".into())
    })?;
    if discount_rate == terminal_growth_rate {
        return Err(DcfError::UndefinedGridCell {
            discount_rate,
            terminal_growth_rate,
        });
    }

    let horizon = free_cash_flows.len() as u32;
    let pv_fcf = present_value(discount_rate, free_cash_flows)?;
    let compound = compound_factor(discount_rate, horizon)?;

    // A spread near zero pushes the perpetuity past the decimal range.
    final_fcf
        .checked_mul(Decimal::ONE + terminal_growth_rate)
        .and_then(|tv| tv.checked_div(discount_rate - terminal_growth_rate))
        .and_then(|tv| tv.checked_div(compound))
        .and_then(|tv_disc| pv_fcf.checked_add(tv_disc))
        .ok_or(DcfError::DivergentTerminalValue {
            discount_rate,
            terminal_growth_rate,
        })
}

/// Evaluate a 2-way grid with `eval_fn`, isolating per-cell failures.
///
/// A failing cell becomes `None` and a warning; the rest of the grid is unaffected.
pub fn evaluate_grid<F>(
    rows: &[Rate],
    cols: &[Rate],
    eval_fn: F,
    warnings: &mut Vec<String>,
) -> (Vec<Vec<Option<Decimal>>>, Vec<(usize, usize)>)
where
    F: Fn(Rate, Rate) -> DcfResult<Decimal>,
{
    let mut matrix = Vec::with_capacity(rows.len());
    let mut undefined = Vec::new();

    for (i, r) in rows.iter().enumerate() {
        let mut row = Vec::with_capacity(cols.len());
        for (j, c) in cols.iter().enumerate() {
            match eval_fn(*r, *c) {
                Ok(val) => row.push(Some(val)),
                Err(e) => {
                    warn!(row = i, col = j, error = %e, "sensitivity cell undefined");
                    warnings.push(format!("Evaluation failed at ({r}, {c}): {e}"));
                    undefined.push((i, j));
                    row.push(None);
                }
            }
        }
        matrix.push(row);
    }

    (matrix, undefined)
}

/// Find the closest index to a target value.
fn closest_index(values: &[Decimal], target: Decimal) -> usize {
    values
        .iter()
        .enumerate()
        .min_by_key(|(_, v)| (**v - target).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn midpoint(values: &[Decimal]) -> Decimal {
    match (values.first(), values.last()) {
        (Some(a), Some(b)) => (*a + *b) / dec!(2),
        _ => Decimal::ZERO,
    }
}

/// Build the discount-rate x terminal-growth enterprise value grid.
pub fn sensitivity_grid(input: &SensitivityInput) -> DcfResult<ComputationOutput<SensitivityGrid>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.free_cash_flows.is_empty() {
        return Err(DcfError::InsufficientData(
            "Sensitivity grid requires at least one cash flow".into(),
        ));
    }
    if input.discount_rates.is_empty() || input.terminal_growth_rates.is_empty() {
        return Err(DcfError::InvalidInput {
            field: "axes".into(),
            reason: "Both rate axes need at least one value".into(),
        });
    }

    let flows = &input.free_cash_flows;
    let (matrix, undefined_cells) = evaluate_grid(
        &input.discount_rates,
        &input.terminal_growth_rates,
        |d, g| Ok(grid_cell(flows, d, g)? / GRID_SCALE),
        &mut warnings,
    );

    let base_row = closest_index(&input.discount_rates, midpoint(&input.discount_rates));
    let base_col = closest_index(
        &input.terminal_growth_rates,
        midpoint(&input.terminal_growth_rates),
    );

    let output = SensitivityGrid {
        discount_rates: input.discount_rates.clone(),
        terminal_growth_rates: input.terminal_growth_rates.clone(),
        matrix,
        undefined_cells,
        base_case_position: (base_row, base_col),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Discount Rate x Terminal Growth Sensitivity (EV, thousands of input unit)",
        &serde_json::json!({
            "horizon_periods": flows.len(),
            "final_year_fcf": flows.last(),
            "rows": input.discount_rates.len(),
            "cols": input.terminal_growth_rates.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
