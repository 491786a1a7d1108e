use dcf_valuation_core::scenarios::{grid_cell, sensitivity_grid, RateAxis, SensitivityInput};
use dcf_valuation_core::valuation::{discount, project, AssumptionSet};
use dcf_valuation_core::DcfError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn baseline_input(discount_rates: Vec<Decimal>, growth_rates: Vec<Decimal>) -> SensitivityInput {
    let projection = project(dec!(100), &AssumptionSet::default(), 5).unwrap();
    SensitivityInput {
        free_cash_flows: projection.free_cash_flows(),
        discount_rates,
        terminal_growth_rates: growth_rates,
    }
}

#[test]
fn test_default_grid_shape() {
    let projection = project(dec!(100), &AssumptionSet::default(), 5).unwrap();
    let input = SensitivityInput::from_projection(
        &projection,
        &RateAxis::default_discount_rates(),
        &RateAxis::default_terminal_growth_rates(),
    )
    .unwrap();
    let grid = sensitivity_grid(&input).unwrap().result;

    assert_eq!(grid.matrix.len(), 7);
    assert!(grid.matrix.iter().all(|row| row.len() == 7));
    assert!(grid.undefined_cells.is_empty());
}

#[test]
fn test_baseline_cell_matches_valuation() {
    let a = AssumptionSet::default();
    let projection = project(dec!(100), &a, 5).unwrap();
    let ev = discount(&projection, a.discount_rate, a.terminal_growth_rate)
        .unwrap()
        .enterprise_value;

    let input = baseline_input(vec![dec!(0.08)], vec![dec!(0.025)]);
    let grid = sensitivity_grid(&input).unwrap().result;
    assert_eq!(grid.value_at(dec!(0.08), dec!(0.025)), Some(ev / dec!(1000)));
}

#[test]
fn test_undefined_cell_isolated() {
    let rates = vec![dec!(0.02), dec!(0.03), dec!(0.08)];
    let growth = vec![dec!(0.01), dec!(0.03)];
    let input = baseline_input(rates.clone(), growth.clone());
    let out = sensitivity_grid(&input).unwrap();
    let grid = &out.result;

    assert_eq!(grid.undefined_cells, vec![(1, 1)]);
    assert_eq!(grid.matrix[1][1], None);
    assert_eq!(out.warnings.len(), 1);

    // Every other cell equals its stand-alone evaluation
    for (i, d) in rates.iter().enumerate() {
        for (j, g) in growth.iter().enumerate() {
            if (i, j) == (1, 1) {
                continue;
            }
            let expected = grid_cell(&input.free_cash_flows, *d, *g).unwrap() / dec!(1000);
            assert_eq!(grid.matrix[i][j], Some(expected));
        }
    }
}

#[test]
fn test_growth_above_discount_still_computed() {
    let input = baseline_input(vec![dec!(0.02)], vec![dec!(0.03)]);
    let grid = sensitivity_grid(&input).unwrap().result;
    let value = grid.matrix[0][0].unwrap();
    assert!(value < Decimal::ZERO);
}

#[test]
fn test_grid_cell_equal_rates_error() {
    let input = baseline_input(vec![], vec![]);
    assert!(matches!(
        grid_cell(&input.free_cash_flows, dec!(0.05), dec!(0.05)),
        Err(DcfError::UndefinedGridCell { .. })
    ));
}

#[test]
fn test_grid_is_repeatable() {
    let input = baseline_input(
        RateAxis::default_discount_rates().values().unwrap(),
        RateAxis::default_terminal_growth_rates().values().unwrap(),
    );
    let a = sensitivity_grid(&input).unwrap().result;
    let b = sensitivity_grid(&input).unwrap().result;
    assert_eq!(a.matrix, b.matrix);
}
