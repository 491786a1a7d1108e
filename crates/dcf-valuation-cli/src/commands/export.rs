use clap::Args;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use dcf_valuation_core::export::{projections_sheet, sensitivity_sheet, Sheet};
use dcf_valuation_core::scenarios::{sensitivity_grid, SensitivityInput};
use dcf_valuation_core::valuation::{calculate_dcf, DcfInput};

use crate::commands::scenarios::resolve_axes;
use crate::input;
use crate::input::assumptions::AssumptionArgs;
use crate::input::company::CompanyArgs;

/// Arguments for writing the Projections and Sensitivity Table sheets
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub company: CompanyArgs,

    #[command(flatten)]
    pub assumptions: AssumptionArgs,

    /// Discount rate axis as min:max:step
    #[arg(long)]
    pub discount_axis: Option<String>,

    /// Terminal growth axis as min:max:step
    #[arg(long)]
    pub growth_axis: Option<String>,

    /// Directory the CSV files are written to
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Path to JSON input file with DCF parameters (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_export(args: ExportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let dcf_input: DcfInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        args.company.resolve(args.assumptions.resolve()?)?.input
    };

    export_sheets(
        &dcf_input,
        args.discount_axis.as_deref(),
        args.growth_axis.as_deref(),
        &args.out_dir,
    )
}

fn export_sheets(
    dcf_input: &DcfInput,
    discount_axis: Option<&str>,
    growth_axis: Option<&str>,
    out_dir: &Path,
) -> Result<Value, Box<dyn std::error::Error>> {
    let valuation = calculate_dcf(dcf_input)?;
    let (d_axis, g_axis) = resolve_axes(discount_axis, growth_axis)?;
    let grid_input = SensitivityInput::from_projection(&valuation.result.projection, &d_axis, &g_axis)?;
    let grid = sensitivity_grid(&grid_input)?;

    std::fs::create_dir_all(out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", out_dir.display(), e))?;

    let files = [
        write_sheet(out_dir, &projections_sheet(&valuation.result))?,
        write_sheet(out_dir, &sensitivity_sheet(&grid.result))?,
    ];

    let mut warnings = valuation.warnings;
    warnings.extend(grid.warnings);

    Ok(json!({
        "result": {
            "files": files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
            "enterprise_value": valuation.result.enterprise_value,
            "undefined_cells": grid.result.undefined_cells.len(),
        },
        "warnings": warnings,
    }))
}

/// Write one sheet as `<name>.csv` under `dir`.
pub fn write_sheet(dir: &Path, sheet: &Sheet) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let path = dir.join(format!("{}.csv", sheet.name));
    let mut wtr = csv::Writer::from_path(&path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    wtr.write_record(&sheet.header)?;
    for row in &sheet.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    tracing::debug!(path = %path.display(), rows = sheet.rows.len(), "wrote sheet");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcf_valuation_core::valuation::AssumptionSet;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_both_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let mut dcf_input = DcfInput::new(dec!(100), AssumptionSet::default());
        dcf_input.first_forecast_year = Some(2024);

        let out = export_sheets(&dcf_input, None, None, dir.path()).unwrap();
        assert_eq!(out["result"]["files"].as_array().unwrap().len(), 2);

        let projections = std::fs::read_to_string(dir.path().join("Projections.csv")).unwrap();
        let mut lines = projections.lines();
        assert!(lines.next().unwrap().starts_with("Year,Revenue (M)"));
        assert!(lines.next().unwrap().starts_with("2024,105.00,26.25"));

        let table = std::fs::read_to_string(dir.path().join("Sensitivity Table.csv")).unwrap();
        assert_eq!(table.lines().count(), 8);
    }

    #[test]
    fn test_write_sheet_blank_cells() {
        let dir = tempfile::tempdir().unwrap();
        let sheet = Sheet {
            name: "Grid".into(),
            header: vec!["d".into(), "0.030".into()],
            rows: vec![vec!["0.030".into(), String::new()]],
        };
        let path = write_sheet(dir.path(), &sheet).unwrap();
        let body = std::fs::read_to_string(path).unwrap();
        assert_eq!(body, "d,0.030\n0.030,\n");
    }
}
