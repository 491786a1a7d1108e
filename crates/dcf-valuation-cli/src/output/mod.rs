pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Pretty-print JSON to stdout.
fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

/// Rows of a sensitivity grid result: header of growth rates, then one row per
/// discount rate. None when `result` is not a grid.
pub fn grid_rows(result: &Value) -> Option<Vec<Vec<String>>> {
    let discount = result.get("discount_rates")?.as_array()?;
    let growth = result.get("terminal_growth_rates")?.as_array()?;
    let matrix = result.get("matrix")?.as_array()?;

    let mut rows = Vec::with_capacity(discount.len() + 1);
    let mut header = vec!["discount_rate \\ terminal_growth".to_string()];
    header.extend(growth.iter().map(scalar_text));
    rows.push(header);

    for (d, row) in discount.iter().zip(matrix) {
        let mut cells = vec![scalar_text(d)];
        if let Some(values) = row.as_array() {
            cells.extend(values.iter().map(scalar_text));
        }
        rows.push(cells);
    }
    Some(rows)
}

/// Plain text for a scalar; empty for null, compact JSON otherwise.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
