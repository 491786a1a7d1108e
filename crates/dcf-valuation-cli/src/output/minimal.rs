use serde_json::Value;

use super::scalar_text;

/// Key result fields, most specific first.
const PRIORITY_KEYS: [&str; 5] = [
    "price_per_share",
    "equity_value",
    "enterprise_value",
    "mean",
    "files",
];

/// Print just the key answer value from the output.
///
/// Heuristic: look for well-known result fields in order of priority,
/// then fall back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_text(value));
}

fn minimal_text(value: &Value) -> String {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Value::Object(map) = result_obj {
        if let Some(val) = PRIORITY_KEYS
            .iter()
            .filter_map(|k| map.get(*k))
            .find(|v| !v.is_null())
        {
            return match val {
                Value::Array(items) => items.iter().map(scalar_text).collect::<Vec<_>>().join("\n"),
                other => scalar_text(other),
            };
        }

        // Fall back to first field
        if let Some((key, val)) = map.iter().next() {
            return format!("{}: {}", key, scalar_text(val));
        }
    }

    // Projection rows: final year free cash flow
    if let Some(last) = result_obj.as_array().and_then(|rows| rows.last()) {
        if let Some(fcf) = last.get("free_cash_flow") {
            return scalar_text(fcf);
        }
    }

    scalar_text(result_obj)
}
