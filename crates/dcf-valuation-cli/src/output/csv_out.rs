use serde_json::Value;
use std::io::{self, Write};

use super::{grid_rows, scalar_text};

/// Write output as CSV to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    write_csv(&mut wtr, value);
    let _ = wtr.flush();
}

fn write_csv<W: Write>(wtr: &mut csv::Writer<W>, value: &Value) {
    match value {
        Value::Object(map) => match map.get("result") {
            Some(result) => {
                if let Some(rows) = grid_rows(result) {
                    for row in rows {
                        let _ = wtr.write_record(&row);
                    }
                } else if let Some(Value::Array(years)) =
                    result.get("projection").and_then(|p| p.get("years"))
                {
                    write_array_csv(wtr, years);
                } else if let Value::Object(fields) = result {
                    write_fields(wtr, fields);
                }
            }
            None => write_fields(wtr, map),
        },
        Value::Array(arr) => write_array_csv(wtr, arr),
        _ => {
            let _ = wtr.write_record([&scalar_text(value)]);
        }
    }
}

/// Two-column CSV: field, value
fn write_fields<W: Write>(wtr: &mut csv::Writer<W>, map: &serde_json::Map<String, Value>) {
    let _ = wtr.write_record(["field", "value"]);
    for (key, val) in map {
        let _ = wtr.write_record([key.as_str(), &scalar_text(val)]);
    }
}

fn write_array_csv<W: Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    // Extract headers from first object
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(cell_text).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&scalar_text(item)]);
        }
    }
}

fn cell_text(value: &Value) -> String {
    match value.get("label") {
        Some(Value::String(label)) => label.clone(),
        _ => scalar_text(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(value: &Value) -> String {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_csv(&mut wtr, value);
        String::from_utf8(wtr.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_projection_rows() {
        let value = json!({
            "result": {
                "projection": { "years": [
                    { "period": { "label": "2024" }, "revenue": "105" },
                    { "period": { "label": "2025" }, "revenue": "110.25" }
                ]},
                "enterprise_value": "348.17"
            }
        });
        assert_eq!(render(&value), "period,revenue\n2024,105\n2025,110.25\n");
    }

    #[test]
    fn test_field_value_fallback() {
        let value = json!({ "result": { "mean": 1.5 } });
        assert_eq!(render(&value), "field,value\nmean,1.5\n");
    }
}
