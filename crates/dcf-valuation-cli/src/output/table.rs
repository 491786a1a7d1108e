use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::grid_rows;

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            // Check if "result" key holds the primary data
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_field_table(map);
            }
        }
        Value::Array(arr) => print_array_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    if let Some(rows) = grid_rows(result) {
        let mut builder = Builder::default();
        for row in rows {
            builder.push_record(row);
        }
        println!("{}", Table::from(builder));
    } else if let Value::Object(res_map) = result {
        // Year-by-year projection first, then the scalar fields
        if let Some(Value::Array(years)) = res_map.get("projection").and_then(|p| p.get("years")) {
            print_array_table(years);
            println!();
        }
        let scalars: Map<String, Value> = res_map
            .iter()
            .filter(|(k, v)| k.as_str() != "projection" && !is_long_array(v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        print_field_table(&scalars);
    } else {
        print_field_table(envelope);
    }

    // Print warnings if any
    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn is_long_array(value: &Value) -> bool {
    matches!(value, Value::Array(a) if a.len() > 20)
}

fn print_field_table(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(map) => match map.get("label") {
            // Projection periods print as their label
            Some(Value::String(label)) => label.clone(),
            _ => serde_json::to_string(value).unwrap_or_default(),
        },
        other => super::scalar_text(other),
    }
}
