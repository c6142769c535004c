//! Unit conversion tool for temperature, length, and weight.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{BoxFuture, ParamKind, ParamSpec, Tool, ToolOutput};
use crate::error::ToolError;

const TEMP_UNITS: &[&str] = &["celsius", "fahrenheit", "kelvin"];
const LENGTH_UNITS: &[&str] = &["meter", "kilometer", "mile", "foot", "inch"];
const WEIGHT_UNITS: &[&str] = &["kilogram", "gram", "pound", "ounce"];

pub struct UnitConverter;

impl Tool for UnitConverter {
    fn name(&self) -> &str {
        "unit_converter"
    }

    fn description(&self) -> &str {
        "Convert between units of measurement. Temperature: celsius, fahrenheit, kelvin. \
         Length: meter, kilometer, mile, foot, inch. \
         Weight: kilogram, gram, pound, ounce."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("value", ParamKind::Number, "Value to convert"),
            ParamSpec::required(
                "from_unit",
                ParamKind::String,
                "Source unit (e.g., 'celsius', 'meter', 'kilogram')",
            ),
            ParamSpec::required(
                "to_unit",
                ParamKind::String,
                "Target unit (e.g., 'fahrenheit', 'kilometer', 'pound')",
            ),
        ]
    }

    fn execute(&self, args: Map<String, Value>) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let value = args["value"].as_f64().unwrap_or(0.0);
            let from = args["from_unit"].as_str().unwrap_or("").to_lowercase();
            let to = args["to_unit"].as_str().unwrap_or("").to_lowercase();
            info!(value, from = %from, to = %to, "Unit conversion requested");

            let result = if in_set(TEMP_UNITS, &from, &to) {
                convert_temperature(value, &from, &to)
            } else if in_set(LENGTH_UNITS, &from, &to) {
                Some(value * length_in_meters(&from) / length_in_meters(&to))
            } else if in_set(WEIGHT_UNITS, &from, &to) {
                Some(value * weight_in_kilograms(&from) / weight_in_kilograms(&to))
            } else {
                None
            };

            match result {
                Some(result) => Ok(ToolOutput::success(json!({
                    "value": value,
                    "from_unit": from,
                    "to_unit": to,
                    "result": result,
                }))),
                None => {
                    warn!(from = %from, to = %to, "Unsupported conversion");
                    Ok(ToolOutput::error(
                        "unsupported_conversion",
                        format!(
                            "Unsupported conversion from {} to {}. Units must belong to the \
                             same category (temperature, length, or weight)",
                            from, to
                        ),
                    ))
                }
            }
        })
    }
}

fn in_set(units: &[&str], from: &str, to: &str) -> bool {
    units.contains(&from) && units.contains(&to)
}

fn convert_temperature(value: f64, from: &str, to: &str) -> Option<f64> {
    let celsius = match from {
        "celsius" => value,
        "fahrenheit" => (value - 32.0) * 5.0 / 9.0,
        "kelvin" => value - 273.15,
        _ => return None,
    };
    match to {
        "celsius" => Some(celsius),
        "fahrenheit" => Some(celsius * 9.0 / 5.0 + 32.0),
        "kelvin" => Some(celsius + 273.15),
        _ => None,
    }
}

fn length_in_meters(unit: &str) -> f64 {
    match unit {
        "meter" => 1.0,
        "kilometer" => 1000.0,
        "mile" => 1609.344,
        "foot" => 0.3048,
        "inch" => 0.0254,
        _ => 1.0,
    }
}

fn weight_in_kilograms(unit: &str) -> f64 {
    match unit {
        "kilogram" => 1.0,
        "gram" => 0.001,
        "pound" => 0.453_592_37,
        "ounce" => 0.028_349_523_125,
        _ => 1.0,
    }
}
