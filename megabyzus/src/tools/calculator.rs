//! Calculator tools: add, subtract, multiply, divide.
//!
//! Integral results are returned as JSON integers so `42 + 18` yields `60`, not `60.0`.

use serde::Deserialize;
use serde_json::{json, Value};

use super::ToolError;

pub const TOOL_ADD: &str = "add";
pub const TOOL_SUBTRACT: &str = "subtract";
pub const TOOL_MULTIPLY: &str = "multiply";
pub const TOOL_DIVIDE: &str = "divide";

/// Input of `add` and `multiply`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BinaryInput {
    pub a: f64,
    pub b: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SubtractInput {
    pub minuend: f64,
    pub subtrahend: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DivideInput {
    pub dividend: f64,
    pub divisor: f64,
}

fn number_schema(fields: &[(&str, &str)]) -> Value {
    let mut properties = serde_json::Map::new();
    for (name, description) in fields {
        properties.insert(
            name.to_string(),
            json!({ "type": "number", "description": description }),
        );
    }
    let required: Vec<&str> = fields.iter().map(|(n, _)| *n).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

pub(crate) fn binary_schema(verb: &str) -> Value {
    number_schema(&[
        ("a", format!("First number to {}.", verb).as_str()),
        ("b", format!("Second number to {}.", verb).as_str()),
    ])
}

pub(crate) fn subtract_schema() -> Value {
    number_schema(&[
        (
            "minuend",
            "The number from which another is to be subtracted.",
        ),
        ("subtrahend", "The number to be subtracted from the minuend."),
    ])
}

pub(crate) fn divide_schema() -> Value {
    number_schema(&[
        ("dividend", "The number to be divided."),
        ("divisor", "The number by which to divide the dividend."),
    ])
}

/// Converts an f64 result into JSON, using an integer when the value is integral.
pub fn number_value(x: f64) -> Result<Value, ToolError> {
    if !x.is_finite() {
        return Err(ToolError::Execution(format!(
            "result is not a finite number: {}",
            x
        )));
    }
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if x.fract() == 0.0 && x.abs() <= MAX_EXACT {
        Ok(Value::from(x as i64))
    } else {
        Ok(json!(x))
    }
}

pub fn add(input: &BinaryInput) -> Result<Value, ToolError> {
    number_value(input.a + input.b)
}

pub fn subtract(input: &SubtractInput) -> Result<Value, ToolError> {
    number_value(input.minuend - input.subtrahend)
}

pub fn multiply(input: &BinaryInput) -> Result<Value, ToolError> {
    number_value(input.a * input.b)
}

pub fn divide(input: &DivideInput) -> Result<Value, ToolError> {
    if input.divisor == 0.0 {
        return Err(ToolError::Execution("Cannot divide by zero".to_string()));
    }
    number_value(input.dividend / input.divisor)
}
