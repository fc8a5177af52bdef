/// Output Normalization and Comparison
///
/// **Normalization Rules:**
/// - Actual: already rendered by the harness (canonical JSON for objects and
///   arrays, plain string form otherwise)
/// - Expected string: parsed as JSON and re-serialized when possible,
///   otherwise trimmed
/// - Expected structured value: canonical JSON; scalars use their plain
///   string form, a missing value renders as `undefined`
/// - Both sides then get one more JSON parse/re-serialize pass, so `"true"`
///   and `true`, or `"[1, 2]"` and `[1,2]`, meet in the same form
///
/// **Comparison:**
/// Exact string equality after normalization. No floating-point tolerance.
///
/// Canonical JSON follows `JSON.stringify`: compact separators, object keys
/// in insertion order, ECMAScript number formatting (`3.0` is `3`).

use drillbit_common::types::Expected;
use serde_json::{Number, Value};

/// Normalized pair plus verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub expected: String,
    pub actual: String,
    pub passed: bool,
}

pub fn compare(actual: &str, expected: &Expected) -> Comparison {
    let expected = canonicalize(&render_expected(expected));
    let actual = canonicalize(actual);
    let passed = actual == expected;

    Comparison {
        expected,
        actual,
        passed,
    }
}

/// First-pass rendering of the expected value
pub fn render_expected(expected: &Expected) -> String {
    match expected {
        Expected::Absent => "undefined".to_string(),
        Expected::Value(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(parsed) => canonical_json(&parsed),
            Err(_) => text.trim().to_string(),
        },
        Expected::Value(value) => plain_string(value),
    }
}

/// Second pass: re-serialize if the text is JSON, keep it otherwise
pub fn canonicalize(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(parsed) => canonical_json(&parsed),
        Err(_) => text.to_string(),
    }
}

/// `String(value)` for scalars, canonical JSON for arrays and objects
fn plain_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => js_number(number),
        Value::String(text) => text.clone(),
        Value::Array(_) | Value::Object(_) => canonical_json(value),
    }
}

pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_json(value, &mut out);
    out
}

fn write_json(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Value::Number(number) => out.push_str(&js_number(number)),
        Value::String(_) => out.push_str(&value.to_string()),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_json(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (index, (key, item)) in map.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_json(item, out);
            }
            out.push('}');
        }
    }
}

/// Largest integer every `f64` holds exactly (2^53)
const MAX_EXACT_INTEGER: u64 = 1 << 53;

fn js_number(number: &Number) -> String {
    // Beyond 2^53 a JS number has already lost the low digits
    if let Some(int) = number.as_i64() {
        if int.unsigned_abs() <= MAX_EXACT_INTEGER {
            return int.to_string();
        }
        return js_float(int as f64);
    }
    if let Some(uint) = number.as_u64() {
        if uint <= MAX_EXACT_INTEGER {
            return uint.to_string();
        }
        return js_float(uint as f64);
    }
    match number.as_f64() {
        Some(float) => js_float(float),
        None => number.to_string(),
    }
}

/// ECMAScript `Number::toString` for finite values
fn js_float(float: f64) -> String {
    if float == 0.0 {
        return "0".to_string();
    }
    let magnitude = float.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return format!("{}", float);
    }

    // Rust prints `1e21`; ECMAScript wants `1e+21`
    let formatted = format!("{:e}", float);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{}e+{}", mantissa, exponent)
        }
        _ => formatted,
    }
}
