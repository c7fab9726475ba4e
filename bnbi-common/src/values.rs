//! Cell coercion for raw table values
//!
//! Raw cells arrive as JSON scalars from either backend. These helpers turn
//! them into the typed values the pipeline needs without deciding policy;
//! the pipeline decides what a missing or unmapped cell means.

use serde_json::Value;

/// Result of reading a price cell
#[derive(Debug, Clone, PartialEq)]
pub enum PriceCell {
    /// Finite, non-negative price
    Parsed(f64),
    /// Null cell
    Missing,
    /// Residual text after stripping is not a usable number
    Malformed(String),
}

/// Result of reading a "t"/"f" flag cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagCell {
    Mapped(bool),
    Missing,
    Unmapped(String),
}

/// Numeric value of a cell; numeric strings are accepted, non-finite values are not
pub fn as_f64(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Text value of a cell; null reads as `None`
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parse a currency-formatted price such as `"$1,234.00"`
///
/// `$` and `,` are stripped before parsing. Negative and non-finite results
/// are reported as malformed.
pub fn parse_price(value: &Value) -> PriceCell {
    let parsed = match value {
        Value::Null => return PriceCell::Missing,
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let stripped: String = s.chars().filter(|c| !matches!(c, '$' | ',')).collect();
            stripped.trim().parse::<f64>().ok()
        }
        _ => None,
    };

    match parsed {
        Some(p) if p.is_finite() && p >= 0.0 => PriceCell::Parsed(p),
        _ => PriceCell::Malformed(display(value)),
    }
}

/// Map a `"t"`/`"f"` flag; JSON booleans pass through
pub fn parse_flag(value: &Value) -> FlagCell {
    match value {
        Value::Null => FlagCell::Missing,
        Value::Bool(b) => FlagCell::Mapped(*b),
        Value::String(s) if s == "t" => FlagCell::Mapped(true),
        Value::String(s) if s == "f" => FlagCell::Mapped(false),
        other => FlagCell::Unmapped(display(other)),
    }
}

/// Presence value of an amenity cell (0/1 columns, booleans, or "t"/"f")
pub fn amenity_value(value: &Value) -> f64 {
    match value {
        Value::String(s) => match s.trim() {
            "t" | "true" | "True" => 1.0,
            "f" | "false" | "False" | "" => 0.0,
            other => other.parse::<f64>().ok().filter(|n| n.is_finite()).unwrap_or(0.0),
        },
        other => as_f64(other).unwrap_or(0.0),
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
