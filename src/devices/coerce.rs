//! Lenient conversion of loosely typed board payloads.
//!
//! Boards send numbers as JSON numbers, as strings, or (via query strings)
//! always as strings. These helpers give every field one canonical value no
//! matter which form arrived.

use serde_json::Value;

/// Numeric interpretation of a raw value, or `None` when it has none.
///
/// - numbers: as-is
/// - booleans: 1 / 0
/// - null: 0
/// - strings: trimmed; empty is 0, otherwise a finite decimal float
/// - arrays, objects: `None`
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Some(0.0);
            }
            // `f64::from_str` also takes "inf" / "nan"; those are not readings.
            s.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Sensor reading: anything without a numeric interpretation becomes 0.
pub fn reading(value: &Value) -> f64 {
    to_number(value).unwrap_or(0.0)
}

/// On only for exactly `1` or `"1"`.
pub fn strict_flag(value: &Value) -> u8 {
    let on = match value {
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => s == "1",
        _ => false,
    };
    on as u8
}

/// On for any truthy value. Strings `"0"` and `"false"` count as off so the
/// query-string form (where everything is a string) agrees with JSON numbers.
pub fn truthy_flag(value: &Value) -> u8 {
    let on = match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        Value::Array(_) | Value::Object(_) => true,
    };
    on as u8
}

/// Free-form text field: strings verbatim, null as `"0"`, everything else in
/// its JSON text form (integral numbers without a fractional part).
pub fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "0".to_owned(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn numbers_pass_through() {
        assert_eq!(to_number(&json!(42)), Some(42.0));
        assert_eq!(to_number(&json!(-3.5)), Some(-3.5));
    }

    #[test]
    fn numeric_strings_are_parsed() {
        assert_eq!(to_number(&json!("15")), Some(15.0));
        assert_eq!(to_number(&json!(" 7.25 ")), Some(7.25));
        assert_eq!(to_number(&json!("")), Some(0.0));
    }

    #[test]
    fn non_numeric_values_have_no_number() {
        assert_eq!(to_number(&json!("abc")), None);
        assert_eq!(to_number(&json!("inf")), None);
        assert_eq!(to_number(&json!("NaN")), None);
        assert_eq!(to_number(&json!([1])), None);
        assert_eq!(to_number(&json!({ "v": 1 })), None);
    }

    #[test]
    fn reading_collapses_failures_to_zero() {
        assert_eq!(reading(&json!("abc")), 0.0);
        assert_eq!(reading(&Value::Null), 0.0);
        assert_eq!(reading(&json!(true)), 1.0);
        assert_eq!(reading(&json!("61.5")), 61.5);
    }

    #[test]
    fn strict_flag_accepts_only_one() {
        assert_eq!(strict_flag(&json!(1)), 1);
        assert_eq!(strict_flag(&json!("1")), 1);
        assert_eq!(strict_flag(&json!(1.0)), 1);
        assert_eq!(strict_flag(&json!(2)), 0);
        assert_eq!(strict_flag(&json!(true)), 0);
        assert_eq!(strict_flag(&json!("on")), 0);
        assert_eq!(strict_flag(&Value::Null), 0);
    }

    #[test]
    fn truthy_flag_follows_truthiness() {
        assert_eq!(truthy_flag(&json!(true)), 1);
        assert_eq!(truthy_flag(&json!(3)), 1);
        assert_eq!(truthy_flag(&json!("yes")), 1);
        assert_eq!(truthy_flag(&json!("1")), 1);
        assert_eq!(truthy_flag(&json!(0)), 0);
        assert_eq!(truthy_flag(&json!("0")), 0);
        assert_eq!(truthy_flag(&json!("")), 0);
        assert_eq!(truthy_flag(&json!(false)), 0);
        assert_eq!(truthy_flag(&Value::Null), 0);
    }

    #[test]
    fn text_renders_like_the_board_sent_it() {
        assert_eq!(text(&json!("1")), "1");
        assert_eq!(text(&json!(1)), "1");
        assert_eq!(text(&json!(1.0)), "1");
        assert_eq!(text(&json!(0.5)), "0.5");
        assert_eq!(text(&json!(true)), "true");
        assert_eq!(text(&Value::Null), "0");
    }
}
