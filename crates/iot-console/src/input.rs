//! Conversion of typed text into field values.

use serde_json::{Number, Value};

use crate::schema::{FieldKind, FieldSpec};

/// Interpret `text` the way a form control of `spec.kind` would.
///
/// Text that does not fit the kind is kept as a string so that validation,
/// not parsing, decides whether it is acceptable. Enumerated fields match
/// their options case-insensitively and store the option's own spelling.
#[must_use]
pub fn parse_field_input(spec: &FieldSpec, text: &str) -> Value {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Value::String(String::new());
    }
    match spec.kind {
        FieldKind::Text => Value::String(text.to_string()),
        FieldKind::Number => parse_number(trimmed).unwrap_or_else(|| Value::String(trimmed.into())),
        FieldKind::Boolean => {
            parse_bool(trimmed).map_or_else(|| Value::String(trimmed.into()), Value::Bool)
        }
        FieldKind::Dropdown | FieldKind::Radio => spec
            .options
            .iter()
            .find(|option| option.eq_ignore_ascii_case(trimmed))
            .map_or_else(
                || Value::String(trimmed.into()),
                |option| Value::String(option.to_string()),
            ),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(Value::Number(value.into()));
    }
    let value = text.parse::<f64>().ok()?;
    Number::from_f64(value).map(Value::Number)
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_become_json_numbers() {
        let field = FieldSpec::number("samplingRate", "Sampling Rate");
        assert_eq!(parse_field_input(&field, "1000"), json!(1000));
        assert_eq!(parse_field_input(&field, " 2.5 "), json!(2.5));
        assert_eq!(parse_field_input(&field, "fast"), json!("fast"));
        assert_eq!(parse_field_input(&field, "inf"), json!("inf"));
        assert_eq!(parse_field_input(&field, "  "), json!(""));
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let field = FieldSpec::boolean("encryption", "Encryption");
        assert_eq!(parse_field_input(&field, "YES"), json!(true));
        assert_eq!(parse_field_input(&field, "off"), json!(false));
        assert_eq!(parse_field_input(&field, "maybe"), json!("maybe"));
    }

    #[test]
    fn options_are_canonicalized() {
        let field = FieldSpec::radio("mode", "Mode", &["Low Power", "Balanced"]);
        assert_eq!(parse_field_input(&field, "balanced"), json!("Balanced"));
        assert_eq!(parse_field_input(&field, "turbo"), json!("turbo"));
    }

    #[test]
    fn text_keeps_inner_whitespace() {
        let field = FieldSpec::text("sensorId", "Sensor ID");
        assert_eq!(parse_field_input(&field, "TEMP 07"), json!("TEMP 07"));
    }
}
