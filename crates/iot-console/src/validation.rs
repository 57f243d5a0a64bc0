//! Field and form validation.

#![allow(missing_docs)]

use serde::Serialize;
use serde_json::Value;
use smol_str::SmolStr;

use crate::schema::{FieldKind, FieldSpec, MessageSchema};
use crate::values::ValueMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    Required,
    InvalidType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: SmolStr,
    pub message: String,
    pub kind: ValidationErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<FieldError>,
    /// Labels of REQUIRED failures, in field order.
    pub missing_field_labels: Vec<SmolStr>,
}

impl ValidationResult {
    fn from_errors(errors: Vec<FieldError>, missing_field_labels: Vec<SmolStr>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            missing_field_labels,
        }
    }

    /// `"Sensor ID, Port"` style summary for user-facing prompts.
    #[must_use]
    pub fn missing_summary(&self) -> String {
        self.missing_field_labels
            .iter()
            .map(SmolStr::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Validate the value entered for a single field.
///
/// `value` is what the user entered; the field default is never consulted,
/// so a required field cannot be satisfied by its default alone.
#[must_use]
pub fn validate_field(spec: &FieldSpec, value: Option<&Value>) -> ValidationResult {
    let mut errors = Vec::new();
    let mut missing = Vec::new();

    if spec.required && is_blank(value) {
        errors.push(FieldError {
            field: spec.name.clone(),
            message: format!("{} is required", spec.label),
            kind: ValidationErrorKind::Required,
        });
        missing.push(spec.label.clone());
    }

    if spec.kind == FieldKind::Number {
        if let Some(present) = value.filter(|value| !value.is_null()) {
            if numeric_value(present).is_none() {
                errors.push(FieldError {
                    field: spec.name.clone(),
                    message: format!("{} must be a valid number", spec.label),
                    kind: ValidationErrorKind::InvalidType,
                });
            }
        }
    }

    // Enumerated values are constrained by the input surface and are not
    // re-checked against `options` here.
    ValidationResult::from_errors(errors, missing)
}

/// Validate every field of `schema`, in schema order.
#[must_use]
pub fn validate_form(schema: &MessageSchema, values: &ValueMap) -> ValidationResult {
    let mut errors = Vec::new();
    let mut missing = Vec::new();
    for field in &schema.fields {
        let result = validate_field(field, values.get(&field.name));
        errors.extend(result.errors);
        missing.extend(result.missing_field_labels);
    }
    ValidationResult::from_errors(errors, missing)
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

/// Loose numeric coercion of an entered value.
///
/// Numbers and booleans coerce directly. Strings coerce when blank (to 0),
/// when they parse as a decimal number, or when they carry a `0x`/`0o`/`0b`
/// integer prefix. Non-finite results do not count as numbers.
#[must_use]
pub fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::Bool(flag) => {
            if *flag {
                1.0
            } else {
                0.0
            }
        }
        Value::String(text) => parse_numeric_text(text)?,
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    number.is_finite().then_some(number)
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    let radix = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| trimmed.strip_prefix(prefix).map(|digits| (digits, radix)));
    if let Some((digits, radix)) = radix {
        if digits.is_empty() || digits.starts_with(['+', '-']) {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        return u64::from_str_radix(digits, radix).ok().map(|value| value as f64);
    }
    // `f64::from_str` also accepts spellings such as "inf" and "nan"; those
    // are filtered out by the finiteness check in the caller.
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_coercion_rules() {
        assert_eq!(numeric_value(&json!(12)), Some(12.0));
        assert_eq!(numeric_value(&json!(true)), Some(1.0));
        assert_eq!(numeric_value(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(numeric_value(&json!("")), Some(0.0));
        assert_eq!(numeric_value(&json!("0x1A")), Some(26.0));
        assert_eq!(numeric_value(&json!("0b101")), Some(5.0));
        assert_eq!(numeric_value(&json!("0x+1A")), None);
        assert_eq!(numeric_value(&json!("0o-7")), None);
        assert_eq!(numeric_value(&json!("0x")), None);
        assert_eq!(numeric_value(&json!("1e3")), Some(1000.0));
        assert_eq!(numeric_value(&json!("12px")), None);
        assert_eq!(numeric_value(&json!("inf")), None);
        assert_eq!(numeric_value(&json!("NaN")), None);
        assert_eq!(numeric_value(&json!([1])), None);
        assert_eq!(numeric_value(&json!({"a": 1})), None);
    }

    #[test]
    fn optional_number_accepts_absent_and_null() {
        let field = FieldSpec::number("retries", "Retries");
        assert!(validate_field(&field, None).is_valid);
        assert!(validate_field(&field, Some(&Value::Null)).is_valid);
        assert!(!validate_field(&field, Some(&json!("three"))).is_valid);
    }

    #[test]
    fn required_number_that_is_garbage_reports_only_type_error() {
        let field = FieldSpec::number("port", "Port").required();
        let result = validate_field(&field, Some(&json!("abc")));
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::InvalidType);
        assert_eq!(result.errors[0].message, "Port must be a valid number");
        assert!(result.missing_field_labels.is_empty());
    }

    #[test]
    fn enumerated_values_are_not_checked_against_options() {
        let field = FieldSpec::dropdown("unit", "Unit", &["Celsius", "Fahrenheit"]).required();
        assert!(validate_field(&field, Some(&json!("Kelvin"))).is_valid);
    }
}
