//! Text rendering shared by the one-shot commands and the console.

use iot_console::validation::ValidationResult;
use iot_console::{FeedbackEntry, FieldSpec, MessageSchema, SchemaRegistry};
use serde_json::Value;

use crate::style;

pub fn schema_list(registry: &SchemaRegistry) -> Vec<String> {
    let width = registry
        .all()
        .map(|schema| schema.id.len())
        .max()
        .unwrap_or_default();
    registry
        .all()
        .map(|schema| {
            format!(
                "{}  {} ({} fields)",
                style::accent(format!("{:<width$}", schema.id)),
                schema.name,
                schema.fields.len()
            )
        })
        .collect()
}

/// Header plus one line per field: required marker, name, kind, label and
/// the value that would be used (entered value, else default).
pub fn schema_fields(schema: &MessageSchema, fields: &[(&FieldSpec, Option<&Value>)]) -> Vec<String> {
    let mut lines = vec![format!("{} ({})", schema.name, schema.id)];
    if !schema.description.is_empty() {
        lines.push(schema.description.to_string());
    }
    let width = schema
        .fields
        .iter()
        .map(|field| field.name.len())
        .max()
        .unwrap_or_default();
    for (field, value) in fields {
        let marker = if field.required { '*' } else { ' ' };
        let mut line = format!(
            "  {marker} {:<width$}  {:<8}  {} = {}",
            field.name,
            field.kind.as_str(),
            field.label,
            display_value(*value)
        );
        if !field.options.is_empty() {
            let options = field
                .options
                .iter()
                .map(|option| option.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            line.push_str(&format!("  [{options}]"));
        }
        lines.push(line);
    }
    lines
}

pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(value) => value.to_string(),
    }
}

pub fn feedback_entry(entry: &FeedbackEntry) -> Vec<String> {
    let mut lines = vec![style::outcome(
        entry.kind,
        format!(
            "[{}] {} ({})",
            entry.kind.as_str(),
            entry.message,
            entry.schema_name.as_deref().unwrap_or("-")
        ),
    )];
    if let Some(details) = &entry.details {
        lines.push(format!("    {details}"));
    }
    lines
}

pub fn rejection(validation: &ValidationResult) -> Vec<String> {
    let headline = if validation.missing_field_labels.is_empty() {
        "Please correct the invalid fields".to_string()
    } else {
        format!(
            "Please fill in all required fields: {}",
            validation.missing_summary()
        )
    };
    let mut lines = vec![style::warning(headline)];
    lines.extend(
        validation
            .errors
            .iter()
            .map(|error| format!("  {}: {}", error.field, error.message)),
    );
    lines
}
