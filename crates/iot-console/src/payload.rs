//! Submission payload assembly.

#![allow(missing_docs)]

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use smol_str::SmolStr;

use crate::schema::MessageSchema;
use crate::values::ValueMap;

/// Canonical payload handed to the device channel.
///
/// `data` holds exactly one entry per schema field, in schema order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionPayload {
    pub schema_id: SmolStr,
    pub submitted_at_ms: u64,
    pub data: IndexMap<SmolStr, Value>,
}

/// Merge entered values with schema defaults.
///
/// No validation happens here; callers validate first. A field with neither
/// an entered value nor a default is carried as `null`.
#[must_use]
pub fn build_payload(
    schema: &MessageSchema,
    values: &ValueMap,
    submitted_at_ms: u64,
) -> SubmissionPayload {
    let data = schema
        .fields
        .iter()
        .map(|field| {
            let value = field.effective_value(values).cloned().unwrap_or(Value::Null);
            (field.name.clone(), value)
        })
        .collect();
    SubmissionPayload {
        schema_id: schema.id.clone(),
        submitted_at_ms,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    fn schema() -> MessageSchema {
        MessageSchema::new(
            "communication",
            "Communication Settings",
            "",
            vec![
                FieldSpec::text("endpoint", "Endpoint").required(),
                FieldSpec::number("port", "Port").with_default(1883),
                FieldSpec::boolean("encryption", "Enable Encryption"),
            ],
        )
    }

    #[test]
    fn covers_every_field_exactly_once() {
        let values = [("endpoint", json!("broker.local")), ("stale", json!(1))]
            .into_iter()
            .collect::<ValueMap>();
        let payload = build_payload(&schema(), &values, 7);
        let keys = payload.data.keys().map(SmolStr::as_str).collect::<Vec<_>>();
        assert_eq!(keys, vec!["endpoint", "port", "encryption"]);
        assert_eq!(payload.data["endpoint"], json!("broker.local"));
        assert_eq!(payload.data["port"], json!(1883));
        assert_eq!(payload.data["encryption"], Value::Null);
        assert_eq!(payload.submitted_at_ms, 7);
        assert_eq!(payload.schema_id, "communication");
    }

    #[test]
    fn entered_value_wins_over_default() {
        let values = [("port", json!(8883))].into_iter().collect::<ValueMap>();
        let payload = build_payload(&schema(), &values, 0);
        assert_eq!(payload.data["port"], json!(8883));
    }
}
