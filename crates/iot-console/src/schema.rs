//! Message type catalog: schemas, field specs and the registry.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::ConsoleError;
use crate::values::ValueMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Number,
    /// Single choice rendered as a dropdown.
    Dropdown,
    /// Exclusive choice rendered as a radio group.
    Radio,
    Boolean,
}

impl FieldKind {
    pub fn parse(text: &str) -> Result<Self, ConsoleError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "dropdown" => Ok(Self::Dropdown),
            "radio" => Ok(Self::Radio),
            "boolean" | "bool" => Ok(Self::Boolean),
            _ => Err(ConsoleError::InvalidSchema(
                format!("unsupported field kind '{text}'").into(),
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Dropdown => "dropdown",
            Self::Radio => "radio",
            Self::Boolean => "boolean",
        }
    }

    /// Enumerated kinds draw their values from `options`.
    #[must_use]
    pub fn is_enumerated(self) -> bool {
        matches!(self, Self::Dropdown | Self::Radio)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: SmolStr,
    pub label: SmolStr,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SmolStr>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<SmolStr>, label: impl Into<SmolStr>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            options: Vec::new(),
            required: false,
            default_value: None,
        }
    }

    pub fn text(name: impl Into<SmolStr>, label: impl Into<SmolStr>) -> Self {
        Self::new(name, label, FieldKind::Text)
    }

    pub fn number(name: impl Into<SmolStr>, label: impl Into<SmolStr>) -> Self {
        Self::new(name, label, FieldKind::Number)
    }

    pub fn boolean(name: impl Into<SmolStr>, label: impl Into<SmolStr>) -> Self {
        Self::new(name, label, FieldKind::Boolean)
    }

    pub fn dropdown(name: impl Into<SmolStr>, label: impl Into<SmolStr>, options: &[&str]) -> Self {
        Self::new(name, label, FieldKind::Dropdown).with_options(options)
    }

    pub fn radio(name: impl Into<SmolStr>, label: impl Into<SmolStr>, options: &[&str]) -> Self {
        Self::new(name, label, FieldKind::Radio).with_options(options)
    }

    #[must_use]
    pub fn with_options(mut self, options: &[&str]) -> Self {
        self.options = options.iter().copied().map(SmolStr::new).collect();
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// The value an operation should use for this field: whatever the user
    /// entered, else the declared default.
    ///
    /// Required-field validation deliberately does not go through this
    /// accessor; it checks the entered value only.
    #[must_use]
    pub fn effective_value<'a>(&'a self, values: &'a ValueMap) -> Option<&'a Value> {
        match values.get(&self.name) {
            Some(value) if !value.is_null() => Some(value),
            _ => self.default_value.as_ref(),
        }
    }

    fn check(&self, schema_id: &str) -> Result<(), ConsoleError> {
        if self.name.trim().is_empty() {
            return Err(invalid(schema_id, "field name must not be empty"));
        }
        if self.kind.is_enumerated() {
            if self.options.is_empty() {
                return Err(invalid(
                    schema_id,
                    &format!("field '{}' ({}) requires options", self.name, self.kind.as_str()),
                ));
            }
        } else if !self.options.is_empty() {
            return Err(invalid(
                schema_id,
                &format!(
                    "field '{}' ({}) does not take options",
                    self.name,
                    self.kind.as_str()
                ),
            ));
        }
        let Some(default) = self.default_value.as_ref() else {
            return Ok(());
        };
        let legal = match self.kind {
            FieldKind::Text => default.is_string(),
            FieldKind::Number => default.is_number(),
            FieldKind::Boolean => default.is_boolean(),
            FieldKind::Dropdown | FieldKind::Radio => default
                .as_str()
                .is_some_and(|text| self.options.iter().any(|option| option == text)),
        };
        if !legal {
            return Err(invalid(
                schema_id,
                &format!(
                    "default {default} is not a legal {} value for field '{}'",
                    self.kind.as_str(),
                    self.name
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageSchema {
    pub id: SmolStr,
    pub name: SmolStr,
    pub description: SmolStr,
    pub fields: Vec<FieldSpec>,
}

impl MessageSchema {
    pub fn new(
        id: impl Into<SmolStr>,
        name: impl Into<SmolStr>,
        description: impl Into<SmolStr>,
        fields: Vec<FieldSpec>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            fields,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &SmolStr> {
        self.fields.iter().map(|field| &field.name)
    }

    /// A fresh value map seeded with every declared default.
    #[must_use]
    pub fn defaults(&self) -> ValueMap {
        self.fields
            .iter()
            .filter_map(|field| {
                field
                    .default_value
                    .clone()
                    .map(|value| (field.name.clone(), value))
            })
            .collect()
    }

    fn check(&self) -> Result<(), ConsoleError> {
        if self.id.trim().is_empty() {
            return Err(ConsoleError::InvalidSchema(
                "message type id must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(invalid(
                    &self.id,
                    &format!("duplicate field name '{}'", field.name),
                ));
            }
            field.check(&self.id)?;
        }
        Ok(())
    }
}

fn invalid(schema_id: &str, message: &str) -> ConsoleError {
    ConsoleError::InvalidSchema(format!("{schema_id}: {message}").into())
}

/// Process-wide, read-only catalog of message types.
///
/// Every schema is integrity-checked when the registry is built; a registry
/// value therefore never serves a malformed schema.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: IndexMap<SmolStr, MessageSchema>,
}

impl SchemaRegistry {
    pub fn new(schemas: Vec<MessageSchema>) -> Result<Self, ConsoleError> {
        let mut map = IndexMap::with_capacity(schemas.len());
        for schema in schemas {
            schema.check()?;
            if map.contains_key(&schema.id) {
                return Err(ConsoleError::InvalidSchema(
                    format!("duplicate message type id '{}'", schema.id).into(),
                ));
            }
            map.insert(schema.id.clone(), schema);
        }
        Ok(Self { schemas: map })
    }

    /// The catalog shipped with the console.
    pub fn builtin() -> Result<Self, ConsoleError> {
        Self::new(builtin_schemas())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ConsoleError::InvalidSchema(
                format!("{}: failed to read schema catalog: {err}", path.display()).into(),
            )
        })?;
        Self::from_toml_str(&text).map_err(|err| match err {
            ConsoleError::InvalidSchema(message) => {
                ConsoleError::InvalidSchema(format!("{}: {message}", path.display()).into())
            }
            other => other,
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConsoleError> {
        let raw: CatalogToml = toml::from_str(text)
            .map_err(|err| ConsoleError::InvalidSchema(format!("{err}").into()))?;
        let schemas = raw
            .schemas
            .into_iter()
            .map(SchemaSection::into_schema)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(schemas)
    }

    /// All schemas in catalog order.
    pub fn all(&self) -> impl ExactSizeIterator<Item = &MessageSchema> {
        self.schemas.values()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MessageSchema> {
        self.schemas.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn builtin_schemas() -> Vec<MessageSchema> {
    vec![
        MessageSchema::new(
            "sensor-config",
            "Sensor Configuration",
            "Configure sensor parameters and thresholds",
            vec![
                FieldSpec::text("sensorId", "Sensor ID")
                    .required()
                    .with_default("TEMP_01"),
                FieldSpec::number("threshold", "Threshold")
                    .required()
                    .with_default(25),
                FieldSpec::dropdown("unit", "Unit", &["Celsius", "Fahrenheit"])
                    .required()
                    .with_default("Celsius"),
                FieldSpec::boolean("enabled", "Enabled").with_default(true),
                FieldSpec::radio("alertLevel", "Alert Level", &["Low", "Medium", "High"])
                    .with_default("Medium"),
            ],
        ),
        MessageSchema::new(
            "communication",
            "Communication Settings",
            "Configure network and communication parameters",
            vec![
                FieldSpec::dropdown("protocol", "Protocol", &["MQTT", "HTTP", "CoAP"])
                    .required()
                    .with_default("MQTT"),
                FieldSpec::text("endpoint", "Endpoint")
                    .required()
                    .with_default("broker.example.com"),
                FieldSpec::number("port", "Port")
                    .required()
                    .with_default(1883),
                FieldSpec::boolean("encryption", "Enable Encryption").with_default(true),
            ],
        ),
        MessageSchema::new(
            "power",
            "Power Management",
            "Configure power saving and battery settings",
            vec![
                FieldSpec::radio(
                    "mode",
                    "Power Mode",
                    &["Performance", "Balanced", "Power Saver"],
                )
                .with_default("Balanced"),
                FieldSpec::number("sleepInterval", "Sleep Interval (minutes)").with_default(5),
                FieldSpec::boolean("wakeOnMotion", "Wake on Motion").with_default(false),
            ],
        ),
    ]
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogToml {
    #[serde(default)]
    schemas: Vec<SchemaSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaSection {
    id: String,
    name: String,
    description: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldSection {
    name: String,
    label: Option<String>,
    kind: String,
    required: Option<bool>,
    default: Option<toml::Value>,
    options: Option<Vec<String>>,
}

impl SchemaSection {
    fn into_schema(self) -> Result<MessageSchema, ConsoleError> {
        let id = self.id;
        let fields = self
            .fields
            .into_iter()
            .map(|field| field.into_spec(&id))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(MessageSchema::new(
            id.as_str(),
            self.name,
            self.description.unwrap_or_default(),
            fields,
        ))
    }
}

impl FieldSection {
    fn into_spec(self, schema_id: &str) -> Result<FieldSpec, ConsoleError> {
        let kind = FieldKind::parse(&self.kind).map_err(|err| match err {
            ConsoleError::InvalidSchema(message) => invalid(schema_id, &message),
            other => other,
        })?;
        let default_value = self
            .default
            .map(|value| toml_to_json(&value))
            .transpose()
            .map_err(|message| {
                invalid(
                    schema_id,
                    &format!("field '{}' default: {message}", self.name),
                )
            })?;
        let label = self.label.unwrap_or_else(|| self.name.clone());
        Ok(FieldSpec {
            name: self.name.into(),
            label: label.into(),
            kind,
            options: self
                .options
                .unwrap_or_default()
                .into_iter()
                .map(SmolStr::from)
                .collect(),
            required: self.required.unwrap_or(false),
            default_value,
        })
    }
}

fn toml_to_json(value: &toml::Value) -> Result<Value, String> {
    match value {
        toml::Value::String(text) => Ok(Value::String(text.clone())),
        toml::Value::Integer(number) => Ok(Value::from(*number)),
        toml::Value::Float(number) => serde_json::Number::from_f64(*number)
            .map(Value::Number)
            .ok_or_else(|| format!("non-finite number {number}")),
        toml::Value::Boolean(flag) => Ok(Value::Bool(*flag)),
        other => Err(format!("unsupported {} default", other.type_str())),
    }
}
