//! One configuration session: selected message type, entered values and
//! the orchestrator that records feedback for them.

#![allow(missing_docs)]

use std::sync::Arc;

use serde_json::Value;
use smol_str::SmolStr;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ConsoleError;
use crate::feedback::FeedbackEntry;
use crate::input::parse_field_input;
use crate::metrics::SubmissionMetricsSnapshot;
use crate::orchestrator::{Orchestrator, Submission, SubmissionEvent};
use crate::schema::{FieldSpec, MessageSchema, SchemaRegistry};
use crate::simulation::{DeviceChannel, ResponseSimulator};
use crate::store::SessionSnapshot;
use crate::values::ValueMap;

pub struct ConsoleSession<C = ResponseSimulator> {
    registry: Arc<SchemaRegistry>,
    selected: Option<SmolStr>,
    values: ValueMap,
    orchestrator: Orchestrator<C>,
}

impl<C> std::fmt::Debug for ConsoleSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("selected", &self.selected)
            .field("values", &self.values)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

impl<C: DeviceChannel> ConsoleSession<C> {
    #[must_use]
    pub fn new(registry: Arc<SchemaRegistry>, orchestrator: Orchestrator<C>) -> Self {
        Self {
            registry,
            selected: None,
            values: ValueMap::new(),
            orchestrator,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator<C> {
        &self.orchestrator
    }

    #[must_use]
    pub fn selected_schema(&self) -> Option<&MessageSchema> {
        self.selected
            .as_deref()
            .and_then(|id| self.registry.get(id))
    }

    #[must_use]
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Select a message type and re-seed the values from its defaults.
    pub fn select_schema(&mut self, id: &str) -> Result<&MessageSchema, ConsoleError> {
        let schema = self
            .registry
            .get(id)
            .ok_or_else(|| ConsoleError::UnknownSchema(id.into()))?;
        debug!(schema = %schema.id, "message type selected");
        self.values = schema.defaults();
        self.selected = Some(schema.id.clone());
        Ok(schema)
    }

    pub fn set_field(&mut self, name: &str, value: Value) -> Result<(), ConsoleError> {
        let schema = self.selected_schema().ok_or(ConsoleError::NoSchemaSelected)?;
        if schema.field(name).is_none() {
            return Err(ConsoleError::UnknownField {
                schema: schema.id.clone(),
                field: name.into(),
            });
        }
        self.values.set(name, value);
        Ok(())
    }

    /// Like [`ConsoleSession::set_field`], converting typed text according to
    /// the field kind first.
    pub fn set_field_text(&mut self, name: &str, text: &str) -> Result<(), ConsoleError> {
        let schema = self.selected_schema().ok_or(ConsoleError::NoSchemaSelected)?;
        let field = schema
            .field(name)
            .ok_or_else(|| ConsoleError::UnknownField {
                schema: schema.id.clone(),
                field: name.into(),
            })?;
        let value = parse_field_input(field, text);
        self.values.set(name, value);
        Ok(())
    }

    /// Restore the selected schema's defaults.
    pub fn reset(&mut self) -> Result<(), ConsoleError> {
        let schema = self.selected_schema().ok_or(ConsoleError::NoSchemaSelected)?;
        self.values = schema.defaults();
        Ok(())
    }

    pub async fn submit(&self) -> Result<Submission, ConsoleError> {
        let schema = self.selected_schema().ok_or(ConsoleError::NoSchemaSelected)?;
        Ok(self.orchestrator.submit(schema, &self.values).await)
    }

    /// Fields of the selected schema paired with the value to display.
    #[must_use]
    pub fn effective_values(&self) -> Vec<(&FieldSpec, Option<&Value>)> {
        let Some(schema) = self.selected_schema() else {
            return Vec::new();
        };
        schema
            .fields
            .iter()
            .map(|field| (field, field.effective_value(&self.values)))
            .collect()
    }

    #[must_use]
    pub fn feedback(&self) -> Vec<FeedbackEntry> {
        self.orchestrator.feedback()
    }

    pub fn clear_feedback(&self) {
        self.orchestrator.clear_feedback();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.orchestrator.subscribe()
    }

    #[must_use]
    pub fn metrics(&self) -> SubmissionMetricsSnapshot {
        self.orchestrator.metrics()
    }

    /// Adopt previously persisted state as-is.
    ///
    /// Values are not validated; entries the schema does not know are kept
    /// and simply ignored by validation and payload building.
    pub fn restore(&mut self, snapshot: SessionSnapshot) {
        let Some(id) = snapshot.selected_message_type else {
            self.selected = None;
            self.values = snapshot.values;
            return;
        };
        let Some(schema) = self.registry.get(&id) else {
            warn!(schema = %id, "ignoring persisted state for unknown message type");
            return;
        };
        let stale = snapshot
            .values
            .iter()
            .filter(|(name, _)| schema.field(name).is_none())
            .count();
        if stale > 0 {
            warn!(schema = %id, stale, "persisted state carries fields the message type does not define");
        }
        self.selected = Some(schema.id.clone());
        self.values = snapshot.values;
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            selected_message_type: self.selected.clone(),
            values: self.values.clone(),
        }
    }
}
