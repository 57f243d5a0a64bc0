//! Bounded, newest-first feedback ledger.

#![allow(missing_docs)]

use std::collections::VecDeque;

use serde::Serialize;
use smol_str::SmolStr;

use crate::schema::MessageSchema;
use crate::simulation::{OutcomeKind, SimulationOutcome};

pub const DEFAULT_FEEDBACK_CAPACITY: usize = 10;
pub const CHANNEL_FAILURE_MESSAGE: &str = "Communication failed";
pub const CHANNEL_FAILURE_DETAILS: &str = "Unable to reach IoT device";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackEntry {
    pub id: SmolStr,
    pub timestamp_ms: u64,
    pub kind: OutcomeKind,
    pub message: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<SmolStr>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<SmolStr>,
}

impl FeedbackEntry {
    /// Entry recording a device verdict for a submission of `schema`.
    #[must_use]
    pub fn from_outcome(
        id: SmolStr,
        timestamp_ms: u64,
        outcome: SimulationOutcome,
        schema: &MessageSchema,
    ) -> Self {
        Self {
            id,
            timestamp_ms,
            kind: outcome.kind,
            message: outcome.message,
            details: outcome.details,
            schema_id: Some(schema.id.clone()),
            schema_name: Some(schema.name.clone()),
        }
    }

    /// Synthetic entry for a submission whose channel failed.
    #[must_use]
    pub fn channel_failure(id: SmolStr, timestamp_ms: u64, schema: &MessageSchema) -> Self {
        Self {
            id,
            timestamp_ms,
            kind: OutcomeKind::Error,
            message: CHANNEL_FAILURE_MESSAGE.into(),
            details: Some(CHANNEL_FAILURE_DETAILS.into()),
            schema_id: Some(schema.id.clone()),
            schema_name: Some(schema.name.clone()),
        }
    }
}

/// Append-only log holding at most `capacity` entries.
///
/// Eviction follows insertion order, never timestamps.
#[derive(Debug, Clone)]
pub struct FeedbackLedger {
    entries: VecDeque<FeedbackEntry>,
    capacity: usize,
}

impl FeedbackLedger {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, entry: FeedbackEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    #[must_use]
    pub fn all(&self) -> Vec<FeedbackEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedbackEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn newest(&self) -> Option<&FeedbackEntry> {
        self.entries.front()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for FeedbackLedger {
    fn default() -> Self {
        Self::new(DEFAULT_FEEDBACK_CAPACITY)
    }
}
