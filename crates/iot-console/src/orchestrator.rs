//! Submission orchestration: validate, build, dispatch, record.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use smol_str::SmolStr;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::ChannelError;
use crate::feedback::{FeedbackEntry, FeedbackLedger};
use crate::metrics::{SubmissionMetrics, SubmissionMetricsSnapshot};
use crate::payload::{build_payload, SubmissionPayload};
use crate::schema::MessageSchema;
use crate::simulation::{DeviceChannel, OutcomeKind, ResponseSimulator, SimulationOutcome};
use crate::validation::{validate_form, ValidationResult};
use crate::values::ValueMap;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmitState {
    Idle,
    Validating,
    Invalid,
    Building,
    Dispatching,
    SettledSuccess,
    SettledDeviceError,
    SettledChannelFailure,
}

impl SubmitState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Invalid
                | Self::SettledSuccess
                | Self::SettledDeviceError
                | Self::SettledChannelFailure
        )
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Invalid => "invalid",
            Self::Building => "building",
            Self::Dispatching => "dispatching",
            Self::SettledSuccess => "settled-success",
            Self::SettledDeviceError => "settled-device-error",
            Self::SettledChannelFailure => "settled-channel-failure",
        }
    }

    fn for_outcome(kind: OutcomeKind) -> Self {
        match kind {
            OutcomeKind::Success | OutcomeKind::Info => Self::SettledSuccess,
            OutcomeKind::Error => Self::SettledDeviceError,
        }
    }
}

/// Terminal result of [`Orchestrator::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Rejected locally; nothing was dispatched or recorded.
    Invalid(ValidationResult),
    /// The round trip finished and `entry` was appended to the ledger.
    Settled {
        state: SubmitState,
        entry: FeedbackEntry,
    },
}

impl Submission {
    #[must_use]
    pub fn state(&self) -> SubmitState {
        match self {
            Self::Invalid(_) => SubmitState::Invalid,
            Self::Settled { state, .. } => *state,
        }
    }

    #[must_use]
    pub fn entry(&self) -> Option<&FeedbackEntry> {
        match self {
            Self::Invalid(_) => None,
            Self::Settled { entry, .. } => Some(entry),
        }
    }

    #[must_use]
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            Self::Invalid(result) => Some(result),
            Self::Settled { .. } => None,
        }
    }
}

/// Lifecycle notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SubmissionEvent {
    #[serde(rename_all = "camelCase")]
    ValidationFailed {
        schema_id: SmolStr,
        missing_field_labels: Vec<SmolStr>,
    },
    #[serde(rename_all = "camelCase")]
    DispatchStarted {
        schema_id: SmolStr,
    },
    Settled {
        state: SubmitState,
        entry: FeedbackEntry,
    },
}

/// Coordinates one submit action end to end and owns the feedback ledger.
///
/// Every call to [`Orchestrator::submit`] is independent: there are no
/// retries and no guard against overlapping calls. Callers that want a
/// single request in flight must not submit again before the previous call
/// resolves. Overlapping calls append in completion order.
pub struct Orchestrator<C = ResponseSimulator> {
    channel: C,
    clock: Arc<dyn Clock>,
    ledger: Mutex<FeedbackLedger>,
    metrics: Mutex<SubmissionMetrics>,
    events: broadcast::Sender<SubmissionEvent>,
    timeout: Option<Duration>,
    sequence: AtomicU64,
}

impl<C> std::fmt::Debug for Orchestrator<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("ledger", &*self.ledger.lock())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<C: DeviceChannel> Orchestrator<C> {
    #[must_use]
    pub fn new(channel: C, ledger_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            channel,
            clock: Arc::new(SystemClock),
            ledger: Mutex::new(FeedbackLedger::new(ledger_capacity)),
            metrics: Mutex::new(SubmissionMetrics::new()),
            events,
            timeout: None,
            sequence: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Treat a response slower than `timeout` as a channel failure.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SubmissionEvent> {
        self.events.subscribe()
    }

    /// Ledger entries, newest first.
    #[must_use]
    pub fn feedback(&self) -> Vec<FeedbackEntry> {
        self.ledger.lock().all()
    }

    pub fn clear_feedback(&self) {
        self.ledger.lock().clear();
    }

    #[must_use]
    pub fn ledger_capacity(&self) -> usize {
        self.ledger.lock().capacity()
    }

    #[must_use]
    pub fn metrics(&self) -> SubmissionMetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    pub async fn submit(&self, schema: &MessageSchema, values: &ValueMap) -> Submission {
        self.metrics.lock().record_submission(&schema.id);

        debug!(schema = %schema.id, state = SubmitState::Validating.as_str(), "submission");
        let validation = validate_form(schema, values);
        if !validation.is_valid {
            debug!(
                schema = %schema.id,
                state = SubmitState::Invalid.as_str(),
                missing = %validation.missing_summary(),
                "submission rejected locally"
            );
            self.notify(SubmissionEvent::ValidationFailed {
                schema_id: schema.id.clone(),
                missing_field_labels: validation.missing_field_labels.clone(),
            });
            self.metrics.lock().record_terminal(SubmitState::Invalid);
            return Submission::Invalid(validation);
        }

        debug!(schema = %schema.id, state = SubmitState::Building.as_str(), "submission");
        let payload = build_payload(schema, values, self.clock.now_ms());

        debug!(schema = %schema.id, state = SubmitState::Dispatching.as_str(), "submission");
        self.notify(SubmissionEvent::DispatchStarted {
            schema_id: schema.id.clone(),
        });
        let started = Instant::now();
        let result = self.dispatch(&payload).await;
        self.metrics.lock().record_dispatch(started.elapsed());

        let (state, entry) = match result {
            Ok(outcome) => self.settle_outcome(schema, outcome),
            Err(err) => {
                warn!(schema = %schema.id, error = %err, "device channel failed");
                let entry =
                    FeedbackEntry::channel_failure(self.next_id(), self.clock.now_ms(), schema);
                (SubmitState::SettledChannelFailure, entry)
            }
        };
        self.ledger.lock().append(entry.clone());
        self.metrics.lock().record_terminal(state);
        info!(
            schema = %schema.id,
            state = state.as_str(),
            message = %entry.message,
            "submission settled"
        );
        self.notify(SubmissionEvent::Settled {
            state,
            entry: entry.clone(),
        });
        Submission::Settled { state, entry }
    }

    async fn dispatch(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SimulationOutcome, ChannelError> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.channel.dispatch(payload))
                .await
                .unwrap_or_else(|_| {
                    Err(ChannelError::TimedOut {
                        after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    })
                }),
            None => self.channel.dispatch(payload).await,
        }
    }

    fn settle_outcome(
        &self,
        schema: &MessageSchema,
        outcome: SimulationOutcome,
    ) -> (SubmitState, FeedbackEntry) {
        let state = SubmitState::for_outcome(outcome.kind);
        let entry = FeedbackEntry::from_outcome(self.next_id(), self.clock.now_ms(), outcome, schema);
        (state, entry)
    }

    fn next_id(&self) -> SmolStr {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        SmolStr::new(format!("{}-{sequence}", self.clock.now_ms()))
    }

    fn notify(&self, event: SubmissionEvent) {
        // No subscribers is fine; the ledger remains the record.
        let _ = self.events.send(event);
    }
}
