//! `iot-console` - schema-driven configuration console for IoT devices.
//!
//! A catalog of message types describes the fields an operator fills in.
//! Submitting validates the entered values, builds a payload, hands it to a
//! device channel (a latency/outcome simulator by default) and records the
//! verdict in a bounded, newest-first feedback ledger.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// Wall-clock abstraction for timestamps.
pub mod clock;
/// Console configuration (`console.toml`).
pub mod config;
/// Simulated device link status.
pub mod connection;
/// Console errors.
pub mod error;
/// Feedback ledger.
pub mod feedback;
/// Typed text to field value conversion.
pub mod input;
/// Submission metrics collection.
pub mod metrics;
/// Submit lifecycle orchestration.
pub mod orchestrator;
/// Payload construction.
pub mod payload;
/// Message type catalog.
pub mod schema;
/// Interactive session state.
pub mod session;
/// Device response simulation.
pub mod simulation;
/// Persisted session state.
pub mod store;
/// Field and form validation.
pub mod validation;
/// Entered field values.
pub mod values;

pub use config::ConsoleConfig;
pub use error::{ChannelError, ConsoleError};
pub use feedback::{FeedbackEntry, FeedbackLedger};
pub use orchestrator::{Orchestrator, Submission, SubmissionEvent, SubmitState};
pub use payload::{build_payload, SubmissionPayload};
pub use schema::{FieldKind, FieldSpec, MessageSchema, SchemaRegistry};
pub use session::ConsoleSession;
pub use simulation::{
    DeviceChannel, OutcomeKind, ResponseSimulator, SimulationConfig, SimulationOutcome,
};
pub use validation::{validate_field, validate_form, ValidationResult};
pub use values::ValueMap;
