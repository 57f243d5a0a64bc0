//! Console errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors surfaced by the configuration console core.
///
/// Validation failures and device-reported failures are not errors: the
/// former is a [`crate::validation::ValidationResult`], the latter an
/// [`crate::simulation::OutcomeKind::Error`] outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    /// Schema catalog integrity violation detected at load time.
    #[error("invalid schema '{0}'")]
    InvalidSchema(SmolStr),

    /// Schema id not present in the registry.
    #[error("unknown message type '{0}'")]
    UnknownSchema(SmolStr),

    /// Field name not present in the selected schema.
    #[error("unknown field '{field}' for message type '{schema}'")]
    UnknownField { schema: SmolStr, field: SmolStr },

    /// An operation needed a selected schema.
    #[error("no message type selected")]
    NoSchemaSelected,

    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// Persisted session state could not be read or written.
    #[error("session store error '{0}'")]
    SessionStore(SmolStr),

    /// The device channel itself failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Failure of the dispatch mechanism, as opposed to a negative device outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The device could not be reached.
    #[error("device unreachable")]
    Unreachable,

    /// No response arrived within the dispatch timeout.
    #[error("no response after {after_ms} ms")]
    TimedOut { after_ms: u64 },

    /// Transport-level failure reported by the channel implementation.
    #[error("transport error '{0}'")]
    Transport(SmolStr),
}
