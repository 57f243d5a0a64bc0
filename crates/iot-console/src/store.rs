//! Persisted session state.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::ConsoleError;
use crate::values::ValueMap;

/// Values persisted between runs, stored as a flat object under
/// `iot-config-data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(
        rename = "selected-message-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub selected_message_type: Option<SmolStr>,
    #[serde(rename = "iot-config-data", default)]
    pub values: ValueMap,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing files load as an empty snapshot.
    pub fn load(&self) -> Result<SessionSnapshot, ConsoleError> {
        if !self.path.is_file() {
            return Ok(SessionSnapshot::default());
        }
        let text = std::fs::read_to_string(&self.path).map_err(|err| self.error("read", &err))?;
        serde_json::from_str(&text).map_err(|err| self.error("parse", &err))
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<(), ConsoleError> {
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| self.error("create", &err))?;
        }
        let text =
            serde_json::to_string_pretty(snapshot).map_err(|err| self.error("encode", &err))?;
        std::fs::write(&self.path, text).map_err(|err| self.error("write", &err))
    }

    fn error(&self, action: &str, err: &dyn std::fmt::Display) -> ConsoleError {
        ConsoleError::SessionStore(
            format!("{}: failed to {action} session state: {err}", self.path.display()).into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_uses_flat_value_object() {
        let snapshot = SessionSnapshot {
            selected_message_type: Some("power".into()),
            values: [("mode", json!("Balanced"))].into_iter().collect(),
        };
        let encoded = serde_json::to_value(&snapshot).expect("encode");
        assert_eq!(
            encoded,
            json!({
                "selected-message-type": "power",
                "iot-config-data": { "mode": "Balanced" }
            })
        );
    }

    #[test]
    fn empty_document_decodes_to_default() {
        let snapshot: SessionSnapshot = serde_json::from_str("{}").expect("decode");
        assert_eq!(snapshot, SessionSnapshot::default());
    }
}
