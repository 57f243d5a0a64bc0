//! Startup: configuration, catalog, logging and session wiring.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use iot_console::config::DEFAULT_CONFIG_FILE;
use iot_console::simulation::InstantSleeper;
use iot_console::store::SessionStore;
use iot_console::{ConsoleConfig, ConsoleSession, Orchestrator, ResponseSimulator, SchemaRegistry};
use tracing_subscriber::EnvFilter;

pub struct Setup {
    pub config: ConsoleConfig,
    pub registry: Arc<SchemaRegistry>,
}

impl Setup {
    /// An explicit `--config` must exist; otherwise `./console.toml` is used
    /// when present and built-in defaults apply when it is not.
    pub fn load(config: Option<&Path>, schemas: Option<&Path>) -> anyhow::Result<Self> {
        let config = match config {
            Some(path) => ConsoleConfig::load(path)?,
            None => ConsoleConfig::load_optional(DEFAULT_CONFIG_FILE)?.unwrap_or_default(),
        };
        let registry = match schemas {
            Some(path) => SchemaRegistry::load(path)?,
            None => SchemaRegistry::builtin()?,
        };
        Ok(Self {
            config,
            registry: Arc::new(registry),
        })
    }

    pub fn init_logging(&self, verbose: bool) {
        let level = if verbose {
            "debug"
        } else {
            self.config.log_level.as_str()
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    pub fn session(&self, instant: bool) -> ConsoleSession {
        let mut simulator = ResponseSimulator::new(self.config.simulation.clone());
        if instant {
            simulator = simulator.with_sleeper(Arc::new(InstantSleeper::new()));
        }
        let orchestrator = Orchestrator::new(simulator, self.config.feedback_capacity)
            .with_timeout(self.config.timeout);
        ConsoleSession::new(Arc::clone(&self.registry), orchestrator)
    }
}

/// Restore persisted state into `session` when a state file is configured.
pub fn restore_state(
    session: &mut ConsoleSession,
    state: Option<&PathBuf>,
) -> anyhow::Result<Option<SessionStore>> {
    let Some(path) = state else {
        return Ok(None);
    };
    let store = SessionStore::new(path);
    let snapshot = store
        .load()
        .with_context(|| format!("restoring session from {}", path.display()))?;
    session.restore(snapshot);
    Ok(Some(store))
}

pub fn save_state(session: &ConsoleSession, store: Option<&SessionStore>) -> anyhow::Result<()> {
    if let Some(store) = store {
        store.save(&session.snapshot())?;
    }
    Ok(())
}
