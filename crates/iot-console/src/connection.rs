//! Simulated device link status.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::simulation::{RandomSource, Sleeper, ThreadRandom, TokioSleeper};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_SUCCESS_RATE: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Unknown,
    Connected,
    Disconnected,
}

impl ConnectionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionConfig {
    pub check_interval: Duration,
    pub success_rate: f64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            success_rate: DEFAULT_SUCCESS_RATE,
        }
    }
}

/// Periodically re-rolls the link status and publishes it on a watch channel.
pub struct ConnectionMonitor {
    config: ConnectionConfig,
    random: Arc<dyn RandomSource>,
    sleeper: Arc<dyn Sleeper>,
    status: watch::Sender<ConnectionStatus>,
}

impl std::fmt::Debug for ConnectionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionMonitor")
            .field("config", &self.config)
            .field("status", &*self.status.borrow())
            .finish_non_exhaustive()
    }
}

impl ConnectionMonitor {
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Unknown);
        Self {
            config,
            random: Arc::new(ThreadRandom),
            sleeper: Arc::new(TokioSleeper),
            status,
        }
    }

    #[must_use]
    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Roll the link status once and publish it.
    pub fn check_once(&self) -> ConnectionStatus {
        let next = if self.random.next_unit() < self.config.success_rate {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };
        let previous = self.status.send_replace(next);
        if previous != next {
            debug!(status = next.as_str(), "device link status changed");
        }
        next
    }

    /// Check immediately, then every `check_interval`. Stops after `limit`
    /// checks when given, otherwise runs until the task is dropped.
    pub async fn run(&self, limit: Option<usize>) {
        let mut checks = 0usize;
        loop {
            self.check_once();
            checks += 1;
            if limit.is_some_and(|limit| checks >= limit) {
                return;
            }
            self.sleeper.sleep(self.config.check_interval).await;
        }
    }
}
