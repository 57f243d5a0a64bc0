//! Simulated device channel: latency and weighted outcome selection.

#![allow(missing_docs)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::debug;

use crate::error::{ChannelError, ConsoleError};
use crate::payload::SubmissionPayload;

pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(3000);
const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Success,
    Error,
    Info,
}

impl OutcomeKind {
    pub fn parse(text: &str) -> Result<Self, ConsoleError> {
        match text.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "info" => Ok(Self::Info),
            _ => Err(ConsoleError::InvalidConfig(
                format!("invalid outcome kind '{text}'").into(),
            )),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// The device's verdict on one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationOutcome {
    pub kind: OutcomeKind,
    pub message: SmolStr,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scenario {
    pub kind: OutcomeKind,
    pub message: SmolStr,
    pub details: Option<SmolStr>,
    pub weight: f64,
}

impl Scenario {
    pub fn new(kind: OutcomeKind, message: impl Into<SmolStr>, weight: f64) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
            weight,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<SmolStr>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub fn outcome(&self) -> SimulationOutcome {
        SimulationOutcome {
            kind: self.kind,
            message: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

/// Ordered, non-empty scenario table whose weights sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioTable {
    scenarios: Vec<Scenario>,
}

impl ScenarioTable {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, ConsoleError> {
        if scenarios.is_empty() {
            return Err(ConsoleError::InvalidConfig(
                "scenario table must not be empty".into(),
            ));
        }
        if let Some(bad) = scenarios
            .iter()
            .find(|scenario| !scenario.weight.is_finite() || scenario.weight < 0.0)
        {
            return Err(ConsoleError::InvalidConfig(
                format!(
                    "scenario '{}' has invalid weight {}",
                    bad.message, bad.weight
                )
                .into(),
            ));
        }
        let total = scenarios.iter().map(|scenario| scenario.weight).sum::<f64>();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConsoleError::InvalidConfig(
                format!("scenario weights must sum to 1.0, got {total}").into(),
            ));
        }
        Ok(Self { scenarios })
    }

    #[must_use]
    pub fn builtin() -> Self {
        Self {
            scenarios: builtin_scenarios(),
        }
    }

    /// Index of the scenario selected by a uniform draw `r`.
    ///
    /// Walks the table in order accumulating weight; the first scenario whose
    /// cumulative weight reaches `r` wins. A draw beyond the accumulated total
    /// selects index 0.
    #[must_use]
    pub fn select_index(&self, r: f64) -> usize {
        let mut cumulative = 0.0;
        for (idx, scenario) in self.scenarios.iter().enumerate() {
            cumulative += scenario.weight;
            if r <= cumulative {
                return idx;
            }
        }
        0
    }

    #[must_use]
    pub fn select(&self, r: f64) -> &Scenario {
        &self.scenarios[self.select_index(r)]
    }

    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

impl Default for ScenarioTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_scenarios() -> Vec<Scenario> {
    vec![
        Scenario::new(OutcomeKind::Success, "Configuration applied successfully", 0.4),
        Scenario::new(
            OutcomeKind::Success,
            "Advanced configuration profile activated successfully",
            0.2,
        )
        .with_details(
            "The new configuration has been applied to all connected sensors. Power \
             consumption settings were optimized, communication protocols now use the \
             latest security standards and all device clocks are synchronized.",
        ),
        Scenario::new(OutcomeKind::Error, "Failed to apply configuration", 0.1)
            .with_details("Invalid sensor type for current firmware"),
        Scenario::new(OutcomeKind::Error, "Critical configuration error detected", 0.1)
            .with_details(
                "The selected communication protocol is not supported by firmware v2.1.3 \
                 and the power management settings conflict with the connected sensors. \
                 Update the firmware to v2.2.0 or higher, verify sensor compatibility and \
                 retry.",
            ),
        Scenario::new(OutcomeKind::Info, "Configuration queued for processing", 0.1)
            .with_details("Device is currently busy, will apply when available"),
        Scenario::new(OutcomeKind::Info, "Partial configuration applied with warnings", 0.1)
            .with_details(
                "Sampling rate, communication and power settings were applied. Redundancy \
                 backup and advanced encryption are pending until the next maintenance \
                 cycle frees enough memory.",
            ),
    ]
}

/// Entropy for latency and outcome draws.
pub trait RandomSource: Send + Sync {
    /// Next sample in `[0, 1)`.
    fn next_unit(&self) -> f64;
}

impl<F> RandomSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn next_unit(&self) -> f64 {
        self()
    }
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }
}

/// Reproducible RNG seeded from configuration.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        self.rng.lock().gen::<f64>()
    }
}

pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Suspends the caller for a simulated delay.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> SleepFuture;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Completes immediately and remembers every requested delay.
#[derive(Debug, Default)]
pub struct InstantSleeper {
    requested: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().clone()
    }
}

impl Sleeper for InstantSleeper {
    fn sleep(&self, duration: Duration) -> SleepFuture {
        self.requested.lock().push(duration);
        Box::pin(std::future::ready(()))
    }
}

/// Anything that can carry a payload to a device and bring back its verdict.
///
/// `Err` means the channel itself failed; a device that rejects the
/// configuration answers `Ok` with an [`OutcomeKind::Error`] outcome.
pub trait DeviceChannel: Send + Sync {
    fn dispatch(
        &self,
        payload: &SubmissionPayload,
    ) -> impl Future<Output = Result<SimulationOutcome, ChannelError>> + Send;
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub seed: Option<u64>,
    /// Probability that the simulated channel fails outright.
    pub channel_failure_rate: f64,
    pub scenarios: ScenarioTable,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            seed: None,
            channel_failure_rate: 0.0,
            scenarios: ScenarioTable::builtin(),
        }
    }
}

/// Stand-in for a real device: waits a random latency, then answers with a
/// weighted-random scenario.
pub struct ResponseSimulator {
    config: SimulationConfig,
    random: Arc<dyn RandomSource>,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for ResponseSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSimulator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResponseSimulator {
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let random: Arc<dyn RandomSource> = match config.seed {
            Some(seed) => Arc::new(SeededRandom::new(seed)),
            None => Arc::new(ThreadRandom),
        };
        Self {
            config,
            random,
            sleeper: Arc::new(TokioSleeper),
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
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Latency drawn uniformly from `[min_delay, max_delay]`.
    #[must_use]
    pub fn draw_delay(&self) -> Duration {
        let min = self.config.min_delay.as_millis();
        let max = self.config.max_delay.as_millis().max(min);
        let r = self.random.next_unit().clamp(0.0, 1.0);
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let extra = (((max - min + 1) as f64 * r) as u128).min(max - min);
        Duration::from_millis(u64::try_from(min + extra).unwrap_or(u64::MAX))
    }

    #[must_use]
    pub fn select_outcome(&self) -> SimulationOutcome {
        let r = self.random.next_unit();
        self.config.scenarios.select(r).outcome()
    }

    /// Wait the simulated latency and answer. Never fails.
    pub async fn simulate(&self, payload: &SubmissionPayload) -> SimulationOutcome {
        let delay = self.draw_delay();
        debug!(
            schema = %payload.schema_id,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "simulating device round trip"
        );
        self.sleeper.sleep(delay).await;
        self.select_outcome()
    }
}

impl DeviceChannel for ResponseSimulator {
    async fn dispatch(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SimulationOutcome, ChannelError> {
        if self.config.channel_failure_rate <= 0.0 {
            return Ok(self.simulate(payload).await);
        }
        let delay = self.draw_delay();
        self.sleeper.sleep(delay).await;
        if self.random.next_unit() < self.config.channel_failure_rate {
            return Err(ChannelError::Unreachable);
        }
        Ok(self.select_outcome())
    }
}
