//! Console configuration loading (`console.toml`).

#![allow(missing_docs)]

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use smol_str::SmolStr;

use crate::connection::{ConnectionConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_SUCCESS_RATE};
use crate::error::ConsoleError;
use crate::feedback::DEFAULT_FEEDBACK_CAPACITY;
use crate::simulation::{
    OutcomeKind, Scenario, ScenarioTable, SimulationConfig, DEFAULT_MAX_DELAY, DEFAULT_MIN_DELAY,
};

pub const DEFAULT_CONFIG_FILE: &str = "console.toml";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub log_level: SmolStr,
    pub simulation: SimulationConfig,
    /// Dispatch timeout; `None` waits for the channel indefinitely.
    pub timeout: Option<Duration>,
    pub feedback_capacity: usize,
    pub connection: ConnectionConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            log_level: SmolStr::new_inline(DEFAULT_LOG_LEVEL),
            simulation: SimulationConfig::default(),
            timeout: None,
            feedback_capacity: DEFAULT_FEEDBACK_CAPACITY,
            connection: ConnectionConfig::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConsoleError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            ConsoleError::InvalidConfig(
                format!("{}: failed to read console config: {err}", path.display()).into(),
            )
        })?;
        parse_console_toml_from_text(&text, &path.display().to_string())
    }

    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>, ConsoleError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConsoleError> {
        parse_console_toml_from_text(text, DEFAULT_CONFIG_FILE)
    }
}

pub fn validate_console_toml_text(text: &str) -> Result<(), ConsoleError> {
    parse_console_toml_from_text(text, DEFAULT_CONFIG_FILE).map(|_| ())
}

fn parse_console_toml_from_text(text: &str, file_name: &str) -> Result<ConsoleConfig, ConsoleError> {
    let raw: ConsoleToml = toml::from_str(text)
        .map_err(|err| ConsoleError::InvalidConfig(format!("{file_name}: {err}").into()))?;
    raw.into_config()
        .map_err(|err| prefix_invalid_config(file_name, err))
}

fn prefix_invalid_config(file_name: &str, err: ConsoleError) -> ConsoleError {
    match err {
        ConsoleError::InvalidConfig(message) => {
            ConsoleError::InvalidConfig(format!("{file_name}: {message}").into())
        }
        other => other,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConsoleToml {
    log: Option<LogSection>,
    simulation: Option<SimulationSection>,
    feedback: Option<FeedbackSection>,
    connection: Option<ConnectionSection>,
    scenarios: Option<Vec<ScenarioSection>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogSection {
    level: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimulationSection {
    min_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
    seed: Option<u64>,
    timeout_ms: Option<u64>,
    channel_failure_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeedbackSection {
    capacity: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConnectionSection {
    check_interval_ms: Option<u64>,
    success_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioSection {
    kind: String,
    message: String,
    details: Option<String>,
    weight: f64,
}

impl ConsoleToml {
    fn into_config(self) -> Result<ConsoleConfig, ConsoleError> {
        let log_level = match self.log {
            Some(log) if log.level.trim().is_empty() => {
                return Err(ConsoleError::InvalidConfig(
                    "log.level must not be empty".into(),
                ));
            }
            Some(log) => SmolStr::new(log.level.trim()),
            None => SmolStr::new_inline(DEFAULT_LOG_LEVEL),
        };

        let simulation = self.simulation.unwrap_or_default();
        let min_delay = simulation
            .min_delay_ms
            .map_or(DEFAULT_MIN_DELAY, Duration::from_millis);
        let max_delay = simulation
            .max_delay_ms
            .map_or(DEFAULT_MAX_DELAY, Duration::from_millis);
        if max_delay < min_delay {
            return Err(ConsoleError::InvalidConfig(
                format!(
                    "simulation.max_delay_ms ({}) must be >= simulation.min_delay_ms ({})",
                    max_delay.as_millis(),
                    min_delay.as_millis()
                )
                .into(),
            ));
        }
        let timeout = match simulation.timeout_ms {
            Some(0) => {
                return Err(ConsoleError::InvalidConfig(
                    "simulation.timeout_ms must be >= 1".into(),
                ));
            }
            other => other.map(Duration::from_millis),
        };
        let channel_failure_rate = simulation.channel_failure_rate.unwrap_or(0.0);
        check_probability("simulation.channel_failure_rate", channel_failure_rate)?;

        let scenarios = match self.scenarios {
            Some(sections) => {
                let scenarios = sections
                    .into_iter()
                    .map(ScenarioSection::into_scenario)
                    .collect::<Result<Vec<_>, _>>()?;
                ScenarioTable::new(scenarios)?
            }
            None => ScenarioTable::builtin(),
        };

        let feedback_capacity = match self.feedback {
            Some(feedback) if feedback.capacity == 0 => {
                return Err(ConsoleError::InvalidConfig(
                    "feedback.capacity must be >= 1".into(),
                ));
            }
            Some(feedback) => feedback.capacity,
            None => DEFAULT_FEEDBACK_CAPACITY,
        };

        let connection = self.connection.unwrap_or_default();
        let check_interval = connection
            .check_interval_ms
            .map_or(DEFAULT_CHECK_INTERVAL, Duration::from_millis);
        if check_interval.is_zero() {
            return Err(ConsoleError::InvalidConfig(
                "connection.check_interval_ms must be >= 1".into(),
            ));
        }
        let success_rate = connection.success_rate.unwrap_or(DEFAULT_SUCCESS_RATE);
        check_probability("connection.success_rate", success_rate)?;

        Ok(ConsoleConfig {
            log_level,
            simulation: SimulationConfig {
                min_delay,
                max_delay,
                seed: simulation.seed,
                channel_failure_rate,
                scenarios,
            },
            timeout,
            feedback_capacity,
            connection: ConnectionConfig {
                check_interval,
                success_rate,
            },
        })
    }
}

impl ScenarioSection {
    fn into_scenario(self) -> Result<Scenario, ConsoleError> {
        let kind = OutcomeKind::parse(&self.kind)?;
        if self.message.trim().is_empty() {
            return Err(ConsoleError::InvalidConfig(
                "scenarios.message must not be empty".into(),
            ));
        }
        let scenario = Scenario::new(kind, self.message, self.weight);
        Ok(match self.details {
            Some(details) => scenario.with_details(details),
            None => scenario,
        })
    }
}

fn check_probability(key: &str, value: f64) -> Result<(), ConsoleError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConsoleError::InvalidConfig(
            format!("{key} must be within [0, 1], got {value}").into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = ConsoleConfig::from_toml_str("").expect("config");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.feedback_capacity, 10);
        assert_eq!(config.simulation.min_delay, Duration::from_millis(1000));
        assert_eq!(config.simulation.max_delay, Duration::from_millis(3000));
        assert_eq!(config.simulation.scenarios, ScenarioTable::builtin());
        assert_eq!(config.timeout, None);
        assert_eq!(config.connection, ConnectionConfig::default());
    }

    #[test]
    fn parses_every_section() {
        let config = ConsoleConfig::from_toml_str(
            r#"
[log]
level = "debug"

[simulation]
min_delay_ms = 0
max_delay_ms = 10
seed = 42
timeout_ms = 500
channel_failure_rate = 0.25

[feedback]
capacity = 3

[connection]
check_interval_ms = 100
success_rate = 0.5

[[scenarios]]
kind = "success"
message = "ok"
weight = 0.75

[[scenarios]]
kind = "error"
message = "nope"
details = "bad firmware"
weight = 0.25
"#,
        )
        .expect("config");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.timeout, Some(Duration::from_millis(500)));
        assert_eq!(config.feedback_capacity, 3);
        assert_eq!(config.connection.check_interval, Duration::from_millis(100));
        let table = &config.simulation.scenarios;
        assert_eq!(table.len(), 2);
        assert_eq!(table.scenarios()[1].details.as_deref(), Some("bad firmware"));
    }

    #[test]
    fn rejects_invalid_values_with_file_prefix() {
        let err = ConsoleConfig::from_toml_str("[feedback]\ncapacity = 0\n").unwrap_err();
        assert_eq!(
            err,
            ConsoleError::InvalidConfig("console.toml: feedback.capacity must be >= 1".into())
        );

        let err = ConsoleConfig::from_toml_str(
            "[simulation]\nmin_delay_ms = 50\nmax_delay_ms = 10\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("max_delay_ms"));

        let err = ConsoleConfig::from_toml_str(
            "[[scenarios]]\nkind = \"success\"\nmessage = \"ok\"\nweight = 0.5\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));

        assert!(ConsoleConfig::from_toml_str("[connection]\nsuccess_rate = 1.5\n").is_err());
        assert!(validate_console_toml_text("[simulation]\nunknown = 1\n").is_err());
    }
}
