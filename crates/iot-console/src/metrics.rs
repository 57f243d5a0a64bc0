//! Submission metrics collection.

#![allow(missing_docs)]

use std::time::Instant;

use indexmap::IndexMap;
use serde::Serialize;
use smol_str::SmolStr;

use crate::orchestrator::SubmitState;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub avg_ms: f64,
    pub last_ms: f64,
    samples: u64,
}

impl LatencyStats {
    pub fn record(&mut self, duration: std::time::Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        self.last_ms = ms;
        if self.samples == 0 {
            self.min_ms = ms;
            self.max_ms = ms;
            self.avg_ms = ms;
        } else {
            if ms < self.min_ms {
                self.min_ms = ms;
            }
            if ms > self.max_ms {
                self.max_ms = ms;
            }
            #[allow(clippy::cast_precision_loss)]
            let samples = self.samples as f64;
            self.avg_ms = (self.avg_ms * samples + ms) / (samples + 1.0);
        }
        self.samples = self.samples.saturating_add(1);
    }

    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self {
            min_ms: 0.0,
            max_ms: 0.0,
            avg_ms: 0.0,
            last_ms: 0.0,
            samples: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionMetrics {
    start: Instant,
    pub submissions: u64,
    pub invalid: u64,
    pub success: u64,
    pub device_error: u64,
    pub channel_failure: u64,
    pub dispatch: LatencyStats,
    per_schema: IndexMap<SmolStr, u64>,
}

impl SubmissionMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            submissions: 0,
            invalid: 0,
            success: 0,
            device_error: 0,
            channel_failure: 0,
            dispatch: LatencyStats::default(),
            per_schema: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    pub fn record_submission(&mut self, schema_id: &SmolStr) {
        self.submissions = self.submissions.saturating_add(1);
        let count = self.per_schema.entry(schema_id.clone()).or_default();
        *count = count.saturating_add(1);
    }

    /// Count a terminal state; non-terminal states are ignored.
    pub fn record_terminal(&mut self, state: SubmitState) {
        let counter = match state {
            SubmitState::Invalid => &mut self.invalid,
            SubmitState::SettledSuccess => &mut self.success,
            SubmitState::SettledDeviceError => &mut self.device_error,
            SubmitState::SettledChannelFailure => &mut self.channel_failure,
            _ => return,
        };
        *counter = counter.saturating_add(1);
    }

    pub fn record_dispatch(&mut self, duration: std::time::Duration) {
        self.dispatch.record(duration);
    }

    #[must_use]
    pub fn snapshot(&self) -> SubmissionMetricsSnapshot {
        SubmissionMetricsSnapshot {
            uptime_ms: self.uptime_ms(),
            submissions: self.submissions,
            invalid: self.invalid,
            success: self.success,
            device_error: self.device_error,
            channel_failure: self.channel_failure,
            dispatch: self.dispatch,
            per_schema: self
                .per_schema
                .iter()
                .map(|(id, count)| (id.clone(), *count))
                .collect(),
        }
    }
}

impl Default for SubmissionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionMetricsSnapshot {
    pub uptime_ms: u64,
    pub submissions: u64,
    pub invalid: u64,
    pub success: u64,
    pub device_error: u64,
    pub channel_failure: u64,
    pub dispatch: LatencyStats,
    pub per_schema: Vec<(SmolStr, u64)>,
}

impl SubmissionMetricsSnapshot {
    /// Submissions that reached any terminal state.
    #[must_use]
    pub fn settled(&self) -> u64 {
        self.invalid + self.success + self.device_error + self.channel_failure
    }
}
