//! Rolling health of the generation backend, fed by every responder turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health level derived from consecutive failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Healthy,
    /// At least one recent failure.
    Degraded,
    /// Three or more failures in a row.
    Down,
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationHealth {
    pub level: HealthLevel,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
    pub total_calls: u64,
    pub total_failures: u64,
    pub last_error: Option<String>,
    pub last_change: DateTime<Utc>,
}

impl Default for GenerationHealth {
    fn default() -> Self {
        Self {
            level: HealthLevel::Healthy,
            consecutive_successes: 0,
            consecutive_failures: 0,
            total_calls: 0,
            total_failures: 0,
            last_error: None,
            last_change: Utc::now(),
        }
    }
}

impl GenerationHealth {
    pub fn record_success(&mut self) {
        self.total_calls += 1;
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;

        // Recovers after 3 clean calls.
        if self.level != HealthLevel::Healthy && self.consecutive_successes >= 3 {
            self.level = HealthLevel::Healthy;
            self.last_change = Utc::now();
            self.last_error = None;
        }
    }

    pub fn record_failure(&mut self, error: &str) {
        self.total_calls += 1;
        self.total_failures += 1;
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
        self.last_error = Some(error.to_string());

        let level = if self.consecutive_failures >= 3 {
            HealthLevel::Down
        } else {
            HealthLevel::Degraded
        };
        if level != self.level {
            self.level = level;
            self.last_change = Utc::now();
        }
    }

    /// Fraction of calls that failed.
    pub fn failure_rate(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_failures as f64 / self.total_calls as f64
        }
    }
}
