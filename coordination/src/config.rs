//! Orchestrator configuration.
//!
//! Defaults read `SPIRAL_*` environment variables, a TOML file can be
//! layered on top with [`OrchestratorConfig::from_toml_str`], and the binary
//! applies CLI overrides last.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::escalation::DEFAULT_TURN_CEILING;

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for the conversation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum responder turns per arc before forced termination.
    pub turn_ceiling: u32,
    /// Upper bound on a single generation call.
    pub generation_timeout_ms: u64,
    /// Token budget passed to the generation service.
    pub max_output_tokens: u32,
    /// Session time-to-live, refreshed on every save.
    pub state_ttl_secs: u64,
    /// Longest accepted user message, in characters.
    pub max_input_chars: usize,
    /// History length at which further turns are rejected.
    pub max_history_turns: usize,
    /// Fixed RNG seed; `None` draws fresh entropy per turn.
    pub rng_seed: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            turn_ceiling: env_parse("SPIRAL_TURN_CEILING").unwrap_or(DEFAULT_TURN_CEILING),
            generation_timeout_ms: env_parse("SPIRAL_GENERATION_TIMEOUT_MS").unwrap_or(3_000),
            max_output_tokens: env_parse("SPIRAL_MAX_OUTPUT_TOKENS").unwrap_or(256),
            state_ttl_secs: env_parse("SPIRAL_STATE_TTL_SECS").unwrap_or(3_600),
            max_input_chars: env_parse("SPIRAL_MAX_INPUT_CHARS").unwrap_or(1_000),
            max_history_turns: env_parse("SPIRAL_MAX_HISTORY_TURNS").unwrap_or(50),
            rng_seed: env_parse("SPIRAL_RNG_SEED"),
        }
    }
}

impl OrchestratorConfig {
    /// Parse a TOML table; missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_ceiling == 0 {
            return Err(ConfigError::Invalid("turn_ceiling must be at least 1".into()));
        }
        if self.generation_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "generation_timeout_ms must be positive".into(),
            ));
        }
        if self.max_input_chars == 0 {
            return Err(ConfigError::Invalid("max_input_chars must be positive".into()));
        }
        Ok(())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }

    /// Deterministic configuration for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_overrides_selected_fields() {
        let config = OrchestratorConfig::from_toml_str(
            "turn_ceiling = 4\ngeneration_timeout_ms = 1500\nrng_seed = 7\n",
        )
        .unwrap();
        assert_eq!(config.turn_ceiling, 4);
        assert_eq!(config.generation_timeout(), Duration::from_millis(1500));
        assert_eq!(config.rng_seed, Some(7));
    }

    #[test]
    fn test_zero_ceiling_rejected() {
        let err = OrchestratorConfig::from_toml_str("turn_ceiling = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_seeded_keeps_other_defaults() {
        let config = OrchestratorConfig::seeded(42);
        assert_eq!(config.rng_seed, Some(42));
        assert!(config.turn_ceiling >= 1);
    }
}
