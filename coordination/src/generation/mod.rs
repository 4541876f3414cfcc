//! Text-generation boundary.
//!
//! The engine only needs prose for a prompt. Every failure is recoverable:
//! responders catch it and fall back to canned text.
//!
//! ```text
//! responder prompt
//!   ├─ service answers within timeout → ContentSource::Generated
//!   ├─ service errors                 → ContentSource::Fallback (unavailable)
//!   └─ timeout elapses                → ContentSource::Fallback (timeout)
//! ```

pub mod health;
pub mod http;
pub mod offline;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use health::GenerationHealth;
pub use http::{GenerationEndpoint, HttpGenerator};
pub use offline::OfflineGenerator;

/// Why a generation call produced no text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation unavailable: {0}")]
    Unavailable(String),
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Shared reference to a generation backend.
pub type SharedGenerator = Arc<dyn GenerationService>;

/// Turns a prompt into prose.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// `persona_hint` is the persona's system prompt.
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        persona_hint: &str,
    ) -> GenerationResult<String>;
}

/// Where a response's prose came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Generated,
    Fallback,
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => write!(f, "generated"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Call `service` bounded by `timeout`. Blank output counts as unavailable.
pub async fn generate_with_timeout(
    service: &dyn GenerationService,
    prompt: &str,
    max_output_tokens: u32,
    persona_hint: &str,
    timeout: Duration,
) -> GenerationResult<String> {
    let call = service.generate(prompt, max_output_tokens, persona_hint);
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(text)) if text.trim().is_empty() => {
            Err(GenerationError::Unavailable("empty completion".to_string()))
        }
        Ok(Ok(text)) => Ok(text.trim().to_string()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(GenerationError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl GenerationService for Slow {
        async fn generate(&self, _: &str, _: u32, _: &str) -> GenerationResult<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_generation_timeout() {
        let err = generate_with_timeout(&Slow, "p", 64, "hint", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::Timeout(Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_blank_output_is_unavailable() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate().returning(|_, _, _| Ok("   ".to_string()));

        let err = generate_with_timeout(&mock, "p", 64, "hint", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_passes_arguments_through_and_trims() {
        let mut mock = MockGenerationService::new();
        mock.expect_generate()
            .withf(|prompt, tokens, hint| prompt == "worry" && *tokens == 99 && hint == "persona")
            .times(1)
            .returning(|_, _, _| Ok("  prose  ".to_string()));

        let text = generate_with_timeout(&mock, "worry", 99, "persona", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(text, "prose");
    }
}
