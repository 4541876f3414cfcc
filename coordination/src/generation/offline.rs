//! Generator for running without a backend: every call fails, so every
//! responder speaks its canned fallback.

use async_trait::async_trait;

use super::{GenerationError, GenerationResult, GenerationService};

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

#[async_trait]
impl GenerationService for OfflineGenerator {
    async fn generate(&self, _prompt: &str, _max: u32, _hint: &str) -> GenerationResult<String> {
        Err(GenerationError::Unavailable(
            "no generation backend configured".to_string(),
        ))
    }
}
