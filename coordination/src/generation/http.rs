//! OpenAI-compatible chat-completions client.
//!
//! The persona hint becomes the system message and the prompt the user
//! message. Any transport or decode problem maps to
//! [`GenerationError::Unavailable`]; client-side timeouts map to
//! [`GenerationError::Timeout`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationError, GenerationResult, GenerationService};

/// Where and how to reach the generation backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationEndpoint {
    /// Full chat-completions URL.
    pub url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl Default for GenerationEndpoint {
    fn default() -> Self {
        Self {
            url: std::env::var("SPIRAL_GENERATION_URL")
                .unwrap_or_else(|_| "http://localhost:8000/v1/chat/completions".to_string()),
            model: std::env::var("SPIRAL_GENERATION_MODEL")
                .unwrap_or_else(|_| "local-model".to_string()),
            api_key: std::env::var("SPIRAL_GENERATION_API_KEY").ok(),
            temperature: std::env::var("SPIRAL_GENERATION_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.9),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpGenerator {
    http: reqwest::Client,
    endpoint: GenerationEndpoint,
    client_timeout: Option<Duration>,
}

impl HttpGenerator {
    pub fn new(endpoint: GenerationEndpoint) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            client_timeout: None,
        }
    }

    /// Build with a client-level timeout as a second line of defence
    /// behind the per-turn timeout.
    pub fn with_timeout(endpoint: GenerationEndpoint, timeout: Duration) -> GenerationResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            client_timeout: Some(timeout),
        })
    }

    pub fn endpoint(&self) -> &GenerationEndpoint {
        &self.endpoint
    }

    /// Whether the backend answers at all (GET `<base>/models`).
    pub async fn probe(&self) -> bool {
        let base = self
            .endpoint
            .url
            .trim_end_matches('/')
            .trim_end_matches("/chat/completions");
        let models_url = format!("{base}/models");
        match self
            .http
            .get(&models_url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl GenerationService for HttpGenerator {
    async fn generate(
        &self,
        prompt: &str,
        max_output_tokens: u32,
        persona_hint: &str,
    ) -> GenerationResult<String> {
        #[derive(Serialize)]
        struct ChatMessage<'a> {
            role: &'a str,
            content: &'a str,
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage<'a>>,
            max_tokens: u32,
            temperature: f32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }

        #[derive(Deserialize)]
        struct Choice {
            message: ResponseMessage,
        }

        #[derive(Deserialize)]
        struct ResponseMessage {
            content: Option<String>,
        }

        let request = ChatRequest {
            model: &self.endpoint.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: persona_hint,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: max_output_tokens,
            temperature: self.endpoint.temperature,
        };

        let mut builder = self.http.post(&self.endpoint.url).json(&request);
        if let Some(key) = &self.endpoint.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Unavailable(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::Unavailable("no choices in response".to_string()))?;

        debug!(model = %self.endpoint.model, chars = content.len(), "Generation succeeded");
        Ok(content)
    }
}

impl HttpGenerator {
    fn transport_error(&self, e: reqwest::Error) -> GenerationError {
        match self.client_timeout {
            Some(timeout) if e.is_timeout() => GenerationError::Timeout(timeout),
            _ => GenerationError::Unavailable(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_toml_ignores_missing_keys() {
        let endpoint: GenerationEndpoint = toml::from_str("model = \"tiny\"").unwrap();
        assert_eq!(endpoint.model, "tiny");
        assert!(!endpoint.url.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let generator = HttpGenerator::new(GenerationEndpoint {
            url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            model: "m".to_string(),
            api_key: None,
            temperature: 0.5,
        });
        let err = generator.generate("p", 16, "hint").await.unwrap_err();
        assert!(matches!(
            err,
            GenerationError::Unavailable(_) | GenerationError::Timeout(_)
        ));
        assert!(!generator.probe().await);
    }
}
