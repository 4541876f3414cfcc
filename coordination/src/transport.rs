//! Transport-neutral chat gateway.
//!
//! Maps `{session_id?, text}` requests onto orchestrator calls and flattens
//! the result into a reply any transport can serialize. A request without a
//! session id starts a new session; empty text or the word `continue` sends
//! the continue signal.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::OrchestratorError;
use crate::orchestrator::{SharedOrchestrator, TurnInput};
use crate::types::{AnxietyLevel, Metadata, SessionId};

/// Inbound chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default)]
    pub text: String,
}

impl ChatRequest {
    pub fn start(text: impl Into<String>) -> Self {
        Self {
            session_id: None,
            text: text.into(),
        }
    }

    pub fn follow_up(session_id: impl Into<SessionId>, text: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            text: text.into(),
        }
    }
}

/// Outbound reply for one responder turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: SessionId,
    pub responder_name: String,
    pub content: String,
    pub anxiety_level: AnxietyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_next_responder: Option<String>,
    pub closed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Error shape returned to transport clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatFailure {
    pub error: String,
    pub message: String,
    /// The client should drop its session id and start over.
    pub start_new_session: bool,
}

impl From<&OrchestratorError> for ChatFailure {
    fn from(err: &OrchestratorError) -> Self {
        Self {
            error: err.kind().to_string(),
            message: err.to_string(),
            start_new_session: err.requires_new_session(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatGateway {
    orchestrator: SharedOrchestrator,
}

impl ChatGateway {
    pub fn new(orchestrator: SharedOrchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &SharedOrchestrator {
        &self.orchestrator
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatReply, OrchestratorError> {
        let (session_id, response) = match request.session_id {
            None => self.orchestrator.start_session(&request.text).await?,
            Some(id) => {
                let response = self
                    .orchestrator
                    .continue_session(&id, TurnInput::from_text(&request.text))
                    .await?;
                (id, response)
            }
        };

        Ok(ChatReply {
            session_id,
            responder_name: response.responder_name().to_string(),
            content: response.content,
            anxiety_level: response.anxiety_level,
            suggested_next_responder: response
                .next
                .responder()
                .map(|id| id.display_name().to_string()),
            closed: response.closing.is_some(),
            closing: response.closing,
            metadata: response.metadata,
        })
    }

    /// Handle one JSON-encoded request and return one JSON-encoded line:
    /// either a [`ChatReply`] or a [`ChatFailure`].
    pub async fn handle_json(&self, line: &str) -> String {
        let request: ChatRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                let failure = ChatFailure {
                    error: "bad_request".to_string(),
                    message: e.to_string(),
                    start_new_session: false,
                };
                return encode(&failure);
            }
        };

        match self.handle(request).await {
            Ok(reply) => encode(&reply),
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Chat request failed");
                encode(&ChatFailure::from(&e))
            }
        }
    }
}

fn encode<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        format!(r#"{{"error":"internal_error","message":"{e}","start_new_session":false}}"#)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::OrchestratorConfig;
    use crate::generation::OfflineGenerator;
    use crate::lexicon::Lexicon;
    use crate::orchestrator::Orchestrator;
    use crate::state::InMemoryStore;

    fn gateway() -> ChatGateway {
        let orchestrator = Orchestrator::new(
            OrchestratorConfig::seeded(11),
            Lexicon::builtin().shared(),
            Arc::new(OfflineGenerator),
            Arc::new(InMemoryStore::new()),
        );
        ChatGateway::new(orchestrator.shared())
    }

    #[tokio::test]
    async fn test_missing_session_id_starts_session() {
        let gw = gateway();
        let reply = gw
            .handle(ChatRequest::start("My friend hasn't texted me back"))
            .await
            .unwrap();
        assert!(!reply.session_id.is_empty());
        assert_eq!(reply.responder_name, "Dr. Intake McTherapy");
        assert!(!reply.closed);
        assert!(reply.suggested_next_responder.is_some());
    }

    #[tokio::test]
    async fn test_blank_text_continues() {
        let gw = gateway();
        let first = gw.handle(ChatRequest::start("my rent is due")).await.unwrap();
        let second = gw
            .handle(ChatRequest::follow_up(first.session_id.clone(), ""))
            .await
            .unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert_ne!(second.responder_name, "Dr. Intake McTherapy");
        assert!(!second.content.is_empty());
    }

    #[tokio::test]
    async fn test_json_errors_are_structured() {
        let gw = gateway();
        let bad: ChatFailure = serde_json::from_str(&gw.handle_json("not json").await).unwrap();
        assert_eq!(bad.error, "bad_request");

        let line = r#"{"session_id":"gone","text":"hello"}"#;
        let missing: ChatFailure = serde_json::from_str(&gw.handle_json(line).await).unwrap();
        assert_eq!(missing.error, "session_not_found");
        assert!(missing.start_new_session);
    }

    #[tokio::test]
    async fn test_json_reply_round_trip() {
        let gw = gateway();
        let line = r#"{"text":"I have a weird headache"}"#;
        let reply: ChatReply = serde_json::from_str(&gw.handle_json(line).await).unwrap();
        assert_eq!(reply.anxiety_level, AnxietyLevel::Calm);
        assert_eq!(reply.metadata["content_source"], "fallback");
    }
}
