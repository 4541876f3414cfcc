//! JSON-lines transport: one `ChatRequest` per input line, one reply or
//! failure object per output line. Logs go to stderr, so stdout carries
//! only protocol traffic.

use anyhow::{Context, Result};
use coordination::ChatGateway;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Serve requests from `reader` until EOF. Returns the number of requests
/// handled.
pub async fn serve<R, W>(gateway: &ChatGateway, reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await.context("Failed to read request line")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!(bytes = line.len(), "Request received");

        let reply = gateway.handle_json(line).await;
        writer
            .write_all(reply.as_bytes())
            .await
            .context("Failed to write reply")?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        handled += 1;
    }

    info!(handled, "Input closed; stdio transport stopping");
    Ok(handled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::{InMemoryStore, Lexicon, OfflineGenerator, Orchestrator, OrchestratorConfig};
    use std::sync::Arc;

    fn gateway() -> ChatGateway {
        let orchestrator = Orchestrator::new(
            OrchestratorConfig::seeded(3),
            Lexicon::builtin().shared(),
            Arc::new(OfflineGenerator),
            Arc::new(InMemoryStore::new()),
        );
        ChatGateway::new(orchestrator.shared())
    }

    #[tokio::test]
    async fn test_one_reply_line_per_request() {
        let gw = gateway();
        let input = b"{\"text\":\"my boss emailed me\"}\n\n{\"session_id\":\"missing\",\"text\":\"\"}\n";
        let mut out = Vec::new();

        let handled = serve(&gw, &input[..], &mut out).await.unwrap();
        assert_eq!(handled, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["responder_name"], "Dr. Intake McTherapy");
        assert_eq!(lines[1]["error"], "session_not_found");
    }

    #[tokio::test]
    async fn test_follow_up_reuses_session() {
        let gw = gateway();
        let mut out = Vec::new();
        serve(&gw, &b"{\"text\":\"my rent is due\"}\n"[..], &mut out)
            .await
            .unwrap();
        let first: serde_json::Value =
            serde_json::from_str(String::from_utf8(out).unwrap().trim()).unwrap();
        let id = first["session_id"].as_str().unwrap().to_string();

        let request = format!("{{\"session_id\":\"{id}\",\"text\":\"continue\"}}\n");
        let mut out = Vec::new();
        serve(&gw, request.as_bytes(), &mut out).await.unwrap();
        let second: serde_json::Value =
            serde_json::from_str(String::from_utf8(out).unwrap().trim()).unwrap();
        assert_eq!(second["session_id"], id.as_str());
        assert_ne!(second["responder_name"], "Dr. Intake McTherapy");
    }
}
