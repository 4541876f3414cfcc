//! Interactive chat loop.
//!
//! The first non-command line opens a session. After that, plain text is a
//! follow-up message and an empty line or `continue` lets the next
//! responder speak.

use anyhow::{Context, Result};
use coordination::{AgentResponse, Orchestrator, OrchestratorError, SessionId, TurnInput};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

const HELP: &str = "\
Commands:
  <text>          share a worry (or follow up on the current one)
  continue        let the next responder speak (an empty line works too)
  /ready          ask the current responder if it has heard enough
  /stats          anxiety arc summary for this session
  /reset <text>   start a new arc in this session with a new worry
  /end            end the session
  /help           show this help
  /quit           leave";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Say(TurnInput),
    Ready,
    Stats,
    Reset(String),
    End,
    Help,
    Quit,
    Unknown(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Say(TurnInput::from_text(line));
        };
        let (name, arg) = rest.split_once(' ').unwrap_or((rest, ""));
        match name {
            "ready" => Self::Ready,
            "stats" => Self::Stats,
            "reset" => Self::Reset(arg.trim().to_string()),
            "end" => Self::End,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

pub struct Repl<'a, W> {
    orchestrator: &'a Orchestrator,
    out: W,
    session: Option<SessionId>,
}

impl<'a, W: AsyncWrite + Unpin> Repl<'a, W> {
    pub fn new(orchestrator: &'a Orchestrator, out: W) -> Self {
        Self {
            orchestrator,
            out,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Read commands until `/quit` or EOF.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> Result<()> {
        self.say("What's worrying you? (/help for commands)").await?;
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            if !self.step(ReplCommand::parse(&line)).await? {
                break;
            }
        }
        Ok(())
    }

    /// Execute one command. Returns false when the loop should stop.
    pub async fn step(&mut self, command: ReplCommand) -> Result<bool> {
        match command {
            ReplCommand::Quit => return Ok(false),
            ReplCommand::Help => self.say(HELP).await?,
            ReplCommand::Unknown(name) => {
                self.say(&format!("Unknown command /{name}. Try /help.")).await?
            }
            ReplCommand::Say(input) => self.say_input(input).await?,
            command => {
                let Some(id) = self.session.clone() else {
                    self.say("No active session. Share a worry first.").await?;
                    return Ok(true);
                };
                self.session_command(&id, command).await?;
            }
        }
        Ok(true)
    }

    async fn say_input(&mut self, input: TurnInput) -> Result<()> {
        let result = match (self.session.clone(), input) {
            (None, TurnInput::Continue) => {
                return self.say("Nothing to continue yet. Share a worry first.").await;
            }
            (None, TurnInput::Message(text)) => match self.orchestrator.start_session(&text).await {
                Ok((id, response)) => {
                    self.session = Some(id);
                    Ok(response)
                }
                Err(e) => Err(e),
            },
            (Some(id), input) => self.orchestrator.continue_session(&id, input).await,
        };

        match result {
            Ok(response) => {
                if let Some(line) = response.metadata.get("opening_line").and_then(|v| v.as_str()) {
                    self.say(&format!("[{}] {line}", response.responder_name()))
                        .await?;
                }
                self.print_response(&response).await
            }
            Err(e) => self.report(e).await,
        }
    }

    async fn session_command(&mut self, id: &str, command: ReplCommand) -> Result<()> {
        match command {
            ReplCommand::Ready => match self.orchestrator.readiness_check(id).await {
                Ok(r) => {
                    self.say(&format!(
                        "ready={} ({:.0}%): {}",
                        r.ready,
                        r.confidence * 100.0,
                        r.reason
                    ))
                    .await
                }
                Err(e) => self.report(e).await,
            },
            ReplCommand::Stats => match self.orchestrator.session_analytics(id).await {
                Ok(summary) => self.say(&summary.status_line()).await,
                Err(e) => self.report(e).await,
            },
            ReplCommand::Reset(text) => match self.orchestrator.reset_arc(id, &text).await {
                Ok(response) => self.print_response(&response).await,
                Err(e) => self.report(e).await,
            },
            ReplCommand::End => match self.orchestrator.end_session(id, "user ended").await {
                Ok(closing) => {
                    self.session = None;
                    self.say(&closing).await
                }
                Err(e) => self.report(e).await,
            },
            _ => Ok(()),
        }
    }

    async fn print_response(&mut self, response: &AgentResponse) -> Result<()> {
        self.say(&format!(
            "\n{} [anxiety: {}]\n{}",
            response.responder_name(),
            response.anxiety_level,
            response.content
        ))
        .await?;
        match (&response.closing, response.next.responder()) {
            (Some(closing), _) => {
                self.say(&format!("\n{closing}\n(session closed; share a new worry to start again)"))
                    .await?;
                self.session = None;
            }
            (None, Some(next)) => {
                self.say(&format!("(next up: {})", next.display_name())).await?;
            }
            (None, None) => {}
        }
        Ok(())
    }

    async fn report(&mut self, err: OrchestratorError) -> Result<()> {
        warn!(error = %err, kind = err.kind(), "Chat command failed");
        if err.requires_new_session() {
            self.session = None;
            self.say(&format!("{err}. Share a worry to start a new session."))
                .await
        } else {
            self.say(&format!("{err}")).await
        }
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coordination::{InMemoryStore, Lexicon, OfflineGenerator, OrchestratorConfig};
    use std::sync::Arc;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(
            OrchestratorConfig::seeded(5),
            Lexicon::builtin().shared(),
            Arc::new(OfflineGenerator),
            Arc::new(InMemoryStore::new()),
        )
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ReplCommand::parse(""), ReplCommand::Say(TurnInput::Continue));
        assert_eq!(ReplCommand::parse("continue"), ReplCommand::Say(TurnInput::Continue));
        assert_eq!(
            ReplCommand::parse("my cat looks at me"),
            ReplCommand::Say(TurnInput::Message("my cat looks at me".into()))
        );
        assert_eq!(
            ReplCommand::parse("/reset new worry here"),
            ReplCommand::Reset("new worry here".into())
        );
        assert_eq!(ReplCommand::parse("/stats"), ReplCommand::Stats);
        assert_eq!(ReplCommand::parse("/exit"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("/dance"), ReplCommand::Unknown("dance".into()));
    }

    #[tokio::test]
    async fn test_conversation_then_end() {
        let orch = orchestrator();
        let mut out = Vec::new();
        let mut repl = Repl::new(&orch, &mut out);

        repl.step(ReplCommand::parse("my boss emailed me")).await.unwrap();
        assert!(repl.session().is_some());
        repl.step(ReplCommand::parse("")).await.unwrap();
        repl.step(ReplCommand::parse("/stats")).await.unwrap();
        repl.step(ReplCommand::parse("/end")).await.unwrap();
        assert!(repl.session().is_none());

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Dr. Intake McTherapy"));
        assert!(text.contains("[active] arc 1"));
    }

    #[tokio::test]
    async fn test_commands_need_a_session() {
        let orch = orchestrator();
        let mut out = Vec::new();
        let mut repl = Repl::new(&orch, &mut out);
        repl.step(ReplCommand::Ready).await.unwrap();
        repl.step(ReplCommand::parse("continue")).await.unwrap();
        assert!(!repl.step(ReplCommand::Quit).await.unwrap());

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("No active session"));
        assert!(text.contains("Nothing to continue yet"));
    }

    #[tokio::test]
    async fn test_run_stops_at_quit() {
        let orch = orchestrator();
        let mut out = Vec::new();
        let mut repl = Repl::new(&orch, &mut out);
        repl.run(&b"my rent is due\n/quit\nnever read\n"[..])
            .await
            .unwrap();
        assert!(repl.session().is_some());
    }
}
