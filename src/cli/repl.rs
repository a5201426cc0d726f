//! Line-oriented front end over [`ChatEngine`].
//!
//! Plain lines are sent as messages in the current session; lines starting
//! with `/` are commands. Replies are printed as they grow.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::engine::{ChatEngine, ChatUpdate};
use crate::models::{ChatMode, MessageRole, Origin};

/// Text printed by `/help`.
pub const REPL_HELP: &str = "\
Commands:
  /new               start a new session
  /list              list sessions, newest first
  /switch <id>       make <id> the current session
  /delete [id]       delete a session (default: current)
  /mode live|batch   choose the backend for new messages
  /history           print the current session
  /health            check that the server answers
  /help              show this help
  /quit              leave";

/// A slash command
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    New,
    List,
    Switch(String),
    Delete(Option<String>),
    Mode(ChatMode),
    History,
    Health,
    Help,
    Quit,
    /// Recognised command used wrongly, or not a command at all
    Invalid(String),
}

/// One line of input
#[derive(Debug, Clone, PartialEq)]
pub enum ReplInput {
    Empty,
    Message(String),
    Command(ReplCommand),
}

/// Classify a line of input.
pub fn parse_repl_line(line: &str) -> ReplInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplInput::Empty;
    }
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ReplInput::Message(line.trim_end_matches(['\r', '\n']).to_string());
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let arg = words.next().map(str::to_string);

    let command = match (name, arg) {
        ("new", None) => ReplCommand::New,
        ("list", None) => ReplCommand::List,
        ("switch", Some(id)) => ReplCommand::Switch(id),
        ("switch", None) => ReplCommand::Invalid("usage: /switch <id>".to_string()),
        ("delete", id) => ReplCommand::Delete(id),
        ("mode", Some(mode)) => match mode.parse() {
            Ok(mode) => ReplCommand::Mode(mode),
            Err(e) => ReplCommand::Invalid(e),
        },
        ("mode", None) => ReplCommand::Invalid("usage: /mode live|batch".to_string()),
        ("history", None) => ReplCommand::History,
        ("health", None) => ReplCommand::Health,
        ("help", None) => ReplCommand::Help,
        ("quit" | "exit", None) => ReplCommand::Quit,
        (name, _) => ReplCommand::Invalid(format!("unknown command '/{}' (try /help)", name)),
    };
    ReplInput::Command(command)
}

/// Whether the loop should keep reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive loop state.
pub struct Repl<W: Write> {
    engine: Arc<ChatEngine>,
    updates: Option<UnboundedReceiver<ChatUpdate>>,
    mode: ChatMode,
    out: W,
    /// Assistant text already written for the action in progress
    printed: String,
}

impl<W: Write> Repl<W> {
    pub fn new(engine: Arc<ChatEngine>, mode: ChatMode, out: W) -> Self {
        Self {
            engine,
            updates: None,
            mode,
            out,
            printed: String::new(),
        }
    }

    /// Render replies incrementally from `rx` (the engine's update channel).
    pub fn with_updates(mut self, rx: UnboundedReceiver<ChatUpdate>) -> Self {
        self.updates = Some(rx);
        self
    }

    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Read lines from `input` until EOF or `/quit`.
    pub async fn run<R>(&mut self, input: R) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        self.prompt()?;
        while let Some(line) = lines.next_line().await? {
            if self.handle_line(&line).await? == Flow::Quit {
                break;
            }
            self.prompt()?;
        }
        debug!("Leaving interactive loop");
        Ok(())
    }

    /// Act on one line of input.
    pub async fn handle_line(&mut self, line: &str) -> std::io::Result<Flow> {
        match parse_repl_line(line) {
            ReplInput::Empty => Ok(Flow::Continue),
            ReplInput::Message(text) => {
                self.send(text).await?;
                Ok(Flow::Continue)
            }
            ReplInput::Command(command) => self.command(command).await,
        }
    }

    fn prompt(&mut self) -> std::io::Result<()> {
        write!(self.out, "[{}] > ", self.mode)?;
        self.out.flush()
    }

    async fn send(&mut self, text: String) -> std::io::Result<()> {
        let session_id = self.engine.current_session_id();
        let engine = self.engine.clone();
        self.engine.set_draft(&session_id, text);
        let submit = engine.submit(&session_id, self.mode);

        let result = match self.updates.take() {
            Some(mut rx) => {
                tokio::pin!(submit);
                let result = loop {
                    tokio::select! {
                        result = &mut submit => break result,
                        Some(update) = rx.recv() => self.render(update)?,
                    }
                };
                while let Ok(update) = rx.try_recv() {
                    self.render(update)?;
                }
                self.updates = Some(rx);
                result
            }
            None => {
                let result = submit.await;
                if let Ok(outcome) = &result {
                    let reply = outcome
                        .assistant_index
                        .and_then(|i| self.engine.messages(&session_id).get(i).cloned());
                    if let Some(reply) = reply {
                        writeln!(self.out, "{}", reply.content)?;
                    }
                }
                result
            }
        };

        if let Err(e) = result {
            writeln!(self.out, "! {}", e)?;
        }
        Ok(())
    }

    fn render(&mut self, update: ChatUpdate) -> std::io::Result<()> {
        match update {
            ChatUpdate::User { .. } => {}
            ChatUpdate::Assistant { content, .. } => {
                match content.strip_prefix(self.printed.as_str()) {
                    Some(suffix) if !self.printed.is_empty() => write!(self.out, "{}", suffix)?,
                    _ => {
                        if !self.printed.is_empty() {
                            writeln!(self.out)?;
                        }
                        write!(self.out, "{}", content)?;
                    }
                }
                self.out.flush()?;
                self.printed = content;
            }
            ChatUpdate::Finished(_) => {
                if !self.printed.is_empty() {
                    writeln!(self.out)?;
                }
                self.printed.clear();
            }
        }
        Ok(())
    }

    async fn command(&mut self, command: ReplCommand) -> std::io::Result<Flow> {
        match command {
            ReplCommand::New => {
                let id = self.engine.create_session();
                writeln!(self.out, "Started session {}", id)?;
            }
            ReplCommand::List => {
                let current = self.engine.current_session_id();
                for summary in self.engine.list_sessions() {
                    let marker = if summary.id == current { '*' } else { ' ' };
                    writeln!(
                        self.out,
                        "{} {}  {}  ({} messages)",
                        marker, summary.id, summary.title, summary.message_count
                    )?;
                }
            }
            ReplCommand::Switch(id) => {
                self.engine.switch_session(&id);
                writeln!(self.out, "Switched to {}", id)?;
            }
            ReplCommand::Delete(id) => {
                let id = id.unwrap_or_else(|| self.engine.current_session_id());
                if self.engine.delete_session(&id) {
                    writeln!(
                        self.out,
                        "Deleted {}; current session is {}",
                        id,
                        self.engine.current_session_id()
                    )?;
                } else {
                    writeln!(self.out, "Could not delete {}", id)?;
                }
            }
            ReplCommand::Mode(mode) => {
                self.mode = mode;
                writeln!(self.out, "Mode set to {}", mode)?;
            }
            ReplCommand::History => {
                let current = self.engine.current_session_id();
                for message in self.engine.messages(&current) {
                    let who = match (message.role, message.origin) {
                        (MessageRole::User, _) => "you",
                        (MessageRole::Assistant, Origin::Batch) => "batch",
                        (MessageRole::Assistant, Origin::Stream) => "stream",
                        (MessageRole::Assistant, Origin::Live) => "live",
                        (MessageRole::Assistant, Origin::Error) => "error",
                        (MessageRole::Assistant, Origin::User) => "assistant",
                    };
                    writeln!(self.out, "{}: {}", who, message.content)?;
                }
            }
            ReplCommand::Health => match self.engine.dispatcher().health_check().await {
                Ok(true) => writeln!(self.out, "Server is up")?,
                Ok(false) => writeln!(self.out, "Server answered with an error status")?,
                Err(e) => writeln!(self.out, "Server unreachable: {}", e)?,
            },
            ReplCommand::Help => writeln!(self.out, "{}", REPL_HELP)?,
            ReplCommand::Quit => return Ok(Flow::Quit),
            ReplCommand::Invalid(reason) => writeln!(self.out, "{}", reason)?,
        }
        Ok(Flow::Continue)
    }
}
