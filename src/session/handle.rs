//! Cloneable handle for feeding the interpreter from other tasks

use tokio::sync::{mpsc, oneshot};

use super::interpreter::{InterpretError, SessionStatus, TranscriptOutcome};

/// Requests processed by [`super::Interpreter::run`]
#[derive(Debug)]
pub enum SessionCommand {
    /// Start a new utterance and return its id
    BeginUtterance { reply: oneshot::Sender<u64> },
    /// Partial or final transcript for an utterance
    Transcript {
        utterance_id: u64,
        text: String,
        is_final: bool,
        reply: oneshot::Sender<Result<TranscriptOutcome, InterpretError>>,
    },
    /// Snapshot of the session
    Status { reply: oneshot::Sender<SessionStatus> },
}

/// Sends requests to the interpreter task
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(command_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { command_tx }
    }

    /// Start a new utterance, invalidating the previous one
    pub async fn begin_utterance(&self) -> Result<u64, InterpretError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::BeginUtterance { reply }, rx)
            .await
    }

    /// Forward a transcript event
    pub async fn transcript(
        &self,
        utterance_id: u64,
        text: String,
        is_final: bool,
    ) -> Result<TranscriptOutcome, InterpretError> {
        let (reply, rx) = oneshot::channel();
        let command = SessionCommand::Transcript {
            utterance_id,
            text,
            is_final,
            reply,
        };
        self.request(command, rx).await?
    }

    /// Fetch a status snapshot
    pub async fn status(&self) -> Result<SessionStatus, InterpretError> {
        let (reply, rx) = oneshot::channel();
        self.request(SessionCommand::Status { reply }, rx).await
    }

    async fn request<T>(
        &self,
        command: SessionCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, InterpretError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| InterpretError::SessionClosed)?;
        rx.await.map_err(|_| InterpretError::SessionClosed)
    }
}
