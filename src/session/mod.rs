//! Interpreting session
//!
//! One session lives as long as the daemon. It holds the only mutable
//! direction state, so all transcript events go through a single task.

mod handle;
mod interpreter;

pub use handle::SessionHandle;
pub use interpreter::{InterpretError, Interpreter, SessionStatus, TranscriptOutcome};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Run an interpreter on its own task and return a handle to it
pub fn spawn(interpreter: Interpreter) -> (SessionHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(32);
    let task = tokio::spawn(interpreter.run(command_rx));
    (SessionHandle::new(command_tx), task)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tokio::sync::broadcast;

    use crate::command::{MotionCommand, Vocabulary};
    use crate::dispatch::{CommandDispatcher, FakeTransport};
    use crate::state::Direction;

    fn spawn_session() -> (SessionHandle, JoinHandle<()>) {
        let (tx, _) = broadcast::channel(64);
        let transport = Arc::new(FakeTransport::default());
        let dispatcher = Arc::new(CommandDispatcher::new(transport, tx.clone()));
        spawn(Interpreter::new(Vocabulary::for_locale("en"), dispatcher, tx))
    }

    #[tokio::test]
    async fn test_handle_round_trip() {
        let (handle, _task) = spawn_session();

        let id = handle.begin_utterance().await.unwrap();
        assert_eq!(id, 1);

        let outcome = handle.transcript(id, "go".to_string(), false).await.unwrap();
        assert_eq!(outcome, TranscriptOutcome::Displayed);

        let outcome = handle
            .transcript(id, "go left".to_string(), true)
            .await
            .unwrap();
        assert_eq!(outcome, TranscriptOutcome::Interpreted(Some(MotionCommand::Left)));

        let status = handle.status().await.unwrap();
        assert_eq!(status.direction, Direction::Neutral);
        assert_eq!(status.last_command, Some(MotionCommand::Left));
    }

    #[tokio::test]
    async fn test_concurrent_handles_share_one_state() {
        let (handle, _task) = spawn_session();

        let first = handle.begin_utterance().await.unwrap();
        handle
            .transcript(first, "Forward".to_string(), true)
            .await
            .unwrap();

        let other = handle.clone();
        let second = other.begin_utterance().await.unwrap();
        let outcome = other
            .transcript(second, "right".to_string(), true)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            TranscriptOutcome::Interpreted(Some(MotionCommand::RightForward))
        );
    }

    #[tokio::test]
    async fn test_closed_session() {
        let (handle, task) = spawn_session();
        task.abort();
        let _ = task.await;

        assert_eq!(
            handle.begin_utterance().await,
            Err(InterpretError::SessionClosed)
        );
    }
}
