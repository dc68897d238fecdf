//! Transcript interpreter
//!
//! Owns the vocabulary, the direction state machine and the utterance
//! epoch. It is the only writer of direction state: every transcript event
//! is funnelled through [`Interpreter::run`] one at a time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info};

use crate::command::{extract, Language, MotionCommand, Vocabulary};
use crate::dispatch::{CommandDispatcher, DispatchOutcome};
use crate::events::InterpreterEvent;
use crate::state::{Direction, DirectionStateMachine};

use super::handle::SessionCommand;

/// Errors returned to the transcript source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpretError {
    #[error("utterance {utterance_id} is stale (current utterance is {current})")]
    StaleUtterance { utterance_id: u64, current: u64 },

    #[error("interpreter session has shut down")]
    SessionClosed,
}

/// What a transcript event led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptOutcome {
    /// Partial text, shown but not interpreted
    Displayed,
    /// Final text was interpreted; `None` means nothing matched
    Interpreted(Option<MotionCommand>),
}

/// Snapshot of the interpreting session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub language: Language,
    pub recognizer_locale: String,
    pub direction: Direction,
    /// Latest utterance id, 0 before the first utterance
    pub utterance_id: u64,
    /// Latest transcript text, partial or final
    pub transcript: String,
    /// Command sent for the latest final transcript
    pub last_command: Option<MotionCommand>,
    pub last_dispatch: Option<DispatchOutcome>,
}

/// Utterance epoch: each new utterance invalidates all earlier ones
#[derive(Debug, Default)]
struct Epoch {
    current: u64,
    open: bool,
}

impl Epoch {
    fn begin(&mut self) -> u64 {
        self.current += 1;
        self.open = true;
        self.current
    }

    fn check(&self, utterance_id: u64) -> Result<(), InterpretError> {
        if self.open && utterance_id == self.current {
            Ok(())
        } else {
            Err(InterpretError::StaleUtterance {
                utterance_id,
                current: self.current,
            })
        }
    }
}

/// Turns final transcripts into dispatched motion commands
pub struct Interpreter {
    vocabulary: Vocabulary,
    machine: DirectionStateMachine,
    dispatcher: Arc<CommandDispatcher>,
    epoch: Epoch,
    transcript: String,
    last_command: Option<MotionCommand>,
    event_tx: broadcast::Sender<InterpreterEvent>,
}

impl Interpreter {
    /// Create an interpreter for one session
    pub fn new(
        vocabulary: Vocabulary,
        dispatcher: Arc<CommandDispatcher>,
        event_tx: broadcast::Sender<InterpreterEvent>,
    ) -> Self {
        Self {
            vocabulary,
            machine: DirectionStateMachine::new(event_tx.clone()),
            dispatcher,
            epoch: Epoch::default(),
            transcript: String::new(),
            last_command: None,
            event_tx,
        }
    }

    /// Current heading
    #[cfg(test)]
    pub fn direction(&self) -> Direction {
        self.machine.direction()
    }

    /// Start a new utterance, invalidating any earlier one
    pub fn begin_utterance(&mut self) -> u64 {
        let utterance_id = self.epoch.begin();
        self.transcript.clear();
        self.last_command = None;

        info!(utterance_id, "utterance started");
        let _ = self
            .event_tx
            .send(InterpreterEvent::UtteranceStarted { utterance_id });

        utterance_id
    }

    /// Handle one transcript event from the recognizer
    ///
    /// Partial text only updates the displayed transcript. Final text is
    /// interpreted, closes the utterance and, when a command matched, is
    /// dispatched.
    pub async fn handle_transcript(
        &mut self,
        utterance_id: u64,
        text: String,
        is_final: bool,
    ) -> Result<TranscriptOutcome, InterpretError> {
        if let Err(e) = self.epoch.check(utterance_id) {
            debug!(utterance_id, current = self.epoch.current, "ignoring stale transcript");
            return Err(e);
        }

        self.transcript.clone_from(&text);
        let _ = self.event_tx.send(InterpreterEvent::TranscriptUpdated {
            utterance_id,
            text,
            is_final,
        });

        if !is_final {
            return Ok(TranscriptOutcome::Displayed);
        }

        self.epoch.open = false;
        let command = self.interpret().await;

        let _ = self.event_tx.send(InterpreterEvent::CommandResolved {
            utterance_id,
            command,
        });

        Ok(TranscriptOutcome::Interpreted(command))
    }

    /// Extract, resolve and dispatch the current transcript
    async fn interpret(&mut self) -> Option<MotionCommand> {
        let primitive = extract(&self.transcript, &self.vocabulary);
        let resolved = self.machine.resolve(primitive);
        self.last_command = resolved;

        match resolved {
            Some(command) => {
                let ticket = self.dispatcher.dispatch(command).await;
                debug!(
                    generation = ticket.generation,
                    command = %ticket.command,
                    "command handed to dispatcher"
                );
            }
            None => {
                debug!(transcript = %self.transcript, "no command in transcript");
            }
        }

        resolved
    }

    /// Snapshot of the session
    pub async fn status(&self) -> SessionStatus {
        SessionStatus {
            language: self.vocabulary.language(),
            recognizer_locale: self.vocabulary.recognizer_locale().to_string(),
            direction: self.machine.direction(),
            utterance_id: self.epoch.current,
            transcript: self.transcript.clone(),
            last_command: self.last_command,
            last_dispatch: self.dispatcher.last_outcome().await,
        }
    }

    /// Run the interpreter, processing session commands until every handle
    /// is dropped
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<SessionCommand>) {
        info!(
            language = %self.vocabulary.language(),
            recognizer_locale = self.vocabulary.recognizer_locale(),
            "interpreter started in Neutral"
        );

        while let Some(command) = command_rx.recv().await {
            match command {
                SessionCommand::BeginUtterance { reply } => {
                    let _ = reply.send(self.begin_utterance());
                }
                SessionCommand::Transcript {
                    utterance_id,
                    text,
                    is_final,
                    reply,
                } => {
                    let result = self.handle_transcript(utterance_id, text, is_final).await;
                    let _ = reply.send(result);
                }
                SessionCommand::Status { reply } => {
                    let _ = reply.send(self.status().await);
                }
            }
        }

        self.dispatcher.cancel().await;
        info!("interpreter stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::dispatch::FakeTransport;

    fn create_interpreter(
        locale: &str,
    ) -> (
        Interpreter,
        Arc<FakeTransport>,
        broadcast::Receiver<InterpreterEvent>,
    ) {
        let (tx, rx) = broadcast::channel(64);
        let transport = Arc::new(FakeTransport::default());
        let dispatcher = Arc::new(CommandDispatcher::new(transport.clone(), tx.clone()));
        let interpreter = Interpreter::new(Vocabulary::for_locale(locale), dispatcher, tx);
        (interpreter, transport, rx)
    }

    async fn say(interpreter: &mut Interpreter, text: &str) -> Option<MotionCommand> {
        let id = interpreter.begin_utterance();
        match interpreter
            .handle_transcript(id, text.to_string(), true)
            .await
            .unwrap()
        {
            TranscriptOutcome::Interpreted(command) => command,
            TranscriptOutcome::Displayed => panic!("final transcript was not interpreted"),
        }
    }

    /// Let spawned dispatch tasks reach the transport
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_final_transcript_dispatches() {
        let (mut interpreter, transport, _rx) = create_interpreter("en-US");

        assert_eq!(say(&mut interpreter, "go").await, Some(MotionCommand::Forward));
        settle().await;
        assert_eq!(transport.sent(), vec![MotionCommand::Forward]);
        assert_eq!(interpreter.direction(), Direction::Forward);
    }

    #[tokio::test]
    async fn test_compound_commands_across_utterances() {
        let (mut interpreter, transport, _rx) = create_interpreter("ja-JP");

        assert_eq!(say(&mut interpreter, "後ろへ").await, Some(MotionCommand::Back));
        settle().await;
        assert_eq!(say(&mut interpreter, "右").await, Some(MotionCommand::RightBack));
        settle().await;
        assert_eq!(say(&mut interpreter, "止まれ").await, Some(MotionCommand::Stop));
        settle().await;
        assert_eq!(say(&mut interpreter, "左").await, Some(MotionCommand::Left));
        settle().await;

        assert_eq!(
            transport.sent(),
            vec![
                MotionCommand::Back,
                MotionCommand::RightBack,
                MotionCommand::Stop,
                MotionCommand::Left,
            ]
        );
        assert_eq!(interpreter.direction(), Direction::Neutral);
    }

    #[tokio::test]
    async fn test_no_match_is_not_dispatched() {
        let (mut interpreter, transport, _rx) = create_interpreter("en-US");

        say(&mut interpreter, "go").await;
        assert_eq!(say(&mut interpreter, "hmm").await, None);
        settle().await;

        assert_eq!(transport.sent(), vec![MotionCommand::Forward]);
        assert_eq!(interpreter.direction(), Direction::Forward);
    }

    #[tokio::test]
    async fn test_partial_transcripts_do_not_touch_state() {
        let (mut interpreter, transport, _rx) = create_interpreter("en-US");

        let id = interpreter.begin_utterance();
        let outcome = interpreter
            .handle_transcript(id, "go".to_string(), false)
            .await
            .unwrap();
        assert_eq!(outcome, TranscriptOutcome::Displayed);

        let outcome = interpreter
            .handle_transcript(id, "go back".to_string(), false)
            .await
            .unwrap();
        assert_eq!(outcome, TranscriptOutcome::Displayed);
        assert_eq!(interpreter.direction(), Direction::Neutral);

        let outcome = interpreter
            .handle_transcript(id, "go back".to_string(), true)
            .await
            .unwrap();
        assert_eq!(outcome, TranscriptOutcome::Interpreted(Some(MotionCommand::Back)));

        settle().await;
        assert_eq!(transport.sent(), vec![MotionCommand::Back]);
    }

    #[tokio::test]
    async fn test_stale_utterance_is_ignored() {
        let (mut interpreter, transport, _rx) = create_interpreter("en-US");

        let old = interpreter.begin_utterance();
        let new = interpreter.begin_utterance();
        assert!(new > old);

        let result = interpreter
            .handle_transcript(old, "go".to_string(), true)
            .await;
        assert_eq!(
            result,
            Err(InterpretError::StaleUtterance {
                utterance_id: old,
                current: new
            })
        );
        assert_eq!(interpreter.direction(), Direction::Neutral);

        settle().await;
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_final_transcript_closes_utterance() {
        let (mut interpreter, _transport, _rx) = create_interpreter("en-US");

        let id = interpreter.begin_utterance();
        interpreter
            .handle_transcript(id, "back".to_string(), true)
            .await
            .unwrap();

        let again = interpreter
            .handle_transcript(id, "go".to_string(), true)
            .await;
        assert!(matches!(again, Err(InterpretError::StaleUtterance { .. })));
        assert_eq!(interpreter.direction(), Direction::Back);
    }

    #[tokio::test]
    async fn test_transcript_before_any_utterance_is_stale() {
        let (mut interpreter, _transport, _rx) = create_interpreter("en-US");

        let result = interpreter
            .handle_transcript(0, "go".to_string(), true)
            .await;
        assert!(matches!(result, Err(InterpretError::StaleUtterance { .. })));
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let (mut interpreter, _transport, _rx) = create_interpreter("zh-CN");

        say(&mut interpreter, "前进").await;
        settle().await;

        let status = interpreter.status().await;
        assert_eq!(status.language, Language::Chinese);
        assert_eq!(status.recognizer_locale, "zh-CN");
        assert_eq!(status.direction, Direction::Forward);
        assert_eq!(status.utterance_id, 1);
        assert_eq!(status.transcript, "前进");
        assert_eq!(status.last_command, Some(MotionCommand::Forward));
        assert!(matches!(
            status.last_dispatch,
            Some(DispatchOutcome::Completed { .. })
        ));
    }

    #[tokio::test]
    async fn test_events_for_final_transcript() {
        let (mut interpreter, _transport, mut rx) = create_interpreter("en-US");

        say(&mut interpreter, "start").await;

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.to_string());
        }

        assert_eq!(kinds[0], "UTTERANCE_STARTED (#1)");
        assert_eq!(kinds[1], "TRANSCRIPT_FINAL \"start\"");
        assert_eq!(kinds[2], "DIRECTION_CHANGED (Neutral -> Forward)");
        assert_eq!(kinds[3], "COMMAND_RESOLVED (forward)");
    }
}
