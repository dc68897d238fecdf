//! Events emitted while interpreting transcripts
//!
//! Broadcast to subscribed IPC clients so a frontend can show the live
//! transcript, the command that was sent and how the controller answered.

use serde::{Deserialize, Serialize};

use crate::command::MotionCommand;
use crate::state::Direction;

/// Events emitted by the interpreter, state machine and dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterpreterEvent {
    /// A new utterance began; earlier utterances are now stale
    UtteranceStarted { utterance_id: u64 },

    /// Partial or final transcript text for display
    TranscriptUpdated {
        utterance_id: u64,
        text: String,
        is_final: bool,
    },

    /// A final transcript was interpreted. `command` is absent when no
    /// trigger phrase matched.
    CommandResolved {
        utterance_id: u64,
        command: Option<MotionCommand>,
    },

    /// The heading changed
    DirectionChanged { from: Direction, to: Direction },

    /// The controller answered the current dispatch
    DispatchCompleted {
        command: MotionCommand,
        /// Opaque response body
        body: String,
    },

    /// The current dispatch failed
    DispatchFailed {
        command: MotionCommand,
        reason: String,
    },
}

impl std::fmt::Display for InterpreterEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpreterEvent::UtteranceStarted { utterance_id } => {
                write!(f, "UTTERANCE_STARTED (#{})", utterance_id)
            }
            InterpreterEvent::TranscriptUpdated { is_final, text, .. } => {
                let kind = if *is_final { "FINAL" } else { "PARTIAL" };
                write!(f, "TRANSCRIPT_{} \"{}\"", kind, text)
            }
            InterpreterEvent::CommandResolved { command, .. } => match command {
                Some(command) => write!(f, "COMMAND_RESOLVED ({})", command),
                None => write!(f, "COMMAND_RESOLVED (none)"),
            },
            InterpreterEvent::DirectionChanged { from, to } => {
                write!(f, "DIRECTION_CHANGED ({} -> {})", from, to)
            }
            InterpreterEvent::DispatchCompleted { command, .. } => {
                write!(f, "DISPATCH_COMPLETED ({})", command)
            }
            InterpreterEvent::DispatchFailed { command, reason } => {
                write!(f, "DISPATCH_FAILED ({}: {})", command, reason)
            }
        }
    }
}
