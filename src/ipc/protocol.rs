//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::command::{Language, MotionCommand};
use crate::dispatch::DispatchOutcome;
use crate::events::InterpreterEvent;
use crate::session::{InterpretError, SessionStatus};
use crate::state::Direction;

/// Requests from a recognizer or frontend to the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current daemon status
    GetStatus,

    /// Start a new utterance, cancelling the previous one
    BeginUtterance,

    /// Transcript text for an utterance
    Transcript {
        utterance_id: u64,
        text: String,
        #[serde(default)]
        is_final: bool,
    },

    /// Ping to check connectivity
    Ping,

    /// Subscribe to interpreter event notifications
    Subscribe,
}

/// Responses from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current daemon status
    Status(DaemonStatus),

    /// A new utterance was started
    UtteranceStarted { utterance_id: u64 },

    /// Partial transcript accepted for display
    Accepted,

    /// Final transcript interpreted; `command` is absent when nothing matched
    CommandResolved { command: Option<MotionCommand> },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl From<InterpretError> for Response {
    fn from(error: InterpretError) -> Self {
        let code = match error {
            InterpretError::StaleUtterance { .. } => "stale_utterance",
            InterpretError::SessionClosed => "session_closed",
        };

        Response::Error {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Interpreter event occurred
    Event { event: InterpreterEvent },
}

/// Full daemon status snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Daemon version
    pub version: String,

    /// Language of the active vocabulary
    pub language: Language,

    /// Locale the recognizer should use
    pub recognizer_locale: String,

    /// Current heading
    pub direction: Direction,

    /// Latest utterance id
    pub utterance_id: u64,

    /// Latest transcript text
    pub transcript: String,

    /// Command sent for the latest final transcript
    pub last_command: Option<MotionCommand>,

    /// How the controller answered the latest command
    pub last_dispatch: Option<DispatchOutcome>,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl DaemonStatus {
    /// Combine a session snapshot with daemon uptime
    pub fn from_session(session: SessionStatus, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            language: session.language,
            recognizer_locale: session.recognizer_locale,
            direction: session.direction,
            utterance_id: session.utterance_id,
            transcript: session.transcript,
            last_command: session.last_command,
            last_dispatch: session.last_dispatch,
            uptime_secs,
        }
    }
}
