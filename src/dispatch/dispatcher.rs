//! Command dispatcher with a last-command-wins policy
//!
//! At most one request is in flight. Dispatching a new command aborts the
//! previous request and bumps the generation; a request finishing under an
//! older generation is discarded and never reported as current.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::command::MotionCommand;
use crate::events::InterpreterEvent;

use super::transport::CommandTransport;

/// Handle describing an issued dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTicket {
    pub generation: u64,
    pub command: MotionCommand,
}

/// Result of the most recent current dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Controller answered with a non-empty body
    Completed { command: MotionCommand, body: String },
    /// Request failed or the body was empty
    Failed { command: MotionCommand, reason: String },
}

/// Shared dispatch bookkeeping
#[derive(Default)]
struct DispatchState {
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    last_outcome: Option<DispatchOutcome>,
}

/// Sends resolved commands to the car controller
pub struct CommandDispatcher {
    transport: Arc<dyn CommandTransport>,
    state: Arc<Mutex<DispatchState>>,
    event_tx: broadcast::Sender<InterpreterEvent>,
}

impl CommandDispatcher {
    /// Create a dispatcher over the given transport
    pub fn new(
        transport: Arc<dyn CommandTransport>,
        event_tx: broadcast::Sender<InterpreterEvent>,
    ) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(DispatchState::default())),
            event_tx,
        }
    }

    /// Send a command, superseding any request still in flight
    pub async fn dispatch(&self, command: MotionCommand) -> DispatchTicket {
        let mut state = self.state.lock().await;

        state.generation += 1;
        let generation = state.generation;

        if let Some(previous) = state.in_flight.take() {
            if !previous.is_finished() {
                debug!(generation, "cancelling in-flight dispatch");
            }
            previous.abort();
        }

        info!(
            %command,
            generation,
            transport = self.transport.name(),
            "dispatching command"
        );

        let transport = Arc::clone(&self.transport);
        let shared = Arc::clone(&self.state);
        let event_tx = self.event_tx.clone();

        state.in_flight = Some(tokio::spawn(async move {
            let result = transport.send(command).await;

            let mut state = shared.lock().await;
            if state.generation != generation {
                debug!(%command, generation, "discarding superseded dispatch result");
                return;
            }
            state.in_flight = None;

            let (outcome, event) = match result {
                Ok(body) => {
                    info!(%command, %body, "controller responded");
                    (
                        DispatchOutcome::Completed {
                            command,
                            body: body.clone(),
                        },
                        InterpreterEvent::DispatchCompleted { command, body },
                    )
                }
                Err(e) => {
                    warn!(%command, error = %e, "dispatch failed");
                    let reason = e.to_string();
                    (
                        DispatchOutcome::Failed {
                            command,
                            reason: reason.clone(),
                        },
                        InterpreterEvent::DispatchFailed { command, reason },
                    )
                }
            };

            state.last_outcome = Some(outcome);
            let _ = event_tx.send(event);
        }));

        DispatchTicket {
            generation,
            command,
        }
    }

    /// Outcome of the latest current dispatch, if it has finished
    pub async fn last_outcome(&self) -> Option<DispatchOutcome> {
        self.state.lock().await.last_outcome.clone()
    }

    /// Abort any request still in flight
    pub async fn cancel(&self) {
        let mut state = self.state.lock().await;
        state.generation += 1;
        if let Some(handle) = state.in_flight.take() {
            handle.abort();
            debug!("in-flight dispatch cancelled");
        }
    }
}
