//! voice-commanderd: voice remote control daemon for the MKZ4 car
//!
//! This daemon provides:
//! - Keyword vocabularies for Japanese (default), Chinese and English
//! - Extraction of the last spoken motion command from a transcript
//! - A direction state machine turning left/right into compound commands
//! - HTTP dispatch to the car controller, newest command wins
//! - IPC server for recognizers and frontends
//!
//! Speech recognition itself is external: a recognizer connects over the
//! IPC socket and streams partial and final transcripts.

mod command;
mod config;
mod dispatch;
mod events;
mod ipc;
mod lifecycle;
mod session;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::Vocabulary;
use crate::config::Config;
use crate::dispatch::{CommandDispatcher, HttpTransport};
use crate::events::InterpreterEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::session::Interpreter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "voice-commanderd starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        endpoint = %config.endpoint,
        locale = %config.locale,
        "configuration loaded"
    );

    let mut shutdown = ShutdownSignal::new()?;

    // Interpreter, state machine and dispatcher -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<InterpreterEvent>(64);

    // The vocabulary is fixed for the lifetime of the daemon
    let vocabulary = Vocabulary::for_locale(&config.locale);
    info!(
        language = %vocabulary.language(),
        recognizer_locale = vocabulary.recognizer_locale(),
        "vocabulary selected"
    );

    let transport = HttpTransport::new(
        &config.endpoint,
        config.request_timeout,
        config.http_method,
    )
    .context("failed to build HTTP client")?;
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::new(transport),
        event_tx.clone(),
    ));

    let interpreter = Interpreter::new(vocabulary, dispatcher, event_tx.clone());
    let (session, interpreter_task) = session::spawn(interpreter);

    let server = Server::new(&config.socket_path, session, event_tx.clone())?;

    let mut event_rx = event_tx.subscribe();

    info!("daemon initialized, entering main loop");

    tokio::select! {
        // Run the IPC server (accepts recognizer and frontend connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Trace the event bus
        _ = async {
            loop {
                match event_rx.recv().await {
                    Ok(event) => debug!(%event, "interpreter event"),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        } => {
            info!("event handler exited");
        }

        // Wait for shutdown signal
        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    server.shutdown().await;
    drop(server);

    // The interpreter stops once the last session handle is gone
    if tokio::time::timeout(Duration::from_secs(1), interpreter_task)
        .await
        .is_err()
    {
        warn!("interpreter did not stop in time");
    }

    info!("voice-commanderd stopped");

    Ok(())
}
