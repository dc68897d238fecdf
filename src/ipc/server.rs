//! Unix domain socket server for IPC
//!
//! Accepts transcript events from the recognizer, answers status queries and
//! pushes interpreter events to subscribed clients.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

use crate::events::InterpreterEvent;
use crate::session::{SessionHandle, TranscriptOutcome};

use super::protocol::{DaemonStatus, Notification, Request, Response};

/// Largest accepted message body
const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    session: SessionHandle,
    event_tx: broadcast::Sender<InterpreterEvent>,
    start_time: Instant,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Create a new IPC server bound to `socket_path`
    pub fn new(
        socket_path: &Path,
        session: SessionHandle,
        event_tx: broadcast::Sender<InterpreterEvent>,
    ) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Owner-only access
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            session,
            event_tx,
            start_time: Instant::now(),
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let client = Client {
                        session: self.session.clone(),
                        event_tx: self.event_tx.clone(),
                        start_time: self.start_time,
                    };
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = client.handle(stream) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Per-connection state
struct Client {
    session: SessionHandle,
    event_tx: broadcast::Sender<InterpreterEvent>,
    start_time: Instant,
}

impl Client {
    /// Handle a single client connection
    async fn handle(self, stream: UnixStream) -> Result<()> {
        let (reader, mut writer) = stream.into_split();

        // Frames are read on their own task so event pushes never interrupt
        // a partially read request
        let (request_tx, mut request_rx) = mpsc::channel(8);
        let _reader_task =
            AbortOnDrop(tokio::spawn(read_requests(reader, request_tx)).abort_handle());

        let mut events: Option<broadcast::Receiver<InterpreterEvent>> = None;

        loop {
            tokio::select! {
                request = request_rx.recv() => {
                    let Some(request) = request else {
                        debug!("client disconnected");
                        return Ok(());
                    };

                    debug!(?request, "received request");
                    let (response, subscribe) = self.process_request(request).await;
                    if subscribe && events.is_none() {
                        events = Some(self.event_tx.subscribe());
                        debug!("client subscribed to notifications");
                    }

                    send_message(&mut writer, &response).await?;
                }
                event = next_event(&mut events), if events.is_some() => {
                    let Some(event) = event else {
                        events = None;
                        continue;
                    };

                    let notification = Notification::Event { event };
                    send_message(&mut writer, &notification).await?;
                }
            }
        }
    }

    /// Process a request and return a response
    /// Returns (Response, should_subscribe)
    async fn process_request(&self, request: Request) -> (Response, bool) {
        match request {
            Request::Ping => (Response::Pong, false),

            Request::GetStatus => {
                let response = match self.session.status().await {
                    Ok(session) => Response::Status(DaemonStatus::from_session(
                        session,
                        self.start_time.elapsed().as_secs(),
                    )),
                    Err(e) => e.into(),
                };
                (response, false)
            }

            Request::BeginUtterance => {
                let response = match self.session.begin_utterance().await {
                    Ok(utterance_id) => Response::UtteranceStarted { utterance_id },
                    Err(e) => e.into(),
                };
                (response, false)
            }

            Request::Transcript {
                utterance_id,
                text,
                is_final,
            } => {
                let response = match self.session.transcript(utterance_id, text, is_final).await {
                    Ok(TranscriptOutcome::Displayed) => Response::Accepted,
                    Ok(TranscriptOutcome::Interpreted(command)) => {
                        Response::CommandResolved { command }
                    }
                    Err(e) => {
                        debug!(error = %e, "transcript rejected");
                        e.into()
                    }
                };
                (response, false)
            }

            Request::Subscribe => (Response::Subscribed, true),
        }
    }
}

/// Aborts the request reader when the connection handler goes away,
/// including when it is dropped mid-`select!` on shutdown
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Next interpreter event for a subscribed client, `None` once the bus is
/// closed
async fn next_event(
    events: &mut Option<broadcast::Receiver<InterpreterEvent>>,
) -> Option<InterpreterEvent> {
    let rx = events.as_mut()?;
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Read length-prefixed requests until EOF or a protocol error
async fn read_requests<R>(mut reader: R, request_tx: mpsc::Sender<Request>)
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];

    loop {
        // Read message length (4-byte little-endian)
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return,
            Err(e) => {
                warn!(?e, "failed to read from client");
                return;
            }
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_LEN {
            warn!(len, "message too large, disconnecting");
            return;
        }

        let mut msg_buf = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut msg_buf).await {
            warn!(?e, "failed to read message body");
            return;
        }

        let request: Request = match serde_json::from_slice(&msg_buf) {
            Ok(request) => request,
            Err(e) => {
                warn!(?e, "failed to parse request, disconnecting");
                return;
            }
        };

        if request_tx.send(request).await.is_err() {
            return;
        }
    }
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;

    Ok(())
}
