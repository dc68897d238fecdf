//! Transports that deliver a motion command to the car controller

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::command::MotionCommand;

/// Errors that can occur while delivering a command
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("request to controller failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("controller sent an empty response")]
    EmptyResponse,
}

/// Delivers one command and returns the controller's response body
#[async_trait]
pub trait CommandTransport: Send + Sync + 'static {
    /// Send the command, returning the opaque response text
    async fn send(&self, command: MotionCommand) -> Result<String, DispatchError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}

/// HTTP method used to reach the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    /// POST with an empty JSON object body
    Post,
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

/// Sends `<endpoint>/<wire token>` requests with a short fixed timeout
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    method: HttpMethod,
}

impl HttpTransport {
    /// Create a transport for the given base endpoint
    pub fn new(endpoint: &str, timeout: Duration, method: HttpMethod) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            method,
        })
    }

    /// URL a command is sent to
    pub fn url_for(&self, command: MotionCommand) -> String {
        format!("{}/{}", self.endpoint, command.wire_token())
    }
}

#[async_trait]
impl CommandTransport for HttpTransport {
    async fn send(&self, command: MotionCommand) -> Result<String, DispatchError> {
        let url = self.url_for(command);
        debug!(%url, method = ?self.method, "sending command");

        let request = match self.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body("{}"),
        };

        let body = request.send().await?.text().await?;
        if body.is_empty() {
            return Err(DispatchError::EmptyResponse);
        }

        Ok(body)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
