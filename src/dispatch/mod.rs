//! Delivery of resolved commands to the car controller
//!
//! This module handles:
//! - HTTP requests to `<endpoint>/<wire token>` with a short timeout
//! - Cancelling a request superseded by a newer command
//! - Reporting failures without retrying them

mod dispatcher;
mod transport;

pub use dispatcher::{CommandDispatcher, DispatchOutcome};
pub use transport::{HttpMethod, HttpTransport};

#[cfg(test)]
pub(crate) use dispatcher::tests::FakeTransport;
