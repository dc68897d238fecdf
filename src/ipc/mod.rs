//! IPC module for recognizer and frontend communication

mod protocol;
mod server;

pub use server::Server;
