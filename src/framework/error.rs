//! # Framework Errors
//!
//! Common error types for the hosting core. Everything a host, a shell or a
//! factory can report funnels into [`ShellError`], so callers only ever match
//! on one enum.

use crate::framework::connection::ConnectionId;
use std::any::Any;

/// Error type returned by a factory that could not build its service.
///
/// Factories are user code, so the framework does not constrain their error
/// type beyond what it needs to carry it across tasks.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// A call arrived in an order the lifecycle contract forbids.
///
/// These indicate a mismatch between host runtime and shell, not a bad
/// request from a peer. The host refuses the request outright; a violation
/// during configuration means the connection is never established.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("shell used before initialize")]
    NotInitialized,
    #[error("shell initialized twice")]
    AlreadyInitialized,
    #[error("shell already quit")]
    ShellTerminated,
    #[error("no configured connection with id {0}")]
    UnknownConnection(ConnectionId),
}

/// Errors raised by message pipe endpoints.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("peer endpoint closed")]
    PeerClosed,
}

/// Errors that can occur within the hosting framework itself.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("unsupported interface: {0}")]
    UnsupportedInterface(String),
    #[error("factory for {interface} failed to construct a service: {source}")]
    ConstructionFailed {
        interface: String,
        #[source]
        source: ServiceError,
    },
    #[error("factory for {interface} panicked: {message}")]
    ConstructionPanicked { interface: String, message: String },
    #[error("shell {phase} failed: {source}")]
    Lifecycle {
        phase: &'static str,
        #[source]
        source: ServiceError,
    },
    #[error("connection rejected: {0}")]
    ConnectionRejected(String),
    #[error("host closed")]
    HostClosed,
    #[error("host dropped response channel")]
    HostDropped,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}

/// Best-effort text of a caught panic.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
