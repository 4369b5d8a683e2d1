//! Error types for the authentication service.

use crate::framework::ChannelError;
use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The platform has no accounts to choose from.
    #[error("No account available")]
    NoAccount,

    /// The requested account is not known to the platform.
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// The service replied with an error.
    #[error("Service error: {0}")]
    Service(String),

    /// The peer sent something that is not a valid message.
    #[error("Malformed message: {0}")]
    Codec(#[from] serde_json::Error),

    /// The reply did not match the request.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// The pipe to the service is gone.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}
