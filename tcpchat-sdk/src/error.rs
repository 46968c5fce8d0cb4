//! Error types for the chat client.

use thiserror::Error;

/// Chat client errors.
///
/// The `Display` text of an error is what ends up in
/// [`ChatClient::last_error`](crate::client::ChatClient::last_error).
#[derive(Error, Debug)]
pub enum ChatError {
    /// Host name could not be resolved to any address
    #[error("The host name is unknown: {0}")]
    HostUnresolved(String),

    /// Nothing is listening on the remote address
    #[error("No chat server found at {0}")]
    Refused(String),

    /// Transport-level I/O error (connect, read or write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection has been closed locally
    #[error("Connection closed")]
    Closed,

    /// `connect` was called while a connection is live
    #[error("Already connected")]
    AlreadyConnected,
}

/// Convenient Result type for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
