use std::io;

use thiserror::Error;

/// Errors that could occur while reporting a measure.
///
/// Every failure is returned synchronously to the caller of [`Reporter::count`][crate::Reporter::count] or
/// [`Reporter::time`][crate::Reporter::time]. Nothing is retried in the background, so ignoring the error is a valid
/// choice for callers that treat metrics as fire-and-forget.
#[derive(Debug, Error)]
pub enum Error {
    /// The dimensions could not be encoded as JSON.
    ///
    /// This happens for floating-point values that JSON cannot represent, such as `NaN` or infinity.
    #[error("failed to serialize dimensions: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No client has been configured on the reporter.
    #[error("no client set")]
    NoClient,

    /// The socket to the collector could not be established.
    #[error("failed to connect to collector: {0}")]
    Connection(#[source] io::Error),

    /// The datagram could not be sent, even after reconnecting once.
    #[error("failed to send payload: {0}")]
    Send(#[source] io::Error),

    /// The client failed to close its socket.
    #[error("failed to close connection: {0}")]
    Close(#[source] io::Error),
}

impl Error {
    /// Returns `true` if this error was caused by a reporter with no client configured.
    pub fn is_no_client(&self) -> bool {
        matches!(self, Error::NoClient)
    }
}
