//! Error types for the client driver.

/// Errors that end a [`GameClient`](crate::GameClient) run.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configured server URL could not be parsed.
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Every reconnect attempt failed; the client will not retry again.
    #[error("connection lost after {attempts} reconnect attempts: {reason}")]
    ConnectionLost {
        attempts: u32,
        /// Why the last attempt failed.
        reason: String,
    },
}
