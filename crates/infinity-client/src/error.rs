/// Errors surfaced to callers of the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The channel is not open; the request was dropped.
    #[error("not connected to the server")]
    NotConnected,
    /// The connection manager task has stopped.
    #[error("connection manager has shut down")]
    Closed,
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid audio payload: {0}")]
    Audio(#[from] base64::DecodeError),
}
