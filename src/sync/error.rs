//! Error types for the client side of the sync protocol.

/// Failure of a read or write request against the file resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// Network unreachable, connection reset, or the body could not be read.
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered with a non-success status.
    #[error("backend returned status {0}")]
    Status(u16),
    /// The body does not parse or lacks required fields.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Status(status.as_u16())
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

/// Failure inside the push channel task. Never surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("failed to open event stream: {0}")]
    Open(String),
    #[error("event stream failed: {0}")]
    Stream(String),
}
