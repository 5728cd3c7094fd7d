use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {peer} failed: {reason}")]
    Transport { peer: String, reason: String },

    #[error("{peer} answered HTTP {status}")]
    Status { peer: String, status: u16 },

    #[error("invalid response from {peer}: {reason}")]
    Decode { peer: String, reason: String },

    #[error("{peer} rejected handshake: {reason}")]
    HandshakeRejected { peer: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
