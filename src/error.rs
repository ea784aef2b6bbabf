#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("agent returned {status}: {body}")]
    ApiError { status: u16, body: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Faults inside the transcoder itself. Upstream faults never surface here;
/// they end the stream instead.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("failed to encode frame: {0}")]
    Encode(String),
}
