/// Failure while turning an opaque payload into a `LogBatch`.
///
/// One variant per decoding stage, in the order the stages run.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(String),

    #[error("payload is not a valid gzip stream: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("decompressed payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("log document is malformed: {0}")]
    Document(#[from] serde_json::Error),
}

/// Failure while packing a `LogBatch` into a payload.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to serialize log document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to compress payload: {0}")]
    Compress(#[from] std::io::Error),
}

/// Failure reported by a metrics sink for a single datum.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink transport error: {0}")]
    Transport(String),

    #[error("sink rejected datum with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to serialize datum: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pulse error types
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("origin not found: no instance id in log stream '{0}'")]
    OriginNotFound(String),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PulseError {
    /// True for errors that abort a whole batch before any output.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::OriginNotFound(_))
    }
}
