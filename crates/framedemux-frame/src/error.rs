/// Errors that can occur during frame encoding and demultiplexing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload does not fit the 4-byte length field or the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A binary frame needs at least one payload byte to be delimited.
    #[error("empty binary payload cannot be framed")]
    EmptyPayload,

    /// The text payload would not decode back to itself.
    #[error("invalid text payload: {reason}")]
    InvalidText { reason: &'static str },

    /// Undecodable bytes piled up past the configured backlog limit.
    #[error("stream corrupt: backlog grew to {size} bytes (max {max})")]
    BacklogOverflow { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another complete frame was received.
    #[error("connection closed ({pending} bytes of an incomplete frame outstanding)")]
    ConnectionClosed { pending: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
