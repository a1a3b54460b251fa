/// Errors that can occur during request encoding and reply framing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffered reply grew past the configured maximum without an end marker.
    #[error("reply too large ({size} bytes, max {max})")]
    ReplyTooLarge { size: usize, max: usize },

    /// A complete frame was received but is not valid UTF-8 text.
    #[error("frame is not valid UTF-8 text")]
    InvalidUtf8,

    /// A request envelope did not contain a decimal opcode.
    #[error("invalid request opcode {0:?}")]
    InvalidOpcode(String),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
