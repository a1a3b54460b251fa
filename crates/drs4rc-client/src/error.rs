/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] drs4rc_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] drs4rc_frame::FrameError),

    /// The reply body could not be decoded.
    #[error("reply decode error: {0}")]
    Reply(#[from] ReplyError),

    /// The server closed the connection.
    #[error("server disconnected: {0}")]
    Disconnected(String),

    /// A reply or a polling condition did not arrive in time.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The reply echoes a different opcode than the one sent.
    #[error("reply to request {echoed} received for request {sent}")]
    UnexpectedReply { sent: u16, echoed: i32 },

    /// An earlier exchange failed partway; the stream position is unknown.
    #[error("session unusable after earlier failure: {0}")]
    SessionBroken(String),
}

impl ClientError {
    /// Whether this error is a read/write or polling timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

/// Errors produced while decoding a reply body.
///
/// A reply flagged as not valid is not an error; see
/// [`Validity`](crate::reply::Validity).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyError {
    /// A field that must be numeric did not parse.
    #[error("invalid number in <{field}>: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// A `{` in a data block has no closing `}`.
    #[error("unterminated '{{' group at offset {offset}")]
    UnterminatedGroup { offset: usize },
}

pub type Result<T> = std::result::Result<T, ClientError>;
