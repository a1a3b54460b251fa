//! Tag-delimited text framing for the lifetime-spectrometer remote-control
//! protocol.
//!
//! Requests and replies are plain text with no length prefix and no checksum:
//! - requests are `<request>{opcode}</request>`, one per write
//! - replies are `<reply>…</reply>` and may arrive split across any number
//!   of reads; a reply is complete once `</reply>` has been received
//!
//! No partial reads, no buffer management in user code. Field lookup inside
//! a reply goes through [`extract_between`] and the [`tag`] constants.

pub mod codec;
pub mod error;
pub mod reader;
pub mod tag;
pub mod writer;

pub use codec::{
    decode_reply, decode_request, encode_reply, encode_request, FrameConfig, ReplyDecoder,
    DEFAULT_MAX_REPLY,
};
pub use error::{FrameError, Result};
pub use reader::ReplyReader;
pub use tag::{extract_between, Tag};
pub use writer::RequestWriter;
