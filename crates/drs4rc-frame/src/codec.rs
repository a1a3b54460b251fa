use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::tag::{REPLY, REQUEST};

/// Default maximum size of one buffered reply: 16 MiB.
pub const DEFAULT_MAX_REPLY: usize = 16 * 1024 * 1024;

/// Encode a request envelope.
///
/// Wire format (no length prefix, no trailing delimiter):
/// ```text
/// <request>{opcode}</request>
/// ```
pub fn encode_request(opcode: u16, dst: &mut BytesMut) {
    encode_tagged(REQUEST.open, &opcode.to_string(), REQUEST.close, dst);
}

/// Encode a reply envelope around an already formatted body.
pub fn encode_reply(body: &str, dst: &mut BytesMut) {
    encode_tagged(REPLY.open, body, REPLY.close, dst);
}

fn encode_tagged(open: &str, body: &str, close: &str, dst: &mut BytesMut) {
    dst.reserve(open.len() + body.len() + close.len());
    dst.put_slice(open.as_bytes());
    dst.put_slice(body.as_bytes());
    dst.put_slice(close.as_bytes());
}

/// Decode a reply frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain `</reply>` yet.
/// On success, consumes the frame bytes through the end marker and returns
/// the text between `<reply>` and `</reply>`.
pub fn decode_reply(src: &mut BytesMut, max_reply: usize) -> Result<Option<String>> {
    ReplyDecoder::new(max_reply).decode(src)
}

/// Decode a request frame from a buffer, returning its opcode.
///
/// Returns `Ok(None)` if the buffer doesn't contain `</request>` yet.
pub fn decode_request(src: &mut BytesMut) -> Result<Option<u16>> {
    let Some(end) = find_marker(src, REQUEST.close.as_bytes(), 0) else {
        return Ok(None);
    };
    let frame = src.split_to(end + REQUEST.close.len());
    let text = std::str::from_utf8(&frame).map_err(|_| FrameError::InvalidUtf8)?;
    let body = REQUEST.extract(text);
    body.trim()
        .parse()
        .map(Some)
        .map_err(|_| FrameError::InvalidOpcode(body.to_string()))
}

/// Incremental reply decoder.
///
/// Remembers how far the buffer has already been searched so that a reply
/// trickling in over many reads is scanned once, not once per read.
#[derive(Debug, Clone)]
pub struct ReplyDecoder {
    scanned: usize,
    max_reply: usize,
}

impl ReplyDecoder {
    /// Create a decoder that rejects replies larger than `max_reply` bytes.
    pub fn new(max_reply: usize) -> Self {
        Self {
            scanned: 0,
            max_reply,
        }
    }

    /// Update the maximum reply size for subsequent decoding.
    pub fn set_max_reply(&mut self, max_reply: usize) {
        self.max_reply = max_reply;
    }

    /// Try to take one complete reply off the front of `src`.
    pub fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>> {
        let marker = REPLY.close.as_bytes();

        // The marker may straddle the previously scanned region.
        let from = self.scanned.saturating_sub(marker.len() - 1);
        let Some(end) = find_marker(src, marker, from) else {
            if src.len() > self.max_reply {
                return Err(FrameError::ReplyTooLarge {
                    size: src.len(),
                    max: self.max_reply,
                });
            }
            self.scanned = src.len();
            return Ok(None);
        };

        let frame_len = end + marker.len();
        if frame_len > self.max_reply {
            return Err(FrameError::ReplyTooLarge {
                size: frame_len,
                max: self.max_reply,
            });
        }

        self.scanned = 0;
        let frame = src.split_to(frame_len);
        let text = String::from_utf8(frame.to_vec()).map_err(|_| FrameError::InvalidUtf8)?;
        Ok(Some(REPLY.extract(&text).to_string()))
    }
}

fn find_marker(haystack: &[u8], marker: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(marker.len())
        .position(|window| window == marker)
        .map(|pos| from + pos)
}

/// Configuration for reply framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum buffered reply size in bytes. Default: 16 MiB.
    pub max_reply_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_reply_size: DEFAULT_MAX_REPLY,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
