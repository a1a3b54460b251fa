//! Tag markers and the substring extractor the protocol is built on.
//!
//! Every protocol element is an XML-looking `<name>…</name>` pair, but the
//! server's format is not XML: there is no escaping and no nesting rule, and
//! peers locate fields purely by the first occurrence of each marker.

/// A start/end marker pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Opening marker, e.g. `<reply>`.
    pub open: &'static str,
    /// Closing marker, e.g. `</reply>`.
    pub close: &'static str,
}

impl Tag {
    /// Substring between this tag's markers (see [`extract_between`]).
    pub fn extract<'a>(&self, text: &'a str) -> &'a str {
        extract_between(text, self.open, self.close)
    }

    /// Whether both markers occur somewhere in `text`.
    pub fn is_present_in(&self, text: &str) -> bool {
        text.contains(self.open) && text.contains(self.close)
    }

    /// Combined character length of both markers.
    pub fn marker_len(&self) -> usize {
        self.open.chars().count() + self.close.chars().count()
    }

    /// Wrap `body` in this tag's markers.
    pub fn wrap(&self, body: &str) -> String {
        format!("{}{}{}", self.open, body, self.close)
    }
}

/// Request envelope sent by the client.
pub const REQUEST: Tag = Tag {
    open: "<request>",
    close: "</request>",
};

/// Reply envelope sent by the server.
pub const REPLY: Tag = Tag {
    open: "<reply>",
    close: "</reply>",
};

/// Opcode echoed back by the server (`-1` if the request was unparseable).
pub const REQUEST_ID: Tag = Tag {
    open: "<request-id>",
    close: "</request-id>",
};

/// Validity flag: `1` when the server executed the request.
pub const REQUEST_VALID: Tag = Tag {
    open: "<request-valid?>",
    close: "</request-valid?>",
};

/// Payload region of a valid reply.
pub const REPLY_DATA: Tag = Tag {
    open: "<reply-data>",
    close: "</reply-data>",
};

/// Histogram bin width in picoseconds.
pub const CHANNEL_WIDTH_PS: Tag = Tag {
    open: "<channel-width-ps>",
    close: "</channel-width-ps>",
};

/// Number of histogram channels.
pub const NUMBER_OF_CHANNEL: Tag = Tag {
    open: "<number-of-channel>",
    close: "</number-of-channel>",
};

/// Total counts in the spectrum.
pub const INTEGRAL_COUNTS: Tag = Tag {
    open: "<integral-counts>",
    close: "</integral-counts>",
};

/// Brace-delimited histogram values.
pub const DATA: Tag = Tag {
    open: "<data>",
    close: "</data>",
};

/// Server major version.
pub const MAJOR: Tag = Tag {
    open: "<major>",
    close: "</major>",
};

/// Server minor version.
pub const MINOR: Tag = Tag {
    open: "<minor>",
    close: "</minor>",
};

/// Return the substring after the first `start` and before the first `end`.
///
/// Missing markers are not errors. The fallback positions are the ones every
/// existing peer of this protocol uses, and are kept as-is for compatibility:
///
/// - `start` missing: the start position is 0, so the result still skips the
///   first `start.len()` characters of `text`.
/// - `end` missing: the end position is the last character, which is excluded.
/// - start position plus marker length at or past the end: the start position
///   is reset to 0, again skipping `start.len()` characters rather than
///   restarting cleanly. The result is empty when that still reaches the end.
///
/// Positions count characters, so multi-byte text never splits a code point.
pub fn extract_between<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    let end_index = match text.find(end) {
        Some(index) => index,
        None => last_char_index(text),
    };

    // NOTE: a missing start marker still skips `start`'s length worth of
    // characters. Looks like a defect; peers depend on it.
    let from = match text.find(start) {
        Some(index) if index + start.len() < end_index => index + start.len(),
        _ => skip_chars(text, start.chars().count()),
    };

    if from >= end_index {
        return "";
    }
    &text[from..end_index]
}

fn last_char_index(text: &str) -> usize {
    text.char_indices().next_back().map_or(0, |(index, _)| index)
}

/// Byte offset after the first `count` characters of `text`.
fn skip_chars(text: &str, count: usize) -> usize {
    text.char_indices()
        .nth(count)
        .map_or(text.len(), |(index, _)| index)
}
