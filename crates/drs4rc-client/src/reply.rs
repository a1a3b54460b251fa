//! Reply body decoding.
//!
//! A reply body (the text between `<reply>` and `</reply>`) carries the echoed
//! request id, a validity flag and, for valid replies, a `<reply-data>` region:
//!
//! ```text
//! <request-id>8</request-id><request-valid?>1</request-valid?>
//! <reply-data><channel-width-ps>25</channel-width-ps><number-of-channel>3</number-of-channel>
//! <integral-counts>15</integral-counts><data>{1}{2}{3}</data></reply-data>
//! ```
//!
//! A reply flagged as not valid decodes to a default value, never an error.

use std::str::FromStr;

use drs4rc_frame::tag::{
    CHANNEL_WIDTH_PS, DATA, INTEGRAL_COUNTS, MAJOR, MINOR, NUMBER_OF_CHANNEL, REPLY_DATA,
    REQUEST_ID, REQUEST_VALID,
};
use serde::Serialize;

use crate::error::ReplyError;

/// Shortest body that can hold both validity markers and a flag digit.
pub const MIN_VALID_REPLY_LEN: usize = 34;

/// Whether the server executed a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Validity {
    Valid,
    Invalid,
}

impl Validity {
    /// Integer-as-boolean wire flag: zero is invalid, anything else valid.
    pub fn from_flag(flag: i64) -> Self {
        if flag != 0 {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }

    /// Wire representation.
    pub fn as_flag(self) -> i64 {
        match self {
            Validity::Valid => 1,
            Validity::Invalid => 0,
        }
    }

    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
}

impl From<Validity> for bool {
    fn from(validity: Validity) -> Self {
        validity.is_valid()
    }
}

/// A decoded spectrum.
///
/// The all-zero default is what an invalid data reply decodes to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spectrum {
    /// Time width of one channel in picoseconds.
    pub channel_width_ps: f64,
    /// Number of channels the server reports.
    pub channel_count: u64,
    /// Total counts the server reports.
    pub integral_counts: u64,
    /// Counts per channel, channel 0 first.
    pub histogram: Vec<u64>,
}

impl Spectrum {
    /// True for the default value returned for invalid replies.
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty() && self.channel_count == 0 && self.integral_counts == 0
    }

    /// Left edge of each channel in picoseconds.
    pub fn time_axis_ps(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.histogram.len()).map(|i| i as f64 * self.channel_width_ps)
    }

    /// Channel holding the most counts, if any.
    pub fn peak_channel(&self) -> Option<usize> {
        self.histogram
            .iter()
            .enumerate()
            .max_by_key(|(_, counts)| **counts)
            .map(|(channel, _)| channel)
    }
}

/// Server software version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// All envelope fields of one reply body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyEnvelope<'a> {
    /// Opcode echoed by the server; `-1` when it could not parse the request.
    pub request_id: Option<i32>,
    pub validity: Validity,
    /// `<reply-data>` region, present for valid replies.
    pub data: Option<&'a str>,
}

impl<'a> ReplyEnvelope<'a> {
    pub fn parse(reply: &'a str) -> Result<Self, ReplyError> {
        let validity = is_reply_valid(reply)?;
        Ok(Self {
            request_id: request_id(reply)?,
            validity,
            data: validity.is_valid().then(|| REPLY_DATA.extract(reply)),
        })
    }

    /// `<reply-data>` text of a valid reply, or `default`.
    pub fn data_or(&self, default: &'a str) -> &'a str {
        self.data.unwrap_or(default)
    }
}

/// Read the validity flag of a reply body.
///
/// Too-short bodies and bodies missing either `<request-valid?>` marker are
/// [`Validity::Invalid`]. A flag that isn't an integer is an error.
pub fn is_reply_valid(reply: &str) -> Result<Validity, ReplyError> {
    if reply.chars().count() < MIN_VALID_REPLY_LEN || !REQUEST_VALID.is_present_in(reply) {
        return Ok(Validity::Invalid);
    }
    let flag = parse_field("request-valid?", REQUEST_VALID.extract(reply))?;
    Ok(Validity::from_flag(flag))
}

/// Echoed request id, if the reply carries one.
pub fn request_id(reply: &str) -> Result<Option<i32>, ReplyError> {
    if !REQUEST_ID.is_present_in(reply) {
        return Ok(None);
    }
    parse_field("request-id", REQUEST_ID.extract(reply)).map(Some)
}

/// Decode `{v0}{v1}…` into integers, left to right.
///
/// Text outside braces is skipped. Groups must not nest.
pub fn decode_integer_sequence(text: &str) -> Result<Vec<u64>, ReplyError> {
    let mut values = Vec::new();
    let mut offset = 0usize;

    while let Some(open) = text[offset..].find('{') {
        let start = offset + open + 1;
        let Some(len) = text[start..].find('}') else {
            return Err(ReplyError::UnterminatedGroup {
                offset: offset + open,
            });
        };
        values.push(parse_field("data", &text[start..start + len])?);
        offset = start + len + 1;
    }

    Ok(values)
}

/// Decode a spectrum data reply (opcodes 8-11).
///
/// An invalid reply yields [`Spectrum::default`].
pub fn decode_spectrum_reply(reply: &str) -> Result<Spectrum, ReplyError> {
    if !is_reply_valid(reply)?.is_valid() {
        return Ok(Spectrum::default());
    }

    decode_spectrum_data(REPLY_DATA.extract(reply))
}

/// Decode the `<reply-data>` region of a valid spectrum reply.
pub fn decode_spectrum_data(data: &str) -> Result<Spectrum, ReplyError> {
    Ok(Spectrum {
        channel_width_ps: parse_field("channel-width-ps", CHANNEL_WIDTH_PS.extract(data))?,
        channel_count: parse_field("number-of-channel", NUMBER_OF_CHANNEL.extract(data))?,
        integral_counts: parse_field("integral-counts", INTEGRAL_COUNTS.extract(data))?,
        histogram: decode_integer_sequence(DATA.extract(data))?,
    })
}

/// Return the raw `<reply-data>` text of a valid reply, or `default`.
pub fn decode_scalar_reply<'a>(reply: &'a str, default: &'a str) -> Result<&'a str, ReplyError> {
    if is_reply_valid(reply)?.is_valid() {
        Ok(REPLY_DATA.extract(reply))
    } else {
        Ok(default)
    }
}

/// Decode a server version reply (opcode 17). Invalid replies yield `None`.
pub fn decode_server_version(reply: &str) -> Result<Option<ServerVersion>, ReplyError> {
    if !is_reply_valid(reply)?.is_valid() {
        return Ok(None);
    }
    decode_server_version_data(REPLY_DATA.extract(reply)).map(Some)
}

/// Decode the `<reply-data>` region of a valid server version reply.
pub fn decode_server_version_data(data: &str) -> Result<ServerVersion, ReplyError> {
    Ok(ServerVersion {
        major: parse_field("major", MAJOR.extract(data))?,
        minor: parse_field("minor", MINOR.extract(data))?,
    })
}

/// Parse a numeric field, tolerating surrounding whitespace.
pub fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T, ReplyError> {
    raw.trim()
        .parse()
        .map_err(|_| ReplyError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_SPECTRUM: &str = "<request-valid?>1</request-valid?><reply-data>\
        <channel-width-ps>25.0</channel-width-ps><number-of-channel>3</number-of-channel>\
        <integral-counts>15</integral-counts><data>{1}{2}{3}</data></reply-data>";

    #[test]
    fn integer_sequence_in_order() {
        assert_eq!(decode_integer_sequence("{5}{10}{0}").unwrap(), vec![5, 10, 0]);
    }

    #[test]
    fn empty_integer_sequence() {
        assert!(decode_integer_sequence("").unwrap().is_empty());
        assert!(decode_integer_sequence("no groups").unwrap().is_empty());
    }

    #[test]
    fn integer_sequence_skips_text_between_groups() {
        assert_eq!(decode_integer_sequence(" {7} ,{ 8 }\n").unwrap(), vec![7, 8]);
    }

    #[test]
    fn unterminated_group_is_error() {
        assert_eq!(
            decode_integer_sequence("{1}{2"),
            Err(ReplyError::UnterminatedGroup { offset: 3 })
        );
    }

    #[test]
    fn non_numeric_group_is_error() {
        assert!(matches!(
            decode_integer_sequence("{1}{x}"),
            Err(ReplyError::InvalidNumber { field: "data", .. })
        ));
        assert!(decode_integer_sequence("{}").is_err());
    }

    #[test]
    fn short_reply_is_invalid() {
        let short = "<request-valid?>1";
        assert!(short.len() < MIN_VALID_REPLY_LEN);
        assert_eq!(is_reply_valid(short).unwrap(), Validity::Invalid);
        assert_eq!(is_reply_valid("").unwrap(), Validity::Invalid);
        // Exactly the markers, no flag digit.
        assert_eq!(
            is_reply_valid("<request-valid?></request-valid?>").unwrap(),
            Validity::Invalid
        );
    }

    #[test]
    fn missing_marker_is_invalid() {
        let padded = format!("<request-valid?>1{}", " ".repeat(40));
        assert_eq!(is_reply_valid(&padded).unwrap(), Validity::Invalid);
    }

    #[test]
    fn validity_flag_uses_integer_truthiness() {
        let body = |flag: &str| format!("<request-valid?>{flag}</request-valid?>");
        assert_eq!(is_reply_valid(&body("1")).unwrap(), Validity::Valid);
        assert_eq!(is_reply_valid(&body("0")).unwrap(), Validity::Invalid);
        assert_eq!(is_reply_valid(&body("2")).unwrap(), Validity::Valid);
        assert_eq!(is_reply_valid(&body("-1")).unwrap(), Validity::Valid);
        assert!(matches!(
            is_reply_valid(&body("yes")),
            Err(ReplyError::InvalidNumber { field: "request-valid?", .. })
        ));
    }

    #[test]
    fn decodes_valid_spectrum() {
        let spectrum = decode_spectrum_reply(VALID_SPECTRUM).unwrap();
        assert_eq!(spectrum.histogram, vec![1, 2, 3]);
        assert_eq!(spectrum.integral_counts, 15);
        assert_eq!(spectrum.channel_count, 3);
        assert_eq!(spectrum.channel_width_ps, 25.0);
        assert_eq!(spectrum.peak_channel(), Some(2));
        assert_eq!(
            spectrum.time_axis_ps().collect::<Vec<_>>(),
            vec![0.0, 25.0, 50.0]
        );
    }

    #[test]
    fn invalid_spectrum_reply_is_default() {
        let spectrum = decode_spectrum_reply("<request-valid?>0</request-valid?>").unwrap();
        assert_eq!(spectrum, Spectrum::default());
        assert!(spectrum.is_empty());
        assert_eq!(spectrum.channel_width_ps, 0.0);
    }

    #[test]
    fn spectrum_with_bad_width_names_field() {
        let reply = VALID_SPECTRUM.replace("25.0", "wide");
        assert_eq!(
            decode_spectrum_reply(&reply),
            Err(ReplyError::InvalidNumber {
                field: "channel-width-ps",
                value: "wide".to_string(),
            })
        );
    }

    #[test]
    fn spectrum_with_server_formatted_width() {
        let reply = VALID_SPECTRUM.replace("25.0", "24.4141");
        let spectrum = decode_spectrum_reply(&reply).unwrap();
        assert!((spectrum.channel_width_ps - 24.4141).abs() < 1e-9);
    }

    #[test]
    fn scalar_reply_valid_and_default() {
        let valid = "<request-id>12</request-id><request-valid?>1</request-valid?><reply-data>1234</reply-data>";
        assert_eq!(decode_scalar_reply(valid, "0").unwrap(), "1234");

        let invalid = "<request-id>-1</request-id><request-valid?>0</request-valid?><reply-data></reply-data>";
        assert_eq!(decode_scalar_reply(invalid, "0").unwrap(), "0");
    }

    #[test]
    fn envelope_exposes_all_fields() {
        let reply = "<request-id>2</request-id><request-valid?>1</request-valid?><reply-data>1</reply-data>";
        let envelope = ReplyEnvelope::parse(reply).unwrap();
        assert_eq!(envelope.request_id, Some(2));
        assert_eq!(envelope.validity, Validity::Valid);
        assert_eq!(envelope.data, Some("1"));

        let bare = ReplyEnvelope::parse("<request-valid?>0</request-valid?>").unwrap();
        assert_eq!(bare.request_id, None);
        assert_eq!(bare.data, None);
        assert_eq!(bare.data_or("0"), "0");
        assert_eq!(envelope.data_or("0"), "1");
    }

    #[test]
    fn server_version_reply() {
        let reply = "<request-valid?>1</request-valid?><reply-data><major>1</major><minor>18</minor></reply-data>";
        assert_eq!(
            decode_server_version(reply).unwrap(),
            Some(ServerVersion { major: 1, minor: 18 })
        );
        assert_eq!(
            decode_server_version("<request-valid?>0</request-valid?>").unwrap(),
            None
        );
    }

    #[test]
    fn validity_conversions() {
        assert_eq!(Validity::from_flag(Validity::Valid.as_flag()), Validity::Valid);
        assert_eq!(Validity::from_flag(Validity::Invalid.as_flag()), Validity::Invalid);
        assert!(bool::from(Validity::Valid));
    }
}
