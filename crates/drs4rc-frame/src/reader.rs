use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use drs4rc_transport::RcStream;
use tracing::trace;

use crate::codec::{FrameConfig, ReplyDecoder};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete reply frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete replies,
/// however the server's output was split across TCP segments.
pub struct ReplyReader<T> {
    inner: T,
    buf: BytesMut,
    decoder: ReplyDecoder,
    config: FrameConfig,
}

impl<T: Read> ReplyReader<T> {
    /// Create a new reply reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new reply reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: ReplyDecoder::new(config.max_reply_size),
            config,
        }
    }

    /// Read the next complete reply (blocking) and return its body, the text
    /// between `<reply>` and `</reply>`.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached first.
    pub fn read_reply(&mut self) -> Result<String> {
        loop {
            if let Some(body) = self.decoder.decode(&mut self.buf)? {
                return Ok(body);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            trace!(read, buffered = self.buf.len() + read, "reply chunk");
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Number of bytes received but not yet consumed by a reply.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum reply size for subsequent decoding.
    pub fn set_max_reply_size(&mut self, max_reply_size: usize) {
        self.config.max_reply_size = max_reply_size;
        self.decoder.set_max_reply(max_reply_size);
    }

    /// Current reply reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl ReplyReader<RcStream> {
    /// Create a reply reader for `RcStream` and apply read timeout from config.
    pub fn with_config_rc(inner: RcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: drs4rc_transport::TransportError) -> FrameError {
    match err {
        drs4rc_transport::TransportError::Io(io) => FrameError::Io(io),
        drs4rc_transport::TransportError::Resolve { source, .. }
        | drs4rc_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Write};
    use std::net::{TcpListener, TcpStream};
    use std::time::Duration;

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_reply;

    const VALID_SPECTRUM: &str = "<request-valid?>1</request-valid?><reply-data>\
        <channel-width-ps>25.0</channel-width-ps><number-of-channel>3</number-of-channel>\
        <integral-counts>15</integral-counts><data>{1}{2}{3}</data></reply-data>";

    fn wire(bodies: &[&str]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        for body in bodies {
            encode_reply(body, &mut wire);
        }
        wire.to_vec()
    }

    #[test]
    fn read_single_reply() {
        let mut reader = ReplyReader::new(Cursor::new(wire(&["42"])));
        assert_eq!(reader.read_reply().unwrap(), "42");
    }

    #[test]
    fn read_multiple_replies() {
        let mut reader = ReplyReader::new(Cursor::new(wire(&["one", "two", "three"])));

        assert_eq!(reader.read_reply().unwrap(), "one");
        assert_eq!(reader.read_reply().unwrap(), "two");
        assert_eq!(reader.read_reply().unwrap(), "three");
        assert_eq!(reader.buffered(), 0);
    }

    #[test]
    fn read_reply_with_large_histogram() {
        let data: String = (0..20_000).map(|v| format!("{{{v}}}")).collect();
        let body = format!(
            "<request-valid?>1</request-valid?><reply-data><data>{data}</data></reply-data>"
        );

        let mut reader = ReplyReader::new(Cursor::new(wire(&[&body])));
        assert_eq!(reader.read_reply().unwrap(), body);
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ChunkedReader::new(wire(&[VALID_SPECTRUM]), 1);
        let mut reader = ReplyReader::new(byte_reader);

        assert_eq!(reader.read_reply().unwrap(), VALID_SPECTRUM);
    }

    #[test]
    fn reply_split_across_two_reads_matches_whole() {
        let whole = format!("<reply>{VALID_SPECTRUM}</reply>");
        let split_at = "<reply><request-valid?>1<".len();
        let split = SplitReader {
            parts: vec![
                whole.as_bytes()[..split_at].to_vec(),
                whole.as_bytes()[split_at..].to_vec(),
            ],
        };

        let mut split_reader = ReplyReader::new(split);
        let mut whole_reader = ReplyReader::new(Cursor::new(whole.into_bytes()));

        assert_eq!(
            split_reader.read_reply().unwrap(),
            whole_reader.read_reply().unwrap()
        );
    }

    #[test]
    fn end_marker_split_across_small_chunks() {
        // Chunks of three put the marker boundary inside "</r", "epl", "y>".
        let bytes = b"<reply>7</reply>".to_vec();
        let mut reader = ReplyReader::new(ChunkedReader::new(bytes, 3));
        assert_eq!(reader.read_reply().unwrap(), "7");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = ReplyReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_reply().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let partial = b"<reply><request-valid?>1</request-valid?>".to_vec();
        let mut reader = ReplyReader::new(Cursor::new(partial));
        let err = reader.read_reply().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn oversized_reply_in_stream() {
        let cfg = FrameConfig {
            max_reply_size: 16,
            ..FrameConfig::default()
        };
        let body = "x".repeat(64);
        let mut reader = ReplyReader::with_config(Cursor::new(wire(&[&body])), cfg);
        let err = reader.read_reply().unwrap_err();
        assert!(matches!(err, FrameError::ReplyTooLarge { .. }));
    }

    #[test]
    fn accessors_and_into_inner() {
        let cursor = Cursor::new(Vec::<u8>::new());
        let mut reader = ReplyReader::new(cursor);
        reader.set_max_reply_size(32);
        assert_eq!(reader.config().max_reply_size, 32);

        let _ = reader.get_ref();
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = FailOnceThenData::new(ErrorKind::WouldBlock, wire(&["ok"]));
        let mut framed = ReplyReader::new(reader);
        let err = framed.read_reply().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = FailOnceThenData::new(ErrorKind::Interrupted, wire(&["ok"]));
        let mut framed = ReplyReader::new(reader);
        assert_eq!(framed.read_reply().unwrap(), "ok");
    }

    #[test]
    fn roundtrip_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .write_all(&wire(&["<request-valid?>1</request-valid?>"]))
                .unwrap();
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut reader = ReplyReader::new(stream);
        assert_eq!(
            reader.read_reply().unwrap(),
            "<request-valid?>1</request-valid?>"
        );

        server.join().unwrap();
    }

    #[test]
    fn read_timeout_for_rc_stream_surfaces_as_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let stream = drs4rc_transport::connect(&addr).unwrap();
        let (_silent_server, _) = listener.accept().unwrap();

        let cfg = FrameConfig {
            read_timeout: Some(Duration::from_millis(20)),
            ..FrameConfig::default()
        };
        let mut reader = ReplyReader::with_config_rc(stream, cfg).unwrap();
        let err = reader.read_reply().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Io(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
    }

    struct ChunkedReader {
        bytes: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl ChunkedReader {
        fn new(bytes: Vec<u8>, chunk: usize) -> Self {
            Self {
                bytes,
                pos: 0,
                chunk,
            }
        }
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len()).min(self.chunk);
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct SplitReader {
        parts: Vec<Vec<u8>>,
    }

    impl Read for SplitReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.parts.is_empty() {
                return Ok(0);
            }
            let part = self.parts.remove(0);
            buf[..part.len()].copy_from_slice(&part);
            Ok(part.len())
        }
    }

    struct FailOnceThenData {
        kind: Option<ErrorKind>,
        inner: Cursor<Vec<u8>>,
    }

    impl FailOnceThenData {
        fn new(kind: ErrorKind, bytes: Vec<u8>) -> Self {
            Self {
                kind: Some(kind),
                inner: Cursor::new(bytes),
            }
        }
    }

    impl Read for FailOnceThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.kind.take() {
                return Err(std::io::Error::from(kind));
            }
            self.inner.read(buf)
        }
    }
}
