use std::io::{ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use drs4rc_frame::{FrameConfig, FrameError, ReplyReader, RequestWriter};
use drs4rc_transport::RcStream;
use tracing::{debug, warn};

use crate::error::{ClientError, ReplyError, Result};
use crate::opcode::{Opcode, ResetTarget, SpectrumKind};
use crate::poll::{poll_until, PollConfig};
use crate::reply::{
    decode_server_version_data, decode_spectrum_data, parse_field, ReplyEnvelope, ServerVersion,
    Spectrum, Validity,
};

/// Request id the server echoes when it could not parse the request.
const UNPARSED_REQUEST_ID: i32 = -1;

/// Configuration for a remote-control session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timeout for establishing the TCP connection.
    pub connect_timeout: Duration,
    /// Reply size limit and socket read/write timeouts.
    pub frame: FrameConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            frame: FrameConfig {
                read_timeout: Some(Duration::from_secs(10)),
                write_timeout: Some(Duration::from_secs(10)),
                ..FrameConfig::default()
            },
        }
    }
}

/// A client session with one measurement server.
///
/// Every exchange sends one request and blocks until its reply has been fully
/// received; the protocol cannot pipeline, so exchanges take `&mut self`.
/// The connection closes when the session is dropped.
///
/// A round trip that fails partway (timeout, I/O error, oversized or closed
/// reply) leaves the stream at an unknown position. The session is then
/// broken: every later exchange fails with [`ClientError::SessionBroken`]
/// instead of picking up the remains of the failed reply.
pub struct Session<R = RcStream, W = RcStream> {
    reader: ReplyReader<R>,
    writer: RequestWriter<W>,
    broken: Option<String>,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Build a session from an already connected reader/writer pair.
    pub fn from_parts(reader: ReplyReader<R>, writer: RequestWriter<W>) -> Self {
        Self {
            reader,
            writer,
            broken: None,
        }
    }

    /// Send `opcode` and return the reply body.
    ///
    /// Fails with [`ClientError::UnexpectedReply`] when the reply echoes a
    /// different request.
    pub fn exchange(&mut self, opcode: Opcode) -> Result<String> {
        let reply = self.round_trip(opcode)?;
        let envelope = ReplyEnvelope::parse(&reply)?;
        self.check_echo(opcode, &envelope)?;
        Ok(reply)
    }

    /// Whether an earlier failure has made the session unusable.
    pub fn is_broken(&self) -> bool {
        self.broken.is_some()
    }

    /// Start the acquisition (opcode 0). The server also acknowledges when it
    /// is already running.
    pub fn start_acquisition(&mut self) -> Result<Validity> {
        self.request(Opcode::StartAcquisition, |reply| Ok(reply.validity))
    }

    /// Stop the acquisition (opcode 1).
    pub fn stop_acquisition(&mut self) -> Result<Validity> {
        self.request(Opcode::StopAcquisition, |reply| Ok(reply.validity))
    }

    /// Whether the acquisition is running (opcode 2). `false` if the server
    /// rejects the request.
    pub fn is_acquisition_running(&mut self) -> Result<bool> {
        self.request(Opcode::IsAcquisitionRunning, |reply| {
            let flag: i64 = parse_field("reply-data", reply.data_or("0"))?;
            Ok(flag != 0)
        })
    }

    /// Reset one or all spectra (opcodes 3-7).
    pub fn reset(&mut self, target: ResetTarget) -> Result<Validity> {
        self.request(Opcode::reset(target), |reply| Ok(reply.validity))
    }

    /// Reset all four spectra (opcode 3).
    pub fn reset_all_spectra(&mut self) -> Result<Validity> {
        self.reset(ResetTarget::All)
    }

    /// Integral counts of a spectrum (opcodes 12-15). `0` if the server
    /// rejects the request.
    pub fn counts(&mut self, kind: SpectrumKind) -> Result<u64> {
        self.request(Opcode::counts(kind), |reply| {
            parse_field("reply-data", reply.data_or("0"))
        })
    }

    /// Full histogram of a spectrum (opcodes 8-11). An all-zero spectrum if
    /// the server rejects the request.
    pub fn spectrum(&mut self, kind: SpectrumKind) -> Result<Spectrum> {
        self.request(Opcode::data(kind), |reply| {
            Ok(reply
                .data
                .map(decode_spectrum_data)
                .transpose()?
                .unwrap_or_default())
        })
    }

    /// The server's settings document (opcode 16), returned verbatim.
    pub fn settings(&mut self) -> Result<Option<String>> {
        self.request(Opcode::Settings, |reply| Ok(reply.data.map(str::to_string)))
    }

    /// The server software version (opcode 17).
    pub fn server_version(&mut self) -> Result<Option<ServerVersion>> {
        self.request(Opcode::ServerVersion, |reply| {
            reply.data.map(decode_server_version_data).transpose()
        })
    }

    /// Poll the counts of `kind` until they reach `threshold`.
    ///
    /// Returns the counts seen on the first probe at or above the threshold,
    /// or [`ClientError::Timeout`] once `poll.deadline` passes.
    pub fn wait_for_counts(
        &mut self,
        kind: SpectrumKind,
        threshold: u64,
        poll: &PollConfig,
    ) -> Result<u64> {
        poll_until(poll, || {
            let counts = self.counts(kind)?;
            debug!(spectrum = %kind, counts, threshold, "polled counts");
            Ok((counts >= threshold).then_some(counts))
        })
    }

    /// Borrow the reply reader.
    pub fn reader(&self) -> &ReplyReader<R> {
        &self.reader
    }

    /// Borrow the request writer.
    pub fn writer(&self) -> &RequestWriter<W> {
        &self.writer
    }

    /// Split the session back into its reader and writer.
    pub fn into_parts(self) -> (ReplyReader<R>, RequestWriter<W>) {
        (self.reader, self.writer)
    }

    fn request<T>(
        &mut self,
        opcode: Opcode,
        decode: impl FnOnce(ReplyEnvelope<'_>) -> std::result::Result<T, ReplyError>,
    ) -> Result<T> {
        let reply = self.round_trip(opcode)?;
        let envelope = ReplyEnvelope::parse(&reply)?;
        self.check_echo(opcode, &envelope)?;
        Ok(decode(envelope)?)
    }

    fn round_trip(&mut self, opcode: Opcode) -> Result<String> {
        if let Some(cause) = &self.broken {
            return Err(ClientError::SessionBroken(cause.clone()));
        }

        let write_timeout = self.writer.config().write_timeout;
        if let Err(err) = self.writer.send(opcode.code()) {
            return Err(self.fail(opcode, frame_error(err, write_timeout)));
        }

        let read_timeout = self.reader.config().read_timeout;
        match self.reader.read_reply() {
            Ok(reply) => {
                debug!(opcode = opcode.code(), size = reply.len(), "reply received");
                Ok(reply)
            }
            Err(err) => Err(self.fail(opcode, frame_error(err, read_timeout))),
        }
    }

    fn check_echo(&mut self, opcode: Opcode, reply: &ReplyEnvelope<'_>) -> Result<()> {
        match reply.request_id {
            Some(UNPARSED_REQUEST_ID) => {
                warn!(opcode = opcode.code(), "server could not parse the request");
                Ok(())
            }
            Some(echoed) if echoed != i32::from(opcode.code()) => Err(self.fail(
                opcode,
                ClientError::UnexpectedReply {
                    sent: opcode.code(),
                    echoed,
                },
            )),
            _ => Ok(()),
        }
    }

    fn fail(&mut self, opcode: Opcode, err: ClientError) -> ClientError {
        warn!(opcode = opcode.code(), error = %err, "exchange failed, session unusable");
        self.broken = Some(err.to_string());
        err
    }
}

impl Session<RcStream, RcStream> {
    /// Address of the measurement server.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.writer.get_ref().peer_addr()?)
    }

    /// Shut the connection down and drop the session.
    pub fn close(self) -> Result<()> {
        self.writer.get_ref().shutdown()?;
        debug!("remote-control session closed");
        Ok(())
    }
}

/// `WouldBlock`/`TimedOut` only mean a timeout when one is configured.
fn frame_error(err: FrameError, timeout: Option<Duration>) -> ClientError {
    match (err, timeout) {
        (FrameError::ConnectionClosed, _) => {
            ClientError::Disconnected("connection closed by server".to_string())
        }
        (FrameError::Io(io), Some(timeout))
            if io.kind() == ErrorKind::WouldBlock || io.kind() == ErrorKind::TimedOut =>
        {
            ClientError::Timeout(timeout)
        }
        (other, _) => ClientError::Frame(other),
    }
}
