//! Remote-control client for DRS4 lifetime spectrometer servers.
//!
//! This is the "just works" layer. Connect to a server, start and stop the
//! acquisition, reset spectra, and fetch counts or full histograms. Replies
//! flagged as not valid by the server come back as default values rather
//! than errors.

pub mod connector;
pub mod error;
pub mod opcode;
pub mod poll;
pub mod reply;
pub mod session;

pub use connector::{connect, connect_with_config};
pub use error::{ClientError, ReplyError, Result};
pub use opcode::{Opcode, ResetTarget, SpectrumKind};
pub use poll::{poll_until, PollConfig};
pub use reply::{
    decode_integer_sequence, decode_scalar_reply, decode_server_version, decode_spectrum_reply,
    is_reply_valid, request_id, ReplyEnvelope, ServerVersion, Spectrum, Validity,
    MIN_VALID_REPLY_LEN,
};
pub use session::{Session, SessionConfig};
