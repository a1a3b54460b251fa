//! Remote control for DRS4 lifetime spectrometer acquisition servers.
//!
//! The server speaks a small tag-delimited text protocol over TCP: the client
//! sends `<request>N</request>` and reads back a `<reply>...</reply>` document
//! carrying a validity flag and the requested data.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP connection with timeouts
//! - [`frame`]: tag extraction, request encoding and reply framing
//! - [`client`]: opcodes, reply decoding and the blocking session (behind the
//!   `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use drs4rc_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use drs4rc_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use drs4rc_client::*;
}
