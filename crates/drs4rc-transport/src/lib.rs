//! TCP transport for the lifetime-spectrometer remote-control protocol.
//!
//! The measurement server listens on a plain TCP port. This is the lowest
//! layer of drs4rc: it resolves the target, connects with a bounded timeout,
//! and hands out an [`RcStream`] that everything else builds on.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::RcStream;
pub use tcp::{connect, connect_timeout, DEFAULT_PORT};
