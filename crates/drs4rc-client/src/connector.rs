use drs4rc_frame::{ReplyReader, RequestWriter};
use drs4rc_transport::connect_timeout;
use tracing::info;

use crate::error::Result;
use crate::session::{Session, SessionConfig};

/// Connect to a measurement server with default timeouts.
pub fn connect(addr: &str) -> Result<Session> {
    connect_with_config(addr, &SessionConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(addr: &str, config: &SessionConfig) -> Result<Session> {
    let stream = connect_timeout(addr, config.connect_timeout)?;
    let reader_stream = stream.try_clone()?;

    let reader = ReplyReader::with_config_rc(reader_stream, config.frame.clone())?;
    let writer = RequestWriter::with_config_rc(stream, config.frame.clone())?;
    info!(addr, "remote-control session established");

    Ok(Session::from_parts(reader, writer))
}
