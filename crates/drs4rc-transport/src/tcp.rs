use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::RcStream;

/// Port the remote-control server listens on unless configured otherwise.
pub const DEFAULT_PORT: u16 = 4000;

/// Connect to a measurement server (blocking, OS connect timeout).
///
/// `addr` is anything `ToSocketAddrs` accepts as a string, e.g.
/// `"127.0.0.1:4000"` or `"lab-pc.local:4000"`.
pub fn connect(addr: &str) -> Result<RcStream> {
    let stream = TcpStream::connect(addr).map_err(|source| TransportError::Connect {
        addr: addr.to_string(),
        source,
    })?;
    finish_connect(addr, stream)
}

/// Connect to a measurement server, giving up on each resolved address after
/// `timeout`.
pub fn connect_timeout(addr: &str, timeout: Duration) -> Result<RcStream> {
    let candidates = addr
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            addr: addr.to_string(),
            source,
        })?;

    let mut last_err = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return finish_connect(addr, stream),
            Err(err) => {
                debug!(%candidate, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    match last_err {
        Some(source) => Err(TransportError::Connect {
            addr: addr.to_string(),
            source,
        }),
        None => Err(TransportError::NoAddress(addr.to_string())),
    }
}

fn finish_connect(addr: &str, stream: TcpStream) -> Result<RcStream> {
    // Requests are a few dozen bytes; don't let Nagle hold them back.
    stream.set_nodelay(true)?;
    debug!(addr, "connected to remote-control server");
    Ok(RcStream::from(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    #[test]
    fn test_connect_and_exchange_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let handle = std::thread::spawn(move || {
            let (mut server, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            server.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"hello");
        });

        let mut client = connect(&addr).unwrap();
        client.write_all(b"hello").unwrap();

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_timeout_succeeds_against_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let client = connect_timeout(&addr.to_string(), Duration::from_secs(2)).unwrap();
        assert_eq!(client.peer_addr().unwrap(), addr);
    }

    #[test]
    fn test_connect_refused() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };

        let result = connect_timeout(&addr, Duration::from_millis(500));
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }

    #[test]
    fn test_unresolvable_address() {
        let result = connect_timeout("missing-port", Duration::from_millis(100));
        assert!(matches!(result, Err(TransportError::Resolve { .. })));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let client = connect(&addr).unwrap();
        client.shutdown().unwrap();
        client.shutdown().unwrap();
    }
}
