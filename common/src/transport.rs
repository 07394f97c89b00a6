//! Short-lived outbound byte connections for the logging uplink.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("could not resolve {host}")]
    Resolve { host: String },

    #[error("connection to {host}:{port} failed")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("not connected")]
    NotConnected,

    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
}

/// A byte stream that is opened, written and closed once per use.
///
/// Implementations enforce their own connect and write timeouts; callers do
/// not add another timeout layer.
pub trait Transport {
    fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Releases the connection. Must be safe to call when nothing is open.
    fn close(&mut self);
}

/// Scope of one connection attempt: [`Transport::close`] runs exactly once
/// when the guard is dropped, whether `open` succeeded or not.
pub struct ScopedConnection<'a> {
    transport: &'a mut dyn Transport,
}

impl<'a> ScopedConnection<'a> {
    pub fn new(transport: &'a mut dyn Transport) -> Self {
        Self { transport }
    }

    pub fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        self.transport.open(host, port)
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.transport.write(bytes)
    }
}

impl Drop for ScopedConnection<'_> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// Plain TCP over `std::net`.
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<TcpStream>,
    timeout: Duration,
}

impl TcpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(timeout: Duration) -> Self {
        Self {
            stream: None,
            timeout,
        }
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

impl Transport for TcpTransport {
    fn open(&mut self, host: &str, port: u16) -> Result<(), TransportError> {
        let addrs = (host, port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve {
                host: host.to_string(),
            })?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream
                        .set_write_timeout(Some(self.timeout))
                        .and_then(|_| stream.set_read_timeout(Some(self.timeout)))
                        .map_err(|e| TransportError::Connect {
                            host: host.to_string(),
                            port,
                            source: Some(e),
                        })?;
                    self.stream = Some(stream);
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(TransportError::Connect {
            host: host.to_string(),
            port,
            source: last_error,
        })
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream.write_all(bytes).map_err(TransportError::Write)?;
        stream.flush().map_err(TransportError::Write)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    #[test]
    fn test_tcp_transport_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut transport = TcpTransport::default();
        {
            let mut conn = ScopedConnection::new(&mut transport);
            conn.open("127.0.0.1", port).unwrap();
            conn.write(b"hello").unwrap();
        }

        let (mut peer, _) = listener.accept().unwrap();
        let mut received = String::new();
        peer.read_to_string(&mut received).unwrap();
        assert_eq!(received, "hello");
    }

    #[test]
    fn test_write_without_open_fails() {
        let mut transport = TcpTransport::default();
        assert!(matches!(
            transport.write(b"x"),
            Err(TransportError::NotConnected)
        ));
        transport.close();
    }
}
