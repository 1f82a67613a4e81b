use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use tracing::debug;

use crate::config::{TransportConfig, DEFAULT_TIMEOUT, LAN_CONTROL_PORT};
use crate::error::{Result, TransportError};
use crate::stream::StreamTransport;
use crate::traits::Connector;

/// A power supply reached over its LAN control port.
pub type LanTransport = StreamTransport<TcpConnector>;

/// Opens a raw TCP connection to a power supply.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    /// Connector for `host` on the fixed control port.
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_port(host, LAN_CONTROL_PORT)
    }

    pub fn with_port(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn resolve(&self) -> std::io::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "host did not resolve")
            })
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&mut self, config: &TransportConfig) -> Result<TcpStream> {
        let unavailable = |source| TransportError::Unavailable {
            endpoint: self.endpoint(),
            source,
        };
        let addr = self.resolve().map_err(unavailable)?;
        let timeout = config.read_timeout.unwrap_or(DEFAULT_TIMEOUT);
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(unavailable)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        stream.set_nodelay(true)?;
        debug!(%addr, "tcp link connected");
        Ok(stream)
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl LanTransport {
    /// LAN transport to `host` with the default one-second timeout.
    pub fn lan(host: impl Into<String>) -> Self {
        StreamTransport::new(TcpConnector::new(host))
    }
}
