//! Byte-stream links to probe power supplies.
//!
//! Provides one contract over two physical links:
//! - USB serial ports (115200 baud, no flow control)
//! - Raw TCP sockets on the LAN control port
//!
//! This is the lowest layer of probelink. Connections open lazily on the
//! first read or write, and reads always return the exact number of bytes
//! requested.

pub mod config;
pub mod error;
pub mod serial;
pub mod stream;
pub mod tcp;
pub mod traits;

pub use config::{
    TransportConfig, DEFAULT_TIMEOUT, DISCOVERY_PORT, DISCOVERY_PROBE, DISCOVERY_REPLY_PREFIX,
    LAN_CONTROL_PORT, SERIAL_BAUD_RATE,
};
pub use error::{Result, TransportError};
pub use serial::{SerialConnector, SerialTransport};
pub use stream::{LinkState, StreamTransport};
pub use tcp::{LanTransport, TcpConnector};
pub use traits::{Connector, Transport};
