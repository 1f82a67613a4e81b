use std::time::Duration;

/// Baud rate of the power supply's USB serial bridge.
pub const SERIAL_BAUD_RATE: u32 = 115_200;

/// Read timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// TCP port the power supply listens on for control frames.
pub const LAN_CONTROL_PORT: u16 = 10001;

/// UDP port used for LAN discovery broadcasts.
pub const DISCOVERY_PORT: u16 = 30718;

/// Datagram broadcast to find power supplies on the LAN.
pub const DISCOVERY_PROBE: [u8; 4] = [0x00, 0x00, 0x00, 0xF6];

/// Prefix of a discovery reply datagram.
pub const DISCOVERY_REPLY_PREFIX: [u8; 4] = [0x00, 0x00, 0x00, 0xF7];

/// Timeouts applied when a link is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Read timeout for blocking reads. Default: 1 second.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking writes.
    pub write_timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_timeout: Some(DEFAULT_TIMEOUT),
            write_timeout: None,
        }
    }
}
