use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::debug;

use crate::config::{TransportConfig, DEFAULT_TIMEOUT, SERIAL_BAUD_RATE};
use crate::error::{Result, TransportError};
use crate::stream::StreamTransport;
use crate::traits::Connector;

/// A power supply reached through its USB serial port.
pub type SerialTransport = StreamTransport<SerialConnector>;

/// Opens a serial port at the power supply's fixed line settings.
///
/// 115200 baud, 8 data bits, no parity, one stop bit, no RTS/CTS or
/// DSR/DTR flow control.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: String,
    baud_rate: u32,
}

impl SerialConnector {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: SERIAL_BAUD_RATE,
        }
    }

    /// The device path or port name (e.g. `/dev/ttyUSB0`, `COM3`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Connector for SerialConnector {
    type Stream = Box<dyn SerialPort>;

    fn connect(&mut self, config: &TransportConfig) -> Result<Self::Stream> {
        let timeout: Duration = config.read_timeout.unwrap_or(DEFAULT_TIMEOUT);
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|err| TransportError::Unavailable {
                endpoint: self.endpoint(),
                source: err.into(),
            })?;
        debug!(path = %self.path, baud = self.baud_rate, "serial port opened");
        Ok(port)
    }

    fn discard_input(&mut self, stream: &mut Self::Stream) -> Result<()> {
        stream
            .clear(ClearBuffer::Input)
            .map_err(|err| TransportError::Io(err.into()))
    }

    fn endpoint(&self) -> String {
        format!("serial port {}", self.path)
    }
}

impl SerialTransport {
    /// Serial transport with the default one-second timeout.
    pub fn serial(path: impl Into<String>) -> Self {
        StreamTransport::new(SerialConnector::new(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::LinkState;
    use crate::traits::Transport;

    #[test]
    fn connector_uses_fixed_line_settings() {
        let connector = SerialConnector::new("/dev/ttyUSB0");
        assert_eq!(connector.baud_rate(), 115_200);
        assert_eq!(connector.path(), "/dev/ttyUSB0");
        assert_eq!(connector.endpoint(), "serial port /dev/ttyUSB0");
    }

    #[test]
    fn missing_device_is_reported_as_unavailable() {
        let mut transport = SerialTransport::serial("/dev/probelink-does-not-exist");
        let err = transport.write(b"\x02RD000W\x03").unwrap_err();

        assert!(matches!(err, TransportError::Unavailable { .. }));
        assert!(err.to_string().contains("powered on and connected"));
        assert_eq!(transport.state(), LinkState::Closed);
    }
}
