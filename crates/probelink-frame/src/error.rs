use probelink_transport::TransportError;

/// Errors that can occur while encoding, decoding or exchanging frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame does not begin with STX (0x02).
    #[error("frame does not start with STX")]
    InvalidStart,

    /// The frame does not end with ETX (0x03).
    #[error("frame does not end with ETX")]
    InvalidEnd,

    /// The operation tag is neither "WR" nor "RD".
    #[error("invalid operation tag {0:?}")]
    InvalidOperation(Vec<u8>),

    /// The address field is not a single ASCII digit.
    #[error("invalid address byte 0x{0:02X}")]
    InvalidAddress(u8),

    /// The command field is not two ASCII digits.
    #[error("invalid command field {0:?}")]
    InvalidCommand(Vec<u8>),

    /// The addressing width tag is neither "W" nor "B".
    #[error("invalid addressing width byte 0x{0:02X}")]
    InvalidWidth(u8),

    /// The response status byte is neither ACK nor NAK.
    #[error("invalid response status byte 0x{0:02X}")]
    InvalidStatus(u8),

    /// The device refused the request.
    #[error("device at address {address} answered NAK")]
    Nak { address: u8 },

    /// The response echoed a different address than was requested.
    #[error("response echoed address {got}, expected {expected}")]
    AddressMismatch { expected: u8, got: u8 },

    /// Too few bytes to hold the fixed frame fields.
    #[error("frame truncated ({len} bytes)")]
    Truncated { len: usize },

    /// Device addresses are a single decimal digit.
    #[error("device address {0} out of range (0-9)")]
    AddressOutOfRange(u8),

    /// Command codes are two decimal digits.
    #[error("command code {0} out of range (0-99)")]
    CommandOutOfRange(u8),

    /// The requested read length exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying link failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
