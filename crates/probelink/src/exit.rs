use std::fmt;
use std::io;

use probelink::frame::FrameError;
use probelink::metadata::MetadataError;
use probelink::transport::TransportError;
use probelink::DeviceError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const DEVICE_UNAVAILABLE: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Unavailable { source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            PERMISSION_DENIED
        }
        TransportError::Unavailable { .. } => DEVICE_UNAVAILABLE,
        TransportError::Timeout { .. } => TIMEOUT,
        TransportError::Io(source) if source.kind() == io::ErrorKind::TimedOut => TIMEOUT,
        _ => TRANSPORT_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::Nak { .. } => CliError::new(FAILURE, format!("{context}: {err}")),
        FrameError::AddressOutOfRange(_)
        | FrameError::CommandOutOfRange(_)
        | FrameError::PayloadTooLarge { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

pub fn metadata_error(context: &str, err: MetadataError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::Frame(err) => frame_error(context, err),
        DeviceError::Metadata(err) => metadata_error(context, err),
        DeviceError::ChannelUnavailable { .. } | DeviceError::InvalidChannel(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
    }
}
