use probelink_frame::FrameError;
use probelink_metadata::MetadataError;

use crate::device::{Channel, PowerSupplyModel};

/// Errors from power supply operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The exchange with the power supply failed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The metadata block could not be encoded or decoded.
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// The power supply model has no such channel.
    #[error("{model} has no channel {channel}")]
    ChannelUnavailable {
        channel: Channel,
        model: PowerSupplyModel,
    },

    /// A channel number outside 0 to 4.
    #[error("invalid channel number: {0}")]
    InvalidChannel(u8),
}

/// Convenience alias for device results.
pub type Result<T> = std::result::Result<T, DeviceError>;
