//! Talk to probe power supplies over USB serial or LAN.
//!
//! probelink covers the protocol layer shared by every power supply and
//! probe: byte links, request/response framing, and the identity metadata
//! each device stores in EEPROM.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial and TCP links with lazy open and exact-length reads
//! - [`frame`]: `STX ... ETX` request/response codec and a query client
//! - [`metadata`]: identity records, their EEPROM layouts, and model tables
//! - [`device`]: a power supply routing metadata reads and writes by channel

pub mod device;
pub mod error;

pub use device::{Channel, PowerSupply, PowerSupplyModel, METADATA_COMMAND};
pub use error::{DeviceError, Result};

/// Re-export transport types.
pub mod transport {
    pub use probelink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use probelink_frame::*;
}

/// Re-export metadata types.
pub mod metadata {
    pub use probelink_metadata::*;
}
