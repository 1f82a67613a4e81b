//! Power supplies and the channels their probes are plugged into.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use probelink_frame::{FrameConfig, QueryClient, Width};
use probelink_metadata::{FireFlyMetadata, Metadata, MetadataRecord, BLOCK_SIZE, PAGE_SIZE};
use probelink_transport::{LanTransport, SerialTransport, TcpConnector, Transport};
use tracing::{debug, info};

use crate::error::{DeviceError, Result};

/// Command code of the metadata EEPROM on every device.
pub const METADATA_COMMAND: u8 = 0x04;

/// A device address on the power supply bus.
///
/// `PsCh` is the power supply itself; `Ch1` to `Ch4` are the probe sockets.
/// The discriminant is the address digit sent in each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Channel {
    PsCh = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
    Ch4 = 4,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::PsCh,
        Channel::Ch1,
        Channel::Ch2,
        Channel::Ch3,
        Channel::Ch4,
    ];

    /// Frame address digit for this channel.
    pub fn address(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Channel {
    type Error = DeviceError;

    fn try_from(value: u8) -> Result<Self> {
        Channel::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(DeviceError::InvalidChannel(value))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::PsCh => f.write_str("PS"),
            other => write!(f, "CH{}", other.address()),
        }
    }
}

/// Supported power supply models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerSupplyModel {
    /// Two probe channels.
    Ps02,
    /// Four probe channels.
    Ps03,
}

impl PowerSupplyModel {
    pub fn name(self) -> &'static str {
        match self {
            PowerSupplyModel::Ps02 => "PS02",
            PowerSupplyModel::Ps03 => "PS03",
        }
    }

    /// Number of probe sockets.
    pub fn num_channels(self) -> u8 {
        match self {
            PowerSupplyModel::Ps02 => 2,
            PowerSupplyModel::Ps03 => 4,
        }
    }

    /// Whether `channel` exists on this model. The power supply channel always does.
    pub fn has_channel(self, channel: Channel) -> bool {
        channel.address() <= self.num_channels()
    }

    /// Probe channels of this model, in order.
    pub fn probe_channels(self) -> impl Iterator<Item = Channel> {
        Channel::ALL
            .into_iter()
            .skip(1)
            .take(usize::from(self.num_channels()))
    }
}

impl fmt::Display for PowerSupplyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A power supply reached through one transport.
///
/// Every exchange is routed to a [`Channel`]: the power supply's own
/// EEPROM sits at [`Channel::PsCh`] and each probe answers at its socket.
pub struct PowerSupply<T> {
    client: QueryClient<T>,
    model: Option<PowerSupplyModel>,
}

impl PowerSupply<SerialTransport> {
    /// A power supply on a USB serial port. The port opens on first use.
    pub fn open_serial(path: impl Into<String>) -> Self {
        Self::new(SerialTransport::serial(path))
    }
}

impl PowerSupply<LanTransport> {
    /// A power supply on the LAN control port. The socket connects on first use.
    pub fn open_lan(host: impl Into<String>) -> Self {
        Self::new(LanTransport::new(TcpConnector::new(host)))
    }
}

impl<T: Transport> PowerSupply<T> {
    /// Wrap a transport. Channels are not checked until a model is set.
    pub fn new(transport: T) -> Self {
        Self {
            client: QueryClient::with_config(transport, FrameConfig::default()),
            model: None,
        }
    }

    /// Restrict channel access to what `model` provides.
    pub fn with_model(mut self, model: PowerSupplyModel) -> Self {
        self.model = Some(model);
        self
    }

    pub fn model(&self) -> Option<PowerSupplyModel> {
        self.model
    }

    /// Read the raw 256-byte metadata block of `channel`.
    pub fn read_metadata_block(&mut self, channel: Channel) -> Result<Bytes> {
        self.check_channel(channel)?;
        let block = self
            .client
            .read(channel.address(), METADATA_COMMAND, Width::Word, BLOCK_SIZE)?;
        debug!(%channel, len = block.len(), "metadata block read");
        Ok(block)
    }

    /// Read and decode the metadata record of `channel`.
    pub fn read_record<R: MetadataRecord>(&mut self, channel: Channel) -> Result<R> {
        let block = self.read_metadata_block(channel)?;
        Ok(R::from_bytes(&block)?)
    }

    /// Read the sequential metadata record every device carries.
    pub fn read_metadata(&mut self, channel: Channel) -> Result<Metadata> {
        self.read_record(channel)
    }

    /// Read the extended record of a FireFly probe.
    pub fn read_firefly_metadata(&mut self, channel: Channel) -> Result<FireFlyMetadata> {
        self.read_record(channel)
    }

    /// Write `record` to the metadata EEPROM of `channel`, one page per exchange.
    ///
    /// Each write carries the page's byte offset followed by the page data.
    pub fn write_metadata<R: MetadataRecord>(
        &mut self,
        channel: Channel,
        record: &R,
    ) -> Result<()> {
        self.check_channel(channel)?;
        let pages = record.as_pages()?;
        for (index, page) in pages.iter().enumerate() {
            let mut payload = BytesMut::with_capacity(PAGE_SIZE + 1);
            // BLOCK_SIZE is 256, so every page offset fits a byte.
            payload.put_u8((index * PAGE_SIZE) as u8);
            payload.put_slice(page);
            self.client.write(
                channel.address(),
                METADATA_COMMAND,
                Width::Byte,
                payload.freeze(),
            )?;
        }
        info!(%channel, pages = pages.len(), "metadata written");
        Ok(())
    }

    /// Open the link now instead of on the first exchange.
    ///
    /// This is also the only way back from a broken link.
    pub fn open(&mut self) -> Result<()> {
        self.client
            .get_mut()
            .open()
            .map_err(|err| DeviceError::Frame(err.into()))
    }

    /// Close the link. The next exchange reopens it.
    pub fn close(&mut self) -> Result<()> {
        self.client
            .get_mut()
            .close()
            .map_err(|err| DeviceError::Frame(err.into()))
    }

    pub fn transport(&self) -> &T {
        self.client.get_ref()
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.client.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.client.into_inner()
    }

    fn check_channel(&self, channel: Channel) -> Result<()> {
        match self.model {
            Some(model) if !model.has_channel(channel) => {
                Err(DeviceError::ChannelUnavailable { channel, model })
            }
            _ => Ok(()),
        }
    }
}
