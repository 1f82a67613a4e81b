use std::io::{Read, Write};

use bytes::Bytes;

use crate::config::TransportConfig;
use crate::error::Result;

/// A byte link to a power supply.
///
/// `read` and `write` open the link on demand. Implementations are driven by
/// exactly one caller at a time; there is no internal locking.
pub trait Transport {
    /// Open the link. Clears a broken state. No-op when already open.
    fn open(&mut self) -> Result<()>;

    /// Close the link and drop any buffered input.
    fn close(&mut self) -> Result<()>;

    /// Whether the link is currently open.
    fn is_open(&self) -> bool;

    /// Write every byte of `data` (blocking).
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read exactly `length` bytes (blocking, bounded by the read timeout).
    fn read(&mut self, length: usize) -> Result<Bytes>;

    /// Discard input that was received but not yet consumed.
    fn reset_input_buffer(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, length: usize) -> Result<Bytes> {
        (**self).read(length)
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        (**self).reset_input_buffer()
    }
}

/// Opens the raw byte stream behind a [`StreamTransport`](crate::StreamTransport).
pub trait Connector {
    /// The connected stream type.
    type Stream: Read + Write;

    /// Establish a new stream with the given timeouts.
    fn connect(&mut self, config: &TransportConfig) -> Result<Self::Stream>;

    /// Drop input pending inside the stream itself (e.g. a serial driver's queue).
    fn discard_input(&mut self, _stream: &mut Self::Stream) -> Result<()> {
        Ok(())
    }

    /// Human-readable endpoint for diagnostics.
    fn endpoint(&self) -> String;
}
