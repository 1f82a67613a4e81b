use bytes::{Bytes, BytesMut};
use probelink_transport::Transport;
use tracing::{debug, trace};

use crate::codec::{
    decode_response, encode_request, response_len, FrameConfig, Request, Status, Width, NAK,
};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// STX and status byte.
const RESPONSE_HEAD_LEN: usize = 2;

/// Issues request frames over a [`Transport`] and reads back the responses.
///
/// One request is in flight at a time. Every query first discards stale
/// input so that a leftover reply cannot be mistaken for the next one.
pub struct QueryClient<T> {
    transport: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Transport> QueryClient<T> {
    /// Create a client with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FrameConfig::default())
    }

    /// Create a client with explicit configuration.
    pub fn with_config(transport: T, config: FrameConfig) -> Self {
        Self {
            transport,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Send `request` and read a response carrying `payload_len` bytes.
    ///
    /// A NAK from the device surfaces as [`FrameError::Nak`].
    pub fn query(&mut self, request: &Request, payload_len: usize) -> Result<Bytes> {
        self.buf.clear();
        encode_request(request, &mut self.buf)?;

        self.transport.reset_input_buffer()?;
        self.transport.write(&self.buf)?;
        trace!(frame = ?self.buf.as_ref(), "request sent");

        // A NAK carries no payload, so the status byte decides how much follows.
        let head = self.transport.read(RESPONSE_HEAD_LEN)?;
        let expected = if head.get(1) == Some(&NAK) {
            response_len(0)
        } else {
            response_len(payload_len)
        };
        let tail = self.transport.read(expected - RESPONSE_HEAD_LEN)?;

        let mut wire = BytesMut::with_capacity(expected);
        wire.extend_from_slice(&head);
        wire.extend_from_slice(&tail);
        let response = decode_response(&wire)?;
        debug!(
            operation = ?request.operation,
            address = request.address,
            command = request.command,
            payload_len = response.payload.len(),
            "query answered"
        );

        if response.status == Status::Nak {
            return Err(FrameError::Nak {
                address: response.address,
            });
        }
        if response.address != request.address {
            return Err(FrameError::AddressMismatch {
                expected: request.address,
                got: response.address,
            });
        }
        Ok(response.payload)
    }

    /// Read `length` bytes from `command` on the device at `address`.
    pub fn read(&mut self, address: u8, command: u8, width: Width, length: usize) -> Result<Bytes> {
        if length > self.config.max_read_len {
            return Err(FrameError::PayloadTooLarge {
                size: length,
                max: self.config.max_read_len,
            });
        }
        self.query(&Request::read(address, command, width), length)
    }

    /// Write `payload` to `command` on the device at `address`.
    ///
    /// The device echoes the payload; the echo is returned.
    pub fn write(
        &mut self,
        address: u8,
        command: u8,
        width: Width,
        payload: impl Into<Bytes>,
    ) -> Result<Bytes> {
        let request = Request::write(address, command, width, payload);
        let echo_len = request.payload.len();
        self.query(&request, echo_len)
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the client and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Update the maximum read length for subsequent reads.
    pub fn set_max_read_len(&mut self, max_read_len: usize) {
        self.config.max_read_len = max_read_len;
    }

    /// Current client configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
