use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Start-of-text marker opening every frame.
pub const STX: u8 = 0x02;

/// End-of-text marker closing every frame.
pub const ETX: u8 = 0x03;

/// Positive acknowledgement status byte.
pub const ACK: u8 = 0x06;

/// Negative acknowledgement status byte.
pub const NAK: u8 = 0x15;

/// Default upper bound for a single read: one full metadata block.
pub const DEFAULT_MAX_READ_LEN: usize = 256;

/// STX + "WR"/"RD" + address + 2 command digits + width + ETX.
const REQUEST_OVERHEAD: usize = 8;

/// STX + status + address + ETX.
const RESPONSE_OVERHEAD: usize = 4;

/// Whether a request reads from or writes to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Write,
    Read,
}

impl Operation {
    pub fn tag(self) -> &'static [u8; 2] {
        match self {
            Operation::Write => b"WR",
            Operation::Read => b"RD",
        }
    }

    fn from_tag(tag: &[u8]) -> Result<Self> {
        match tag {
            b"WR" => Ok(Operation::Write),
            b"RD" => Ok(Operation::Read),
            other => Err(FrameError::InvalidOperation(other.to_vec())),
        }
    }
}

/// Register addressing width. Affects how the device interprets the
/// payload, never the width of the frame's own fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Word,
    Byte,
}

impl Width {
    pub fn tag(self) -> u8 {
        match self {
            Width::Word => b'W',
            Width::Byte => b'B',
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            b'W' => Ok(Width::Word),
            b'B' => Ok(Width::Byte),
            other => Err(FrameError::InvalidWidth(other)),
        }
    }
}

/// A request frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    /// Device address, 0-9.
    pub address: u8,
    /// Command code, 0-99.
    pub command: u8,
    pub width: Width,
    /// Bytes to write. Always empty for reads.
    pub payload: Bytes,
}

impl Request {
    /// Build a read request.
    pub fn read(address: u8, command: u8, width: Width) -> Self {
        Self {
            operation: Operation::Read,
            address,
            command,
            width,
            payload: Bytes::new(),
        }
    }

    /// Build a write request carrying `payload`.
    pub fn write(address: u8, command: u8, width: Width, payload: impl Into<Bytes>) -> Self {
        Self {
            operation: Operation::Write,
            address,
            command,
            width,
            payload: payload.into(),
        }
    }

    /// The total wire size of this request.
    pub fn wire_size(&self) -> usize {
        match self.operation {
            Operation::Write => REQUEST_OVERHEAD + self.payload.len(),
            Operation::Read => REQUEST_OVERHEAD,
        }
    }
}

/// Device verdict carried by a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ack,
    Nak,
}

/// A response frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    /// Echo of the request's device address.
    pub address: u8,
    /// Read result, or the echoed write payload.
    pub payload: Bytes,
}

impl Response {
    pub fn ack(address: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            status: Status::Ack,
            address,
            payload: payload.into(),
        }
    }

    pub fn nak(address: u8) -> Self {
        Self {
            status: Status::Nak,
            address,
            payload: Bytes::new(),
        }
    }
}

/// Wire length of a response carrying `payload_len` payload bytes.
pub fn response_len(payload_len: usize) -> usize {
    RESPONSE_OVERHEAD + payload_len
}

/// Encode a request into the wire format.
///
/// ```text
/// ┌─────┬───────────┬──────┬─────────┬───────┬───────────┬─────┐
/// │ STX │ "WR"/"RD" │ addr │ cmd     │ width │ payload   │ ETX │
/// │ 02  │ 2 bytes   │ 1 d. │ 2 digits│ W / B │ (WR only) │ 03  │
/// └─────┴───────────┴──────┴─────────┴───────┴───────────┴─────┘
/// ```
pub fn encode_request(request: &Request, dst: &mut BytesMut) -> Result<()> {
    if request.address > 9 {
        return Err(FrameError::AddressOutOfRange(request.address));
    }
    if request.command > 99 {
        return Err(FrameError::CommandOutOfRange(request.command));
    }

    dst.reserve(request.wire_size());
    dst.put_u8(STX);
    dst.put_slice(request.operation.tag());
    dst.put_u8(b'0' + request.address);
    dst.put_u8(b'0' + request.command / 10);
    dst.put_u8(b'0' + request.command % 10);
    dst.put_u8(request.width.tag());
    if request.operation == Operation::Write {
        dst.put_slice(&request.payload);
    }
    dst.put_u8(ETX);
    Ok(())
}

/// Decode one complete request frame.
pub fn decode_request(src: &[u8]) -> Result<Request> {
    let body = strip_delimiters(src, REQUEST_OVERHEAD)?;

    let operation = Operation::from_tag(&body[0..2])?;
    let address = parse_digit(body[2]).ok_or(FrameError::InvalidAddress(body[2]))?;
    let command = match (parse_digit(body[3]), parse_digit(body[4])) {
        (Some(tens), Some(ones)) => tens * 10 + ones,
        _ => return Err(FrameError::InvalidCommand(body[3..5].to_vec())),
    };
    let width = Width::from_tag(body[5])?;
    let payload = &body[6..];

    if operation == Operation::Read && !payload.is_empty() {
        return Err(FrameError::InvalidEnd);
    }

    Ok(Request {
        operation,
        address,
        command,
        width,
        payload: Bytes::copy_from_slice(payload),
    })
}

/// Encode a response into the wire format.
pub fn encode_response(response: &Response, dst: &mut BytesMut) -> Result<()> {
    if response.address > 9 {
        return Err(FrameError::AddressOutOfRange(response.address));
    }
    dst.reserve(response_len(response.payload.len()));
    dst.put_u8(STX);
    dst.put_u8(match response.status {
        Status::Ack => ACK,
        Status::Nak => NAK,
    });
    dst.put_u8(b'0' + response.address);
    dst.put_slice(&response.payload);
    dst.put_u8(ETX);
    Ok(())
}

/// Decode one complete response frame.
///
/// The frame must be exactly the bytes of one response: the last byte is
/// taken as ETX and everything between the address digit and it is payload.
pub fn decode_response(src: &[u8]) -> Result<Response> {
    let body = strip_delimiters(src, RESPONSE_OVERHEAD)?;

    let status = match body[0] {
        ACK => Status::Ack,
        NAK => Status::Nak,
        other => return Err(FrameError::InvalidStatus(other)),
    };
    let address = parse_digit(body[1]).ok_or(FrameError::InvalidAddress(body[1]))?;

    Ok(Response {
        status,
        address,
        payload: Bytes::copy_from_slice(&body[2..]),
    })
}

/// Configuration for the query client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    /// Largest payload a single read may request. Default: 256 bytes.
    pub max_read_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_read_len: DEFAULT_MAX_READ_LEN,
        }
    }
}

fn strip_delimiters(src: &[u8], overhead: usize) -> Result<&[u8]> {
    if src.len() < overhead {
        return Err(FrameError::Truncated { len: src.len() });
    }
    if src[0] != STX {
        return Err(FrameError::InvalidStart);
    }
    if src[src.len() - 1] != ETX {
        return Err(FrameError::InvalidEnd);
    }
    Ok(&src[1..src.len() - 1])
}

fn parse_digit(byte: u8) -> Option<u8> {
    byte.is_ascii_digit().then(|| byte - b'0')
}
