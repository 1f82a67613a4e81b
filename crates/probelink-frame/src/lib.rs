//! Delimited request/response framing for probe power supplies.
//!
//! Every exchange is one request frame followed by one response frame:
//!
//! ```text
//! Request:  STX <"WR"|"RD"> <addr:1 digit> <cmd:2 digits> <"W"|"B"> [payload] ETX
//! Response: STX <ACK|NAK> <addr:1 digit> [payload] ETX
//! ```
//!
//! Frames carry no length field. Payloads are binary and may contain ETX,
//! so the caller always states how many payload bytes it expects back.

pub mod client;
pub mod codec;
pub mod error;

pub use client::QueryClient;
pub use codec::{
    decode_request, decode_response, encode_request, encode_response, response_len, FrameConfig,
    Operation, Request, Response, Status, Width, ACK, DEFAULT_MAX_READ_LEN, ETX, NAK, STX,
};
pub use error::{FrameError, Result};
