use std::io::{ErrorKind, Read, Write};

use bytes::{Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::traits::{Connector, Transport};

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 512;

/// Connection state of a [`StreamTransport`].
///
/// `Closed -> Open` happens on `open()` or implicitly on the first I/O.
/// A failed transfer moves `Open -> Broken`; only `open()` leaves `Broken`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Closed,
    Open,
    Broken,
}

enum Link<S> {
    Closed,
    Open(S),
    Broken,
}

/// A lazily opened link over any [`Connector`].
///
/// Incoming bytes are collected in a holding buffer so that reads of any
/// declared length can be satisfied even when the device's reply arrives in
/// several fragments.
pub struct StreamTransport<C: Connector> {
    connector: C,
    config: TransportConfig,
    link: Link<C::Stream>,
    holding: BytesMut,
}

impl<C: Connector> StreamTransport<C> {
    /// Create a closed transport with default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, TransportConfig::default())
    }

    /// Create a closed transport with explicit configuration.
    pub fn with_config(connector: C, config: TransportConfig) -> Self {
        Self {
            connector,
            config,
            link: Link::Closed,
            holding: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> LinkState {
        match self.link {
            Link::Closed => LinkState::Closed,
            Link::Open(_) => LinkState::Open,
            Link::Broken => LinkState::Broken,
        }
    }

    /// Bytes received but not yet returned by `read`.
    pub fn buffered(&self) -> usize {
        self.holding.len()
    }

    /// Borrow the connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Current transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn ensure_open(&mut self) -> Result<()> {
        match self.link {
            Link::Open(_) => Ok(()),
            Link::Closed => self.open(),
            Link::Broken => Err(TransportError::NotOpen {
                endpoint: self.connector.endpoint(),
            }),
        }
    }

    fn mark_broken(&mut self, err: &TransportError) {
        warn!(endpoint = %self.connector.endpoint(), error = %err, "link broken");
        self.link = Link::Broken;
        self.holding.clear();
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.breaks_link() {
                self.mark_broken(err);
            }
        }
        result
    }
}

impl<C: Connector> Transport for StreamTransport<C> {
    fn open(&mut self) -> Result<()> {
        if let Link::Open(_) = self.link {
            return Ok(());
        }
        let stream = self.connector.connect(&self.config)?;
        self.link = Link::Open(stream);
        self.holding.clear();
        info!(endpoint = %self.connector.endpoint(), "link opened");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Link::Open(_) = self.link {
            debug!(endpoint = %self.connector.endpoint(), "closing link");
        }
        self.link = Link::Closed;
        self.holding.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        matches!(self.link, Link::Open(_))
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let endpoint = self.connector.endpoint();
        let result = match &mut self.link {
            Link::Open(stream) => write_all(stream, data, &endpoint),
            _ => Err(TransportError::NotOpen { endpoint }),
        };
        self.settle(result)?;
        debug!(len = data.len(), "wrote bytes");
        Ok(())
    }

    fn read(&mut self, length: usize) -> Result<Bytes> {
        self.ensure_open()?;
        let endpoint = self.connector.endpoint();
        let result = match &mut self.link {
            Link::Open(stream) => fill_holding(stream, &mut self.holding, length, &endpoint),
            _ => Err(TransportError::NotOpen { endpoint }),
        };
        self.settle(result)?;
        debug!(len = length, buffered = self.holding.len() - length, "read bytes");
        Ok(self.holding.split_to(length).freeze())
    }

    fn reset_input_buffer(&mut self) -> Result<()> {
        if !self.holding.is_empty() {
            debug!(discarded = self.holding.len(), "discarding buffered input");
        }
        self.holding.clear();
        let result = match &mut self.link {
            Link::Open(stream) => self.connector.discard_input(stream),
            _ => Ok(()),
        };
        self.settle(result)
    }
}

fn write_all<S: Write>(stream: &mut S, data: &[u8], endpoint: &str) -> Result<()> {
    let mut offset = 0usize;
    while offset < data.len() {
        match stream.write(&data[offset..]) {
            Ok(0) => {
                return Err(TransportError::Broken {
                    endpoint: endpoint.to_string(),
                })
            }
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    loop {
        match stream.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

fn fill_holding<S: Read>(
    stream: &mut S,
    holding: &mut BytesMut,
    length: usize,
    endpoint: &str,
) -> Result<()> {
    while holding.len() < length {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let read = match stream.read(&mut chunk) {
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                return Err(TransportError::Timeout {
                    expected: length,
                    received: holding.len(),
                })
            }
            Err(err) => return Err(TransportError::Io(err)),
        };

        if read == 0 {
            return Err(TransportError::Broken {
                endpoint: endpoint.to_string(),
            });
        }

        holding.extend_from_slice(&chunk[..read]);
    }
    Ok(())
}
