/// Errors that can occur on a probe link.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The device could not be opened.
    #[error("could not open {endpoint}: {source}. Is the power supply powered on and connected?")]
    Unavailable {
        endpoint: String,
        source: std::io::Error,
    },

    /// The stream reported a zero-length transfer; the link is broken.
    #[error("connection to {endpoint} is broken")]
    Broken { endpoint: String },

    /// I/O was requested on a broken link that has not been reopened.
    #[error("link to {endpoint} is not open (call open() after a broken connection)")]
    NotOpen { endpoint: String },

    /// The read timeout elapsed before enough bytes arrived.
    #[error("timed out waiting for {expected} bytes (received {received})")]
    Timeout { expected: usize, received: usize },

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether this failure leaves the link unusable until reopened.
    pub fn breaks_link(&self) -> bool {
        matches!(self, TransportError::Broken { .. } | TransportError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
