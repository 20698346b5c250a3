//! Typed error types for the MLLP transport.

use std::io;
use std::time::Duration;

/// Transport error conditions, categorized by type.
///
/// Each variant carries enough context to produce a helpful error message.
/// Use [`MllpError::is_retryable()`] to classify transient vs permanent
/// failures; retry policy itself belongs to the caller.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum MllpError {
    // -- Connection --
    /// The peer actively refused the connection (e.g. port not open).
    #[error("connection refused: {addr}")]
    ConnectionRefused {
        /// The address that was attempted.
        addr: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// TCP connect timed out before the peer responded.
    #[error("connection timed out: {addr} ({timeout:?})")]
    ConnectionTimeout {
        /// The address that was attempted.
        addr: String,
        /// The configured timeout that elapsed.
        timeout: Duration,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Connection failed for a reason other than refusal or timeout.
    #[error("connection failed: {addr}")]
    ConnectionFailed {
        /// The address that was attempted.
        addr: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The peer closed the connection unexpectedly.
    #[error("connection closed by peer")]
    ConnectionClosed,

    // -- Address --
    /// The provided address string could not be parsed.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// DNS resolution found no addresses for the given hostname.
    #[error("no address found for hostname: {0}")]
    NoAddressFound(String),

    // -- I/O --
    /// Writing a frame to the peer failed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// Reading from the peer failed.
    #[error("read failed: {0}")]
    ReadFailed(#[source] io::Error),

    /// The peer did not respond within the read timeout.
    #[error("read timed out waiting for response")]
    ReadTimeout,

    // -- Framing --
    /// A byte sequence violated the MLLP envelope (bad trailer, payload
    /// that is not valid UTF-8, and the like).
    #[error("malformed MLLP frame: {details}")]
    Framing {
        /// Human-readable description of the framing violation.
        details: String,
    },

    /// A frame exceeded the maximum allowed size.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge {
        /// Actual size of the oversized frame in bytes.
        size: usize,
        /// Configured maximum frame size in bytes.
        max: usize,
    },

    // -- Protocol --
    /// The peer replied with something other than an acknowledgment.
    #[error("unexpected reply message type: {type_name}")]
    UnexpectedMessage {
        /// The declared type of the reply that was received instead.
        type_name: String,
    },

    // -- TLS --
    /// TLS negotiation or transfer failed.
    #[cfg(feature = "tls")]
    #[error("TLS error: {0}")]
    Tls(String),

    // -- Configuration --
    /// An invalid configuration was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MllpError {
    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MllpError::ConnectionTimeout { .. }
                | MllpError::ConnectionClosed
                | MllpError::WriteFailed(_)
                | MllpError::ReadFailed(_)
                | MllpError::ReadTimeout
        )
    }
}
