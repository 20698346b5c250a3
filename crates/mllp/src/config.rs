//! Configuration types for the MLLP transport.

use std::time::Duration;

use crate::frame::DEFAULT_MAX_FRAME_SIZE;

/// Timeout settings for MLLP connections.
///
/// Defaults are tuned for LAN-connected interface engines:
/// - `connect`: 5s (generous for LAN, might be tight for VPN)
/// - `write`: 10s (messages are small; a stalled write means trouble)
/// - `read`: 30s (some engines acknowledge only after downstream delivery)
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Maximum time to wait for a TCP connection to establish.
    pub connect: Duration,
    /// Maximum time to wait for a frame write to complete.
    pub write: Duration,
    /// Maximum time to wait for a reply frame after sending.
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            write: Duration::from_secs(10),
            read: Duration::from_secs(30),
        }
    }
}

/// Configuration for an outbound MLLP connection.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Network timeout settings.
    pub timeouts: Timeouts,
    /// Maximum accepted reply frame size in bytes.
    pub max_frame_size: usize,
    /// Wrap the connection in TLS when set.
    #[cfg(feature = "tls")]
    pub tls: Option<TlsClientConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            #[cfg(feature = "tls")]
            tls: None,
        }
    }
}

/// Configuration for an MLLP listener.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Network timeout settings (`read` bounds how long a connection may
    /// sit mid-frame before it is dropped; idle connections between frames
    /// are kept open indefinitely).
    pub timeouts: Timeouts,
    /// Maximum accepted inbound frame size in bytes.
    pub max_frame_size: usize,
    /// Terminate TLS on accepted connections when set.
    #[cfg(feature = "tls")]
    pub tls: Option<TlsServerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            #[cfg(feature = "tls")]
            tls: None,
        }
    }
}

/// TLS settings for an outbound connection.
#[cfg(feature = "tls")]
#[derive(Debug, Clone)]
pub struct TlsClientConfig {
    /// The domain name to verify the server certificate against.
    pub domain: String,
    /// Skip server certificate verification (test environments only).
    pub accept_invalid_certs: bool,
}

/// TLS settings for a listener: the server identity as PKCS#12.
#[cfg(feature = "tls")]
#[derive(Clone)]
pub struct TlsServerConfig {
    /// DER-encoded PKCS#12 archive holding the certificate and key.
    pub pkcs12_der: Vec<u8>,
    /// Password for the PKCS#12 archive.
    pub password: String,
}

#[cfg(feature = "tls")]
impl std::fmt::Debug for TlsServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsServerConfig")
            .field("pkcs12_der", &format!("[{} bytes]", self.pkcs12_der.len()))
            .field("password", &"[redacted]")
            .finish()
    }
}
