//! Outbound MLLP connection: one frame out, one acknowledgment back.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use hl7_toolkit_core::Message;
use hl7_toolkit_spec_tables::Registry;

use crate::ack::Acknowledgment;
use crate::addr::resolve_endpoint_addr;
use crate::config::ClientConfig;
use crate::frame::{self, MllpDecoder, read_frame};
use crate::stream::{Stream, open_tcp};
use crate::MllpError;

/// A synchronous MLLP client connection.
///
/// Enforces the protocol's one-request-in-flight rule by construction:
/// [`MllpClient::send`] writes a frame, then blocks until the peer's
/// acknowledgment frame arrives (or the read timeout fires — a send never
/// hangs and never returns without a definite outcome).
pub struct MllpClient {
    stream: Stream,
    decoder: MllpDecoder,
    config: ClientConfig,
    addr: SocketAddr,
    registry: Arc<Registry>,
}

impl MllpClient {
    /// Connect to an MLLP endpoint.
    ///
    /// The address can be any format accepted by [`resolve_endpoint_addr`]:
    /// `IP`, `IP:PORT`, `hostname`, `hostname:PORT`. Port defaults to 2575.
    /// The registry is used to parse acknowledgment replies.
    pub fn connect(
        addr: &str,
        config: ClientConfig,
        registry: Arc<Registry>,
    ) -> Result<Self, MllpError> {
        let socket_addr = resolve_endpoint_addr(addr)?;
        let stream = Self::open(&socket_addr, &config)?;

        Ok(Self {
            stream,
            decoder: MllpDecoder::new(config.max_frame_size),
            config,
            addr: socket_addr,
            registry,
        })
    }

    /// Re-establish the connection after a drop or error.
    ///
    /// Closes the old stream (ignoring errors), opens a fresh connection to
    /// the same address, and discards any half-decoded reply state.
    pub fn reconnect(&mut self) -> Result<(), MllpError> {
        self.stream.close();
        self.stream = Self::open(&self.addr, &self.config)?;
        self.decoder = MllpDecoder::new(self.config.max_frame_size);
        Ok(())
    }

    /// The resolved socket address this client is connected to.
    pub fn remote_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Send a message and wait for its acknowledgment.
    ///
    /// The reply frame is parsed and classified: a reply that is not an
    /// ACK-typed message is [`MllpError::UnexpectedMessage`]. Whether a NAK
    /// should be treated as a failure is the caller's decision — inspect
    /// [`Acknowledgment::is_positive`].
    pub fn send(&mut self, message: &Message) -> Result<Acknowledgment, MllpError> {
        let payload = self.send_raw(message.serialize().as_bytes())?;
        let text = String::from_utf8(payload).map_err(|_| MllpError::Framing {
            details: "reply payload is not valid UTF-8".to_string(),
        })?;
        log::debug!("received reply frame ({} bytes)", text.len());
        let reply = Message::parse(&text, &self.registry).map_err(|e| MllpError::Framing {
            details: format!("reply did not parse: {e}"),
        })?;
        Acknowledgment::classify(reply)
    }

    /// Send a raw payload and return the raw reply frame.
    pub fn send_raw(&mut self, payload: &[u8]) -> Result<Vec<u8>, MllpError> {
        log::debug!("sending frame ({} bytes) to {}", payload.len(), self.addr);
        self.stream
            .write_all(&frame::encode(payload))
            .map_err(MllpError::WriteFailed)?;
        self.stream.flush().map_err(MllpError::WriteFailed)?;

        read_frame(
            &mut self.stream,
            &mut self.decoder,
            self.config.timeouts.read,
        )
    }

    fn open(addr: &SocketAddr, config: &ClientConfig) -> Result<Stream, MllpError> {
        let tcp = open_tcp(addr, &config.timeouts)?;

        #[cfg(feature = "tls")]
        if let Some(tls) = &config.tls {
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(tls.accept_invalid_certs)
                .build()
                .map_err(|e| MllpError::Tls(e.to_string()))?;
            let wrapped = connector
                .connect(&tls.domain, tcp)
                .map_err(|e| MllpError::Tls(e.to_string()))?;
            return Ok(Stream::Tls(Box::new(wrapped)));
        }

        Ok(Stream::Plain(tcp))
    }
}

impl Drop for MllpClient {
    fn drop(&mut self) {
        self.stream.close();
    }
}
