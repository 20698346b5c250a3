//! MLLP listener: thread-per-connection accept loop with per-connection
//! sequential decode → dispatch → acknowledge.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use hl7_toolkit_core::Message;
use hl7_toolkit_spec_tables::Registry;

use crate::ack::{AckCode, build_ack, build_reject};
use crate::addr::resolve_endpoint_addr;
use crate::config::ServerConfig;
use crate::frame::{self, MllpDecoder};
use crate::stream::{Stream, configure_socket};
use crate::MllpError;

/// How often a connection thread wakes from a blocking read to check the
/// shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Application callbacks for an MLLP listener.
///
/// One handler instance serves every connection, so implementations must
/// be `Send + Sync`; callbacks may fire concurrently from multiple
/// connection threads.
pub trait MllpHandler: Send + Sync {
    /// Decide the acknowledgment for an inbound message.
    ///
    /// `None` means default accept (`AA`). The reply is built and sent by
    /// the server either way.
    fn on_message(&self, message: &Message, peer: SocketAddr) -> Option<AckCode>;

    /// Called after an acknowledgment has been written back to the peer.
    fn on_message_sent(&self, ack: &Message, peer: SocketAddr) {
        let _ = (ack, peer);
    }

    /// Called when a connection is accepted.
    fn on_connection_opened(&self, peer: SocketAddr) {
        let _ = peer;
    }

    /// Called when a connection ends, cleanly or not.
    fn on_connection_closed(&self, peer: SocketAddr) {
        let _ = peer;
    }
}

/// State shared by the accept loop and every connection thread.
struct Shared {
    config: ServerConfig,
    registry: Arc<Registry>,
    handler: Arc<dyn MllpHandler>,
    shutdown: Arc<AtomicBool>,
    #[cfg(feature = "tls")]
    acceptor: Option<Arc<native_tls::TlsAcceptor>>,
}

/// A bound MLLP listener.
///
/// Accepts connections on a background-thread-per-connection model; each
/// connection decodes frames sequentially, dispatches each message to the
/// handler, and writes the acknowledgment before reading the next frame.
pub struct MllpServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl MllpServer {
    /// Bind a listener.
    ///
    /// The address accepts the same formats as the client (`IP`, `IP:PORT`,
    /// `hostname`, `hostname:PORT`; port defaults to 2575). Bind to port 0
    /// to let the OS pick one — see [`MllpServer::local_addr`].
    pub fn bind(
        addr: &str,
        config: ServerConfig,
        registry: Arc<Registry>,
        handler: Arc<dyn MllpHandler>,
    ) -> Result<Self, MllpError> {
        let socket_addr = resolve_endpoint_addr(addr)?;
        let listener = TcpListener::bind(socket_addr).map_err(|e| MllpError::ConnectionFailed {
            addr: socket_addr.to_string(),
            source: e,
        })?;
        let local_addr = listener.local_addr().map_err(|e| MllpError::ConnectionFailed {
            addr: socket_addr.to_string(),
            source: e,
        })?;

        #[cfg(feature = "tls")]
        let acceptor = match &config.tls {
            Some(tls) => {
                let identity =
                    native_tls::Identity::from_pkcs12(&tls.pkcs12_der, &tls.password)
                        .map_err(|e| MllpError::Tls(e.to_string()))?;
                let acceptor = native_tls::TlsAcceptor::new(identity)
                    .map_err(|e| MllpError::Tls(e.to_string()))?;
                Some(Arc::new(acceptor))
            }
            None => None,
        };

        Ok(Self {
            listener,
            local_addr,
            shared: Arc::new(Shared {
                config,
                registry,
                handler,
                shutdown: Arc::new(AtomicBool::new(false)),
                #[cfg(feature = "tls")]
                acceptor,
            }),
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop on the calling thread until shut down.
    pub fn run(self) {
        log::info!("MLLP listener on {}", self.local_addr);
        loop {
            let (tcp, peer) = match self.listener.accept() {
                Ok(conn) => conn,
                Err(e) => {
                    if self.shared.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    log::warn!("accept failed: {e}");
                    thread::sleep(Duration::from_millis(10));
                    continue;
                }
            };
            if self.shared.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let shared = Arc::clone(&self.shared);
            thread::spawn(move || handle_connection(tcp, peer, &shared));
        }
        log::info!("MLLP listener on {} stopped", self.local_addr);
    }

    /// Run the accept loop on a background thread.
    pub fn spawn(self) -> ServerHandle {
        let addr = self.local_addr;
        let shutdown = Arc::clone(&self.shared.shutdown);
        let join = thread::spawn(move || self.run());
        ServerHandle {
            addr,
            shutdown,
            join: Some(join),
        }
    }
}

/// Controls a listener running on a background thread.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// The address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and join the accept thread.
    ///
    /// Active connection threads notice the flag within their poll interval
    /// and wind down on their own.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        self.shutdown.store(true, Ordering::SeqCst);
        // Wake the blocking accept.
        let _ = TcpStream::connect(self.addr);
        let _ = join.join();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ── Connection loop ─────────────────────────────────────────────────────

fn handle_connection(tcp: TcpStream, peer: SocketAddr, shared: &Shared) {
    if let Err(e) = configure_socket(&tcp, POLL_INTERVAL, shared.config.timeouts.write) {
        log::warn!("{peer}: socket configuration failed: {e}");
        return;
    }

    let Some(mut stream) = wrap_accepted(tcp, peer, shared) else {
        return;
    };

    shared.handler.on_connection_opened(peer);
    log::debug!("{peer}: connection opened");

    let mut decoder = MllpDecoder::new(shared.config.max_frame_size);
    let mut buf = [0u8; 4096];
    let mut frame_deadline: Option<Instant> = None;

    loop {
        if shared.shutdown.load(Ordering::SeqCst) {
            break;
        }
        if let Some(payload) = decoder.next_frame() {
            frame_deadline = None;
            if !respond(&mut stream, payload, peer, shared) {
                break;
            }
            continue;
        }

        match stream.read(&mut buf) {
            Ok(0) => {
                if !decoder.is_idle() {
                    log::warn!("{peer}: connection closed mid-frame");
                }
                break;
            }
            Ok(n) => {
                if let Err(e) = decoder.feed(&buf[..n]) {
                    // Decoder already reset and kept scanning; any frame that
                    // followed the bad one in this chunk is queued and drains
                    // at the top of the loop.
                    log::warn!("{peer}: {e}");
                    if !send_reject(&mut stream, &e.to_string(), peer, shared) {
                        break;
                    }
                }
                frame_deadline = if decoder.is_idle() {
                    None
                } else {
                    frame_deadline.or_else(|| Some(Instant::now() + shared.config.timeouts.read))
                };
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                if let Some(deadline) = frame_deadline
                    && Instant::now() >= deadline
                {
                    log::warn!("{peer}: timed out mid-frame");
                    break;
                }
            }
            Err(e) => {
                log::warn!("{peer}: read failed: {e}");
                break;
            }
        }
    }

    stream.close();
    shared.handler.on_connection_closed(peer);
    log::debug!("{peer}: connection closed");
}

#[cfg(feature = "tls")]
fn wrap_accepted(tcp: TcpStream, peer: SocketAddr, shared: &Shared) -> Option<Stream> {
    match &shared.acceptor {
        Some(acceptor) => match acceptor.accept(tcp) {
            Ok(wrapped) => Some(Stream::Tls(Box::new(wrapped))),
            Err(e) => {
                log::warn!("{peer}: TLS handshake failed: {e}");
                None
            }
        },
        None => Some(Stream::Plain(tcp)),
    }
}

#[cfg(not(feature = "tls"))]
fn wrap_accepted(tcp: TcpStream, _peer: SocketAddr, _shared: &Shared) -> Option<Stream> {
    Some(Stream::Plain(tcp))
}

/// Parse one inbound payload, dispatch it, and write the acknowledgment.
/// Returns `false` when the connection should be dropped.
fn respond(stream: &mut Stream, payload: Vec<u8>, peer: SocketAddr, shared: &Shared) -> bool {
    let parsed = String::from_utf8(payload)
        .map_err(|_| "frame payload is not valid UTF-8".to_string())
        .and_then(|text| {
            Message::parse(&text, &shared.registry).map_err(|e| format!("unparsable message: {e}"))
        });

    let reply = match parsed {
        Ok(message) => {
            log::debug!(
                "{peer}: received {} ({})",
                message.message_type.name(),
                message.version
            );
            let code = shared
                .handler
                .on_message(&message, peer)
                .unwrap_or(AckCode::Accept);
            build_ack(&shared.registry, &message, code, None)
        }
        Err(details) => {
            log::warn!("{peer}: {details}");
            build_reject(&shared.registry, &details)
        }
    };

    match reply {
        Ok(ack) => {
            if let Err(e) = write_frame(stream, &ack) {
                log::warn!("{peer}: failed to write acknowledgment: {e}");
                return false;
            }
            shared.handler.on_message_sent(&ack, peer);
            true
        }
        Err(e) => {
            // Registry too broken to build any reply; nothing sane to send.
            log::error!("{peer}: cannot build acknowledgment: {e}");
            false
        }
    }
}

fn send_reject(stream: &mut Stream, details: &str, peer: SocketAddr, shared: &Shared) -> bool {
    match build_reject(&shared.registry, details) {
        Ok(nak) => match write_frame(stream, &nak) {
            Ok(()) => {
                shared.handler.on_message_sent(&nak, peer);
                true
            }
            Err(e) => {
                log::warn!("{peer}: failed to write reject: {e}");
                false
            }
        },
        Err(e) => {
            log::error!("{peer}: cannot build reject: {e}");
            false
        }
    }
}

fn write_frame(stream: &mut Stream, message: &Message) -> Result<(), MllpError> {
    stream
        .write_all(&frame::encode(message.serialize().as_bytes()))
        .map_err(MllpError::WriteFailed)?;
    stream.flush().map_err(MllpError::WriteFailed)
}
