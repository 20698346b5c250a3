//! MLLP transport for HL7v2 — framing codec, client, and acknowledging
//! listener.
//!
//! MLLP (Minimal Lower Layer Protocol) wraps each HL7 message in a byte
//! envelope (`0x0B` … `0x1C 0x0D`) over TCP. The core API is synchronous
//! (`std::net`), with no async runtime required: [`MllpClient`] sends one
//! message and blocks for its acknowledgment, and [`MllpServer`] accepts
//! connections on a thread each, dispatching every inbound message to an
//! [`MllpHandler`] and acknowledging it.
//!
//! ```no_run
//! use std::sync::Arc;
//! use hl7_toolkit_mllp::{ClientConfig, MllpClient};
//! use hl7_toolkit_core::{Message, Registry};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(Registry::load_embedded());
//! let message = Message::parse("MSH|^~\\&|APP|FAC|||20240115083000||ADT^A01|C1|P|2.5.1\rEVN\rPID|1\rPV1|1", &registry)?;
//!
//! let mut client = MllpClient::connect("interface.local:2575", ClientConfig::default(), registry)?;
//! let ack = client.send(&message)?;
//! assert!(ack.is_positive());
//! # Ok(())
//! # }
//! ```

mod ack;
mod addr;
mod client;
mod config;
mod error;
mod frame;
mod server;
mod stream;

pub use ack::{AckCode, AckKind, Acknowledgment, build_ack, build_reject};
pub use addr::{DEFAULT_PORT, resolve_endpoint_addr};
pub use client::MllpClient;
#[cfg(feature = "tls")]
pub use config::{TlsClientConfig, TlsServerConfig};
pub use config::{ClientConfig, ServerConfig, Timeouts};
pub use error::MllpError;
pub use frame::{
    DEFAULT_MAX_FRAME_SIZE, END_BLOCK, MllpDecoder, START_BLOCK, TRAILER, encode,
};
pub use server::{MllpHandler, MllpServer, ServerHandle};
