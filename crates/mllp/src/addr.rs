//! Endpoint address resolution.
//!
//! Handles the formats users pass as MLLP endpoints: `IP`, `IP:PORT`,
//! `hostname`, `hostname:PORT`. Defaults to port 2575, the IANA-registered
//! HL7 MLLP port.

use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::MllpError;

/// Default MLLP port (IANA `hl7` service).
pub const DEFAULT_PORT: u16 = 2575;

/// Resolve a user-provided endpoint string to a `SocketAddr`.
///
/// Accepts these formats:
/// - `10.0.4.21:2575` -- IP with explicit port
/// - `10.0.4.21` -- IP without port (defaults to 2575)
/// - `interface.hospital.local:2575` -- hostname with port
/// - `interface.hospital.local` -- hostname without port (defaults to 2575)
///
/// Returns the first resolved address. For hostnames that resolve to
/// multiple addresses (dual-stack), the first result is used.
pub fn resolve_endpoint_addr(input: &str) -> Result<SocketAddr, MllpError> {
    // 1. Full socket address (e.g., "10.0.4.21:2575" or "[::1]:2575")
    if let Ok(addr) = input.parse::<SocketAddr>() {
        return Ok(addr);
    }

    // 2. Bare IP without port
    if let Ok(ip) = input.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    // 3. host:port via DNS
    if let Ok(mut addrs) = input.to_socket_addrs()
        && let Some(addr) = addrs.next()
    {
        return Ok(addr);
    }

    // 4. Bare hostname via DNS with the default port
    if let Ok(mut addrs) = (input, DEFAULT_PORT).to_socket_addrs()
        && let Some(addr) = addrs.next()
    {
        return Ok(addr);
    }

    Err(MllpError::NoAddressFound(input.to_string()))
}
