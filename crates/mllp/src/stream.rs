//! Socket plumbing shared by the client and the listener: connect with
//! timeout, keepalive/NODELAY configuration, and the optional TLS wrap.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};

use crate::MllpError;
use crate::config::Timeouts;

/// A connection that is either plain TCP or TLS over TCP.
pub(crate) enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<native_tls::TlsStream<TcpStream>>),
}

impl Stream {
    /// The underlying TCP stream, for socket-level operations.
    pub(crate) fn tcp(&self) -> &TcpStream {
        match self {
            Stream::Plain(s) => s,
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.get_ref(),
        }
    }

    /// Best-effort shutdown of both directions.
    pub(crate) fn close(&self) {
        let _ = self.tcp().shutdown(Shutdown::Both);
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.flush(),
        }
    }
}

/// Open a TCP connection with the connect timeout and configure it.
pub(crate) fn open_tcp(addr: &SocketAddr, timeouts: &Timeouts) -> Result<TcpStream, MllpError> {
    let stream = TcpStream::connect_timeout(addr, timeouts.connect).map_err(|e| match e.kind() {
        io::ErrorKind::ConnectionRefused => MllpError::ConnectionRefused {
            addr: addr.to_string(),
            source: e,
        },
        io::ErrorKind::TimedOut => MllpError::ConnectionTimeout {
            addr: addr.to_string(),
            timeout: timeouts.connect,
            source: e,
        },
        _ => MllpError::ConnectionFailed {
            addr: addr.to_string(),
            source: e,
        },
    })?;

    configure_socket(&stream, timeouts.read, timeouts.write).map_err(|e| {
        MllpError::ConnectionFailed {
            addr: addr.to_string(),
            source: e,
        }
    })?;
    Ok(stream)
}

/// Configure NODELAY, keepalive, and read/write timeouts on a socket.
pub(crate) fn configure_socket(
    stream: &TcpStream,
    read_timeout: Duration,
    write_timeout: Duration,
) -> io::Result<()> {
    // Acknowledgment exchanges are small request/reply pairs; Nagle only
    // adds latency.
    stream.set_nodelay(true)?;
    configure_keepalive(stream, Duration::from_secs(60))?;
    stream.set_write_timeout(Some(write_timeout))?;
    stream.set_read_timeout(Some(read_timeout))?;
    Ok(())
}

/// Configure TCP keepalive via `socket2`.
fn configure_keepalive(stream: &TcpStream, interval: Duration) -> io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(interval);

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    let keepalive = keepalive.with_interval(interval);

    SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
    Ok(())
}
