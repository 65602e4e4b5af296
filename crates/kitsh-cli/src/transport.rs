//! Socket transport helpers for the kitsh RPC channel.
//!
//! The functions here establish TCP connections to the kitsune service,
//! optionally wrapping them in TLS, and expose the result as a uniform
//! [`Connection`] so the channel above stays transport agnostic.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use kitsh_config::Target;
use once_cell::sync::Lazy;
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};
use thiserror::Error;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

static TLS_CONFIG: Lazy<Arc<ClientConfig>> = Lazy::new(|| {
    let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    Arc::new(
        ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
});

/// Failures raised while talking to the kitsune service.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The target host did not resolve.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Target that failed to resolve.
        endpoint: String,
        /// Resolver error.
        source: io::Error,
    },
    /// The TCP connection could not be established.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Target that refused the connection.
        endpoint: String,
        /// Socket error.
        source: io::Error,
    },
    /// The host is not a valid TLS server name.
    #[error("'{0}' is not a valid TLS server name")]
    ServerName(String),
    /// The TLS session could not be created.
    #[error("failed to start TLS session: {0}")]
    Tls(#[from] rustls::Error),
    /// The request could not be encoded.
    #[error("failed to serialise request: {0}")]
    SerialiseRequest(serde_json::Error),
    /// Writing the request failed.
    #[error("failed to send request: {0}")]
    SendRequest(io::Error),
    /// Reading the response failed.
    #[error("failed to read response: {0}")]
    ReadResponse(io::Error),
    /// A response line was not a valid message.
    #[error("failed to parse response: {0}")]
    ParseMessage(serde_json::Error),
    /// The service closed the connection mid-call.
    #[error("connection closed before the call completed")]
    Closed,
    /// The service sent a message that does not belong to the call.
    #[error("unexpected '{kind}' message during {call} call")]
    UnexpectedMessage {
        /// Message kind received.
        kind: &'static str,
        /// Call style in progress.
        call: &'static str,
    },
    /// The service rejected the call.
    #[error("call rejected with status {code}: {message}")]
    Status {
        /// Status code reported by the service.
        code: i32,
        /// Status description.
        message: String,
    },
}

pub(crate) enum Connection {
    Tcp(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.read(buf),
            Self::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Tcp(stream) => stream.write(buf),
            Self::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Tcp(stream) => stream.flush(),
            Self::Tls(stream) => stream.flush(),
        }
    }
}

pub(crate) fn connect(target: &Target, ssl: bool) -> Result<Connection, TransportError> {
    let endpoint = target.to_string();
    let address = resolve_tcp_address(target.server_name(), target.port()).map_err(|source| {
        TransportError::Resolve {
            endpoint: endpoint.clone(),
            source,
        }
    })?;

    let stream = TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT)
        .map_err(|source| TransportError::Connect { endpoint, source })?;
    tracing::debug!(target: "kitsh::transport", %address, ssl, "connected");

    if !ssl {
        return Ok(Connection::Tcp(stream));
    }

    let server_name = ServerName::try_from(target.server_name().to_owned())
        .map_err(|_| TransportError::ServerName(target.server_name().to_owned()))?;
    let session = ClientConnection::new(Arc::clone(&TLS_CONFIG), server_name)?;
    Ok(Connection::Tls(Box::new(StreamOwned::new(session, stream))))
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut addrs = (host, port).to_socket_addrs()?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))
}
