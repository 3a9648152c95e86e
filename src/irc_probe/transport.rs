use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_native_tls::TlsConnector as TokioTlsConnector;

use crate::error::Result;

/// Anything the handshake can read from and write to.
pub trait ProbeStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> ProbeStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type BoxedStream = Box<dyn ProbeStream>;

/// Setup a TLS connector that accepts invalid certificates and hostnames.
/// Probed gateways routinely run with self-signed certificates.
pub fn insecure_tls_connector() -> std::result::Result<TokioTlsConnector, native_tls::Error> {
    let mut builder = native_tls::TlsConnector::builder();
    builder.danger_accept_invalid_certs(true);
    builder.danger_accept_invalid_hostnames(true);
    let connector = builder.build()?;
    Ok(TokioTlsConnector::from(connector))
}

/// Open a stream to `host:port`, negotiating TLS on top when `secure` is set.
///
/// A refused connection comes back as `ProbeError::Transport` carrying
/// `ErrorKind::ConnectionRefused`; the caller decides what that means.
pub async fn open_stream(host: &str, port: u16, secure: bool) -> Result<BoxedStream> {
    let stream = TcpStream::connect((host, port)).await?;
    log::debug!("TCP connection to {host}:{port} established");

    if !secure {
        return Ok(Box::new(stream));
    }

    let connector = insecure_tls_connector()?;
    let tls_stream = connector.connect(host, stream).await?;
    log::debug!("TLS negotiated with {host}:{port}");
    Ok(Box::new(tls_stream))
}
