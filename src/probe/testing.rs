//! Self-signed TLS server side for exercising the insecure client paths.

use tokio_native_tls::TlsAcceptor;

const CERT_PEM: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/localhost.pem"));
const KEY_PEM: &[u8] = include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/localhost.key"));

/// Acceptor presenting a certificate for `localhost`/`127.0.0.1` that no
/// trust store knows about.
pub(crate) fn self_signed_acceptor() -> TlsAcceptor {
    let identity = native_tls::Identity::from_pkcs8(CERT_PEM, KEY_PEM).unwrap();
    TlsAcceptor::from(native_tls::TlsAcceptor::new(identity).unwrap())
}
