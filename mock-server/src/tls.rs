//! HTTPS peer presenting a freshly generated self-signed certificate.

use std::sync::Arc;

use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::ServerConfig;
use tokio::{io::AsyncWriteExt, net::TcpListener};
use tokio_rustls::TlsAcceptor;

use crate::faults::read_request_head;

/// Body served by [`run_self_signed`].
pub const SECURE_BODY: &[u8] = b"secure";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Acceptor for a certificate valid for `localhost` and `127.0.0.1`, signed
/// by nobody a client trusts.
pub fn self_signed_acceptor() -> Result<TlsAcceptor, BoxError> {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string(), "127.0.0.1".to_string()])?;
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));

    let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)?;
    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Serve [`SECURE_BODY`] over TLS to every request. Failed handshakes are
/// logged and dropped.
pub async fn run_self_signed(listener: TcpListener) -> Result<(), std::io::Error> {
    let acceptor = self_signed_acceptor().map_err(std::io::Error::other)?;
    loop {
        let (stream, _) = listener.accept().await?;
        let acceptor = acceptor.clone();
        tokio::spawn(async move {
            let mut tls = match acceptor.accept(stream).await {
                Ok(tls) => tls,
                Err(e) => {
                    tracing::debug!("tls handshake failed: {e}");
                    return;
                }
            };
            if read_request_head(&mut tls).await.is_err() {
                return;
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                SECURE_BODY.len()
            );
            let _ = tls.write_all(head.as_bytes()).await;
            let _ = tls.write_all(SECURE_BODY).await;
            let _ = tls.shutdown().await;
        });
    }
}
