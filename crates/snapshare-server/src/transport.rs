//! QUIC transport.
//!
//! Each client opens one QUIC connection. The client sends request frames on
//! a single bidirectional stream; the server pushes every outbound frame
//! (replies and broadcasts alike) on one unidirectional stream it opens per
//! connection, so frames to a given client arrive in the order the driver
//! emitted them.
//!
//! ALPN is `snapshare/1`. Without a certificate pair the endpoint falls back
//! to a self-signed `localhost` certificate, which is only fit for local use.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};

use quinn::{Endpoint, RecvStream, SendStream, ServerConfig};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use snapshare_proto::ALPN_PROTOCOL;

use crate::error::ServerError;

/// Where the endpoint's TLS identity comes from.
#[derive(Debug, Clone)]
pub enum TlsIdentity {
    /// PEM certificate chain and private key on disk
    Pem {
        /// Certificate chain
        cert_path: PathBuf,
        /// Private key
        key_path: PathBuf,
    },
    /// Generate a throwaway self-signed certificate for `localhost`
    SelfSigned,
}

impl TlsIdentity {
    /// Pick PEM files when both paths are given, otherwise self-signed.
    pub fn from_paths(cert_path: Option<PathBuf>, key_path: Option<PathBuf>) -> Self {
        match (cert_path, key_path) {
            (Some(cert_path), Some(key_path)) => Self::Pem { cert_path, key_path },
            _ => Self::SelfSigned,
        }
    }
}

/// Listening QUIC endpoint.
pub struct QuinnTransport {
    endpoint: Endpoint,
}

impl QuinnTransport {
    /// Bind a QUIC endpoint on `address`.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` for an unparsable address or unusable TLS
    ///   material
    /// - `ServerError::Transport` if the socket cannot be bound
    pub fn bind(address: &str, identity: &TlsIdentity) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let (certs, key) = match identity {
            TlsIdentity::Pem { cert_path, key_path } => load_pem(cert_path, key_path)?,
            TlsIdentity::SelfSigned => self_signed()?,
        };

        let endpoint = Endpoint::server(server_config(certs, key)?, addr)
            .map_err(|e| ServerError::Transport(format!("failed to create endpoint: {e}")))?;

        tracing::info!(%addr, "QUIC transport bound");

        Ok(Self { endpoint })
    }

    /// Wait for the next incoming connection and complete its handshake.
    ///
    /// Returns `None` once the endpoint is closed. A failed handshake yields
    /// `Some(Err(ServerError::Transport))`.
    pub async fn accept(&self) -> Option<Result<QuinnConnection, ServerError>> {
        let incoming = self.endpoint.accept().await?;

        Some(
            incoming
                .await
                .map(|connection| QuinnConnection { connection })
                .map_err(|e| ServerError::Transport(format!("handshake failed: {e}"))),
        )
    }

    /// Stop accepting and close every connection.
    pub fn close(&self) {
        self.endpoint.close(quinn::VarInt::from_u32(0), b"shutdown");
    }

    /// Local address the endpoint is bound to.
    ///
    /// # Errors
    ///
    /// - `ServerError::Transport` if the socket address cannot be read
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.endpoint
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}

/// An established QUIC connection. Clones share the connection.
#[derive(Clone)]
pub struct QuinnConnection {
    connection: quinn::Connection,
}

impl QuinnConnection {
    /// Accept the client's request stream.
    ///
    /// # Errors
    ///
    /// - `ServerError::Transport` if the connection closed first
    pub async fn accept_bi(&self) -> Result<(SendStream, RecvStream), ServerError> {
        self.connection
            .accept_bi()
            .await
            .map_err(|e| ServerError::Transport(format!("accept_bi failed: {e}")))
    }

    /// Open the server-to-client push stream.
    ///
    /// # Errors
    ///
    /// - `ServerError::Transport` if the connection closed first
    pub async fn open_uni(&self) -> Result<SendStream, ServerError> {
        self.connection
            .open_uni()
            .await
            .map_err(|e| ServerError::Transport(format!("open_uni failed: {e}")))
    }

    /// Remote peer address.
    pub fn remote_addr(&self) -> SocketAddr {
        self.connection.remote_address()
    }

    /// Close with an application error code and reason.
    pub fn close(&self, error_code: u32, reason: &str) {
        self.connection.close(quinn::VarInt::from_u32(error_code), reason.as_bytes());
    }
}

fn load_pem(
    cert_path: &Path,
    key_path: &Path,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ServerError> {
    let read = |path: &Path| {
        std::fs::read(path)
            .map_err(|e| ServerError::Config(format!("failed to read '{}': {e}", path.display())))
    };
    let cert_pem = read(cert_path)?;
    let key_pem = read(key_path)?;

    let certs = rustls_pemfile::certs(&mut &cert_pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ServerError::Config(format!("failed to parse certificates: {e}")))?;
    if certs.is_empty() {
        return Err(ServerError::Config(format!("no certificate in '{}'", cert_path.display())));
    }

    let key = rustls_pemfile::private_key(&mut &key_pem[..])
        .map_err(|e| ServerError::Config(format!("failed to parse private key: {e}")))?
        .ok_or_else(|| ServerError::Config(format!("no private key in '{}'", key_path.display())))?;

    Ok((certs, key))
}

fn self_signed() -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), ServerError> {
    let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
        .map_err(|e| ServerError::Config(format!("failed to generate self-signed cert: {e}")))?;

    let key = PrivatePkcs8KeyDer::from(cert.key_pair.serialize_der());

    tracing::warn!("using a self-signed certificate; not for production use");

    Ok((vec![cert.cert.der().clone()], key.into()))
}

fn server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> Result<ServerConfig, ServerError> {
    let mut tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| ServerError::Config(format!("invalid TLS config: {e}")))?;

    tls_config.alpn_protocols = vec![ALPN_PROTOCOL.to_vec()];

    let crypto = quinn::crypto::rustls::QuicServerConfig::try_from(tls_config)
        .map_err(|e| ServerError::Config(format!("QUIC config error: {e}")))?;

    Ok(ServerConfig::with_crypto(Arc::new(crypto)))
}
