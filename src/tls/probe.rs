use super::cert_info;
use crate::result::TlsInfo;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use rustls::{
    ClientConfig, DigitallySignedStruct, SignatureScheme,
    client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    crypto::ring,
    pki_types::{CertificateDer, ServerName, UnixTime},
};
use std::{net::IpAddr, sync::Arc};
use tokio::{io::AsyncWriteExt, net::TcpStream};
use tokio_rustls::{TlsConnector, client::TlsStream};

/// Open a TLS connection to `host:port` without verifying trust and return
/// the leaf certificate details.
///
/// Returns `Ok(None)` when the server presented no certificate.
///
/// # Errors
///
/// Returns an error if the TCP connection, TLS handshake, or certificate parsing fails.
pub async fn inspect_certificate(host: &str, port: u16) -> Result<Option<TlsInfo>> {
    let stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("failed to connect to {host}:{port} for TLS inspection"))?;

    let connector = TlsConnector::from(Arc::new(insecure_client_config()?));
    let server_name = server_name_from_host(host)
        .with_context(|| format!("invalid server name for TLS inspection: {host}"))?;
    let mut tls_stream = connector
        .connect(server_name, stream)
        .await
        .with_context(|| format!("failed to complete TLS handshake with {host}:{port}"))?;

    let info = extract_info_from_tls_stream(&tls_stream);
    let _ = tls_stream.shutdown().await;
    info
}

/// Client config that accepts any certificate.
///
/// The ring provider is handed to the builder directly so nothing is
/// installed process-wide.
///
/// # Errors
///
/// Returns an error if the provider does not support the default protocol versions
pub fn insecure_client_config() -> Result<ClientConfig> {
    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .context("failed to select TLS protocol versions")?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(NoVerifier))
        .with_no_client_auth();

    Ok(config)
}

/// Build a rustls server name from a hostname or IP literal
///
/// # Errors
///
/// Returns an error if `host` is neither a valid DNS name nor an IP address
pub fn server_name_from_host(host: &str) -> Result<ServerName<'static>> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.parse::<IpAddr>().map_or_else(
        |_| {
            ServerName::try_from(host.to_string())
                .map_err(|_| anyhow!("invalid server name: {host}"))
        },
        |ip| Ok(ServerName::from(ip)),
    )
}

fn extract_info_from_tls_stream(stream: &TlsStream<TcpStream>) -> Result<Option<TlsInfo>> {
    let (_, connection) = stream.get_ref();
    let Some(cert) = connection.peer_certificates().and_then(<[_]>::first) else {
        return Ok(None);
    };

    cert_info(cert.as_ref(), Utc::now()).map(Some)
}

/// Accepts any certificate. Only used on the inspection connection, which
/// carries no request data.
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        ring::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}
