use crate::{error::ErrorReason, types::Target};
use anyhow::{Context, Result as AnyResult};
use rustls_pki_types::{CertificateDer, ServerName};
use std::{
    io::{Error as IoError, ErrorKind as IoErrorKind},
    sync::Arc,
    time::Duration,
};
use tokio::{net::TcpStream, time::timeout};
use tokio_rustls::{rustls::ClientConfig, TlsConnector};

mod certificate_interceptor;

pub use certificate_interceptor::CertificateInterceptor;

/// Fetches the certificate chain a TLS server presents.
#[derive(Clone, Debug)]
pub struct ChainFetcher {
    timeout: Duration,
    default_port: u16,
    sni_fallback: bool,
}

impl ChainFetcher {
    pub fn new(timeout: Duration, default_port: u16, sni_fallback: bool) -> Self {
        Self {
            timeout,
            default_port,
            sni_fallback,
        }
    }

    /// Try with SNI first. Some servers only answer without it, so retry
    /// once without SNI when allowed.
    pub async fn fetch(&self, target: &Target) -> AnyResult<Vec<CertificateDer<'static>>> {
        match self.fetch_once(target, true).await {
            Ok(certs) => Ok(certs),
            Err(e) if self.sni_fallback => {
                warn!("Fetching {} with SNI failed ({:#}), retrying without SNI", target, e);
                self.fetch_once(target, false)
                    .await
                    .with_context(|| format!("Failed to fetch certificates from {}", target))
            }
            Err(e) => Err(e.context(format!("Failed to fetch certificates from {}", target))),
        }
    }

    async fn fetch_once(
        &self,
        target: &Target,
        sni: bool,
    ) -> AnyResult<Vec<CertificateDer<'static>>> {
        let mut interceptor = Arc::new(CertificateInterceptor::with_webpki_roots()?);
        let mut tls_config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(interceptor.clone())
            .with_no_client_auth();
        tls_config.enable_sni = sni;

        let connector = TlsConnector::from(Arc::new(tls_config));
        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|_| ErrorReason::InvalidTarget)?;

        let address = target.socket_address(self.default_port);
        debug!("Connecting to {} (SNI: {})", address, sni);
        let stream = timeout(self.timeout, TcpStream::connect(&address))
            .await
            .with_context(|| format!("Connection to {} timed out", address))??;

        let conn_result = match timeout(self.timeout, connector.connect(server_name, stream)).await
        {
            Ok(conn_result) => conn_result.map(|_| ()),
            Err(elapsed) => Err(IoError::new(IoErrorKind::TimedOut, elapsed)),
        };
        // Drop the connection here to make the interceptor's reference count decrease to 1
        drop(connector);

        let interceptor_inner = Arc::make_mut(&mut interceptor);
        let Some(certificates) = interceptor_inner.take_certificates() else {
            // Didn't get certificates, might be connection error
            if let Err(err) = conn_result {
                return Err(err.into());
            } else {
                return Err(ErrorReason::NoPeerCertificates.into());
            }
        };

        if let Err(e) = conn_result {
            // Expected for untrusted or expired chains
            info!("Handshake with {} did not complete: {}", address, e);
        }

        Ok(certificates)
    }
}
