//! TLS configuration and certificate loading.
//!
//! # Responsibilities
//! - Validate the certificate file before any socket is created
//! - Parse one PEM file into a certificate chain and private key
//! - Build the server-side TLS configuration for `ssl` listeners
//! - Build the client-side configuration that accepts any server certificate
//!
//! # Design Decisions
//! - One PEM file carries both certificate chain and key, in any order
//! - Peer verification is disabled on both sides; self-signed deployments are
//!   the primary target
//! - Encrypted PEM private keys are unsupported; a configured passphrase on
//!   such a key is reported as a certificate error, not ignored

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, ServerConfig, SignatureScheme};

use crate::net::error::{SocketError, SocketResult};

/// TLS options injected into a connection context before listening.
#[derive(Debug, Clone)]
pub struct TlsOptions {
    /// PEM file holding the certificate chain and private key.
    pub cert_path: PathBuf,
    /// Private key passphrase; `None` when empty.
    pub passphrase: Option<String>,
    /// Self-signed certificates are always acceptable.
    pub allow_self_signed: bool,
    /// Peer certificates are never requested or verified.
    pub verify_peer: bool,
}

impl TlsOptions {
    pub fn new(cert_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            passphrase: None,
            allow_self_signed: true,
            verify_peer: false,
        }
    }

    /// Set the private key passphrase; empty strings count as absent.
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        let passphrase = passphrase.into();
        self.passphrase = if passphrase.is_empty() {
            None
        } else {
            Some(passphrase)
        };
        self
    }
}

/// Check that the certificate path names a readable regular file.
///
/// Runs before any context or socket is allocated, so a bad path never costs
/// an OS resource.
pub fn validate_cert_file(path: &Path) -> SocketResult<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(SocketError::Certificate(format!(
            "certificate path {} is not a regular file",
            path.display()
        ))),
        Err(err) => Err(SocketError::Certificate(format!(
            "certificate file {} is not readable: {}",
            path.display(),
            err
        ))),
    }
}

/// Make sure a process-default crypto provider is installed, then return it.
fn crypto_provider() -> Arc<CryptoProvider> {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        // a racing install elsewhere in the process is fine; first one wins
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    });
    CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()))
}

/// Parse one PEM file into its certificate chain and private key.
fn load_pem(
    path: &Path,
) -> SocketResult<(Vec<CertificateDer<'static>>, Option<PrivateKeyDer<'static>>)> {
    let file = File::open(path).map_err(|err| {
        SocketError::Certificate(format!("failed to open {}: {}", path.display(), err))
    })?;
    let mut reader = BufReader::new(file);

    let mut certs = Vec::new();
    let mut key = None;
    loop {
        match rustls_pemfile::read_one(&mut reader) {
            Ok(Some(rustls_pemfile::Item::X509Certificate(cert))) => certs.push(cert),
            Ok(Some(rustls_pemfile::Item::Pkcs1Key(der))) => {
                if key.is_none() {
                    key = Some(PrivateKeyDer::Pkcs1(der));
                }
            }
            Ok(Some(rustls_pemfile::Item::Pkcs8Key(der))) => {
                if key.is_none() {
                    key = Some(PrivateKeyDer::Pkcs8(der));
                }
            }
            Ok(Some(rustls_pemfile::Item::Sec1Key(der))) => {
                if key.is_none() {
                    key = Some(PrivateKeyDer::Sec1(der));
                }
            }
            // other section types (CRLs, CSRs, encrypted keys) are skipped
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(err) => {
                return Err(SocketError::Certificate(format!(
                    "malformed PEM in {}: {}",
                    path.display(),
                    err
                )))
            }
        }
    }
    Ok((certs, key))
}

/// Build the server-side TLS configuration from the injected options.
pub fn build_server_config(options: &TlsOptions) -> SocketResult<Arc<ServerConfig>> {
    let _ = crypto_provider();
    let (certs, key) = load_pem(&options.cert_path)?;
    if certs.is_empty() {
        return Err(SocketError::Certificate(format!(
            "no certificate found in {}",
            options.cert_path.display()
        )));
    }
    let key = match key {
        Some(key) => key,
        None if options.passphrase.is_some() => {
            return Err(SocketError::Certificate(format!(
                "no usable private key in {}; encrypted PEM keys are not supported, provide the key unencrypted",
                options.cert_path.display()
            )));
        }
        None => {
            return Err(SocketError::Certificate(format!(
                "no private key found in {}",
                options.cert_path.display()
            )));
        }
    };

    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| {
            SocketError::Certificate(format!(
                "invalid certificate or key in {}: {}",
                options.cert_path.display(),
                err
            ))
        })?;
    Ok(Arc::new(config))
}

/// Build a client-side TLS configuration that accepts any server certificate.
///
/// Used for outbound `ssl` connections; peer verification is disabled by
/// design, so self-signed servers handshake successfully.
pub fn build_client_config() -> Arc<ClientConfig> {
    let provider = crypto_provider();
    let verifier = Arc::new(AcceptAnyServerCert {
        provider: provider.clone(),
    });
    let config = ClientConfig::builder()
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();
    Arc::new(config)
}

/// Certificate verifier that accepts any presented server certificate while
/// still checking handshake signatures against the provider's algorithms.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
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
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.pem");
        let err = validate_cert_file(&missing).unwrap_err();
        assert!(matches!(err, SocketError::Certificate(_)));
        assert!(err.to_string().contains("absent.pem"));
    }

    #[test]
    fn test_validate_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_cert_file(dir.path()).unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[test]
    fn test_empty_passphrase_counts_as_absent() {
        let options = TlsOptions::new("/tmp/server.pem").with_passphrase("");
        assert!(options.passphrase.is_none());
        let options = TlsOptions::new("/tmp/server.pem").with_passphrase("secret");
        assert_eq!(options.passphrase.as_deref(), Some("secret"));
    }

    #[test]
    fn test_options_defaults() {
        let options = TlsOptions::new("/tmp/server.pem");
        assert!(options.allow_self_signed);
        assert!(!options.verify_peer);
        assert!(options.passphrase.is_none());
    }
}
