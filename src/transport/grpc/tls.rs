//! Connection options and TLS setup for the gRPC transport

use crate::error::{EmbeddingsError, Result};
use crate::transport::{parse_bool, query_param};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

pub const PARAM_CERTIFICATE: &str = "tls-certificate";
pub const PARAM_KEY: &str = "tls-key";
pub const PARAM_CA_CERTIFICATE: &str = "tls-ca-certificate";
pub const PARAM_INSECURE: &str = "tls-insecure";

const DEFAULT_PLAINTEXT_PORT: u16 = 80;
const DEFAULT_TLS_PORT: u16 = 443;

/// Options read from a `grpc://` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcOptions {
    pub host: String,
    pub port: u16,
    pub tls: Option<TlsOptions>,
}

/// Client TLS material; only present when both certificate and key are given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    pub certificate: PathBuf,
    pub key: PathBuf,
    pub ca_certificate: Option<PathBuf>,
    pub insecure: bool,
}

impl GrpcOptions {
    pub fn from_uri(uri: &Url) -> Result<Self> {
        let host = uri
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| EmbeddingsError::invalid_uri(uri.as_str(), "missing host"))?
            .to_string();

        let certificate = query_param(uri, PARAM_CERTIFICATE);
        let key = query_param(uri, PARAM_KEY);

        let tls = match (certificate, key) {
            (Some(certificate), Some(key)) => {
                let ca_certificate = query_param(uri, PARAM_CA_CERTIFICATE).map(PathBuf::from);

                // A CA bundle takes precedence over skipping verification.
                let insecure = match (&ca_certificate, query_param(uri, PARAM_INSECURE)) {
                    (None, Some(value)) => parse_bool(PARAM_INSECURE, &value)?,
                    _ => false,
                };

                Some(TlsOptions {
                    certificate: PathBuf::from(certificate),
                    key: PathBuf::from(key),
                    ca_certificate,
                    insecure,
                })
            }
            _ => None,
        };

        let port = uri.port().unwrap_or(if tls.is_some() {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PLAINTEXT_PORT
        });

        Ok(Self { host, port, tls })
    }

    /// `host:port` authority for the channel endpoint
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Build the rustls client configuration for `opts`
///
/// The CA bundle is read before the client identity, so a bad CA file is
/// always reported as a CA certificate error.
pub fn client_config(opts: &TlsOptions) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let roots = opts
        .ca_certificate
        .as_deref()
        .map(load_ca_roots)
        .transpose()?;

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| EmbeddingsError::TlsConfiguration(e.to_string()))?;

    let builder = match roots {
        Some(roots) => builder.with_root_certificates(roots),
        None if opts.insecure => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider))),
        None => builder.with_root_certificates(webpki_roots()),
    };

    let certs = load_certificates(&opts.certificate)?;
    let key = load_private_key(&opts.key)?;

    let mut config = builder.with_client_auth_cert(certs, key).map_err(|e| {
        EmbeddingsError::TlsConfiguration(format!("Failed to load TLS pair, {}", e))
    })?;

    config.alpn_protocols = vec![b"h2".to_vec()];
    Ok(config)
}

fn webpki_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

fn load_ca_roots(path: &Path) -> Result<RootCertStore> {
    let ca_error = |reason: String| EmbeddingsError::CaCertificate {
        path: path.display().to_string(),
        reason,
    };

    let pem = std::fs::read(path).map_err(|e| ca_error(e.to_string()))?;

    let certs = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ca_error(e.to_string()))?;

    if certs.is_empty() {
        return Err(ca_error("no PEM certificates found".to_string()));
    }

    let mut roots = RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(certs);

    if added == 0 {
        return Err(ca_error(format!("none of {} certificates could be parsed", ignored)));
    }

    Ok(roots)
}

fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = std::fs::File::open(path).map_err(|e| {
        EmbeddingsError::TlsConfiguration(format!(
            "Failed to open certificate '{}': {}",
            path.display(),
            e
        ))
    })?;

    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            EmbeddingsError::TlsConfiguration(format!(
                "Failed to parse certificate '{}': {}",
                path.display(),
                e
            ))
        })?;

    if certs.is_empty() {
        return Err(EmbeddingsError::TlsConfiguration(format!(
            "No certificates found in '{}'",
            path.display()
        )));
    }

    Ok(certs)
}

fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = std::fs::File::open(path).map_err(|e| {
        EmbeddingsError::TlsConfiguration(format!("Failed to open key '{}': {}", path.display(), e))
    })?;

    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| {
            EmbeddingsError::TlsConfiguration(format!(
                "Failed to parse key '{}': {}",
                path.display(),
                e
            ))
        })?
        .ok_or_else(|| {
            EmbeddingsError::TlsConfiguration(format!("No private key found in '{}'", path.display()))
        })
}

/// Verifier installed for `tls-insecure=true`: accepts any server certificate
/// but still checks handshake signatures.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn options(query: &str) -> Result<GrpcOptions> {
        GrpcOptions::from_uri(&Url::parse(&format!("grpc://embed.local:9000?{}", query)).unwrap())
    }

    #[test]
    fn test_plaintext_without_identity() {
        let opts = options("").unwrap();
        assert_eq!(opts.authority(), "embed.local:9000");
        assert!(opts.tls.is_none());

        // Only one half of the pair still means plaintext.
        let opts = options("tls-certificate=/c.pem").unwrap();
        assert!(opts.tls.is_none());
    }

    #[test]
    fn test_insecure_alone_is_plaintext() {
        let opts = options("tls-insecure=true").unwrap();
        assert!(opts.tls.is_none());
    }

    #[test]
    fn test_insecure_with_identity() {
        let opts = options("tls-certificate=/c.pem&tls-key=/k.pem&tls-insecure=true").unwrap();
        let tls = opts.tls.unwrap();
        assert!(tls.insecure);
        assert_eq!(tls.ca_certificate, None);
    }

    #[test]
    fn test_ca_takes_precedence_over_insecure() {
        let opts = options(
            "tls-certificate=/c.pem&tls-key=/k.pem&tls-ca-certificate=/ca.pem&tls-insecure=true",
        )
        .unwrap();
        let tls = opts.tls.unwrap();
        assert!(!tls.insecure);
        assert_eq!(tls.ca_certificate, Some(PathBuf::from("/ca.pem")));
    }

    #[test]
    fn test_bad_insecure_flag() {
        let err = options("tls-certificate=/c.pem&tls-key=/k.pem&tls-insecure=maybe").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TlsConfiguration);
    }

    #[test]
    fn test_default_ports() {
        let plain = GrpcOptions::from_uri(&Url::parse("grpc://embed.local").unwrap()).unwrap();
        assert_eq!(plain.port, 80);

        let tls = GrpcOptions::from_uri(
            &Url::parse("grpc://embed.local?tls-certificate=/c.pem&tls-key=/k.pem").unwrap(),
        )
        .unwrap();
        assert_eq!(tls.port, 443);
    }

    #[test]
    fn test_missing_host() {
        let err = GrpcOptions::from_uri(&Url::parse("grpc:///path-only").unwrap()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUri);
    }

    #[test]
    fn test_non_pem_ca_rejected() {
        let mut ca = tempfile::NamedTempFile::new().unwrap();
        writeln!(ca, "this is not a certificate").unwrap();

        let opts = TlsOptions {
            certificate: PathBuf::from("/nonexistent/client.pem"),
            key: PathBuf::from("/nonexistent/client.key"),
            ca_certificate: Some(ca.path().to_path_buf()),
            insecure: false,
        };

        let err = client_config(&opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CaCertificate);
    }

    #[test]
    fn test_missing_identity_files() {
        let opts = TlsOptions {
            certificate: PathBuf::from("/nonexistent/client.pem"),
            key: PathBuf::from("/nonexistent/client.key"),
            ca_certificate: None,
            insecure: true,
        };

        let err = client_config(&opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TlsConfiguration);
    }
}
