use crate::error::ServerError;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

fn load_certs(cert_path: &Path) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let cert_file = fs::File::open(cert_path).map_err(|err| {
        ServerError::Tls(format!(
            "could not open certificate file {}: {err}",
            cert_path.display()
        ))
    })?;

    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| ServerError::Tls(format!("malformed certificate PEM: {err}")))?;

    if certs.is_empty() {
        return Err(ServerError::Tls(format!(
            "no certificates found in {}",
            cert_path.display()
        )));
    }

    Ok(certs)
}

fn load_key(key_path: &Path) -> Result<PrivateKeyDer<'static>, ServerError> {
    let key_file = fs::File::open(key_path).map_err(|err| {
        ServerError::Tls(format!(
            "could not open key file {}: {err}",
            key_path.display()
        ))
    })?;

    rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .map_err(|err| ServerError::Tls(format!("malformed key PEM: {err}")))?
        .ok_or_else(|| {
            ServerError::Tls(format!("no private key found in {}", key_path.display()))
        })
}

/// Builds the TLS context shared by every connection. Fails when the PEM
/// material cannot be loaded or the key does not belong to the certificate;
/// rustls checks the pairing inside `with_single_cert`.
pub(crate) fn build_tls_config(
    cert_path: &Path,
    key_path: &Path,
) -> Result<Arc<rustls::ServerConfig>, ServerError> {
    let certs = load_certs(cert_path)?;
    let key = load_key(key_path)?;

    let tls_config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|err| ServerError::Tls(format!("certificate/key rejected: {err}")))?;

    Ok(Arc::new(tls_config))
}
