//! PEM armoring for issued certificates and keys.
//!
//! Certificates are armored as `CERTIFICATE` blocks and private keys as
//! PKCS#1 `RSA PRIVATE KEY` blocks. A certificate and its key are always
//! encoded into separate strings.

use openssl::rsa::Rsa;
use openssl::x509::X509;

use crate::error::{ErrorKind, IssueError, Operation, Result};

/// PEM encode a DER certificate.
pub fn encode_certificate(certificate: &[u8]) -> Result<String> {
    let encoding = |e| IssueError::new(ErrorKind::Encoding, Operation::EncodeCertificate, e);

    let pem = X509::from_der(certificate)
        .and_then(|x509| x509.to_pem())
        .map_err(encoding)?;

    Ok(String::from_utf8_lossy(&pem).into_owned())
}

/// PEM encode a PKCS#1 DER RSA private key.
pub fn encode_key(key: &[u8]) -> Result<String> {
    let encoding = |e| IssueError::new(ErrorKind::Encoding, Operation::EncodeKey, e);

    let pem = Rsa::private_key_from_der(key)
        .and_then(|rsa| rsa.private_key_to_pem())
        .map_err(encoding)?;

    Ok(String::from_utf8_lossy(&pem).into_owned())
}
