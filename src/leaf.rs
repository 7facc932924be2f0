//! End-entity certificates.
//!
//! A [`Leaf`] is created by [`Authority::leaf`](crate::Authority::leaf) and
//! holds its signed certificate and its own RSA key. It cannot issue anything.

use openssl::pkey::{PKey, Private};
use std::fmt;

use crate::encoding;
use crate::error::{ErrorKind, IssueError, Operation, Result};

/// A leaf node in a certificate chain
pub struct Leaf {
    common_name: String,
    certificate: Vec<u8>,
    key: PKey<Private>,
}

impl Leaf {
    pub(crate) fn new(common_name: &str, certificate: Vec<u8>, key: PKey<Private>) -> Self {
        Self {
            common_name: common_name.to_string(),
            certificate,
            key,
        }
    }

    /// PEM encoded certificate for the leaf.
    pub fn encode_certificate(&self) -> Result<String> {
        encoding::encode_certificate(&self.certificate).map_err(|e| e.for_subject(&self.common_name))
    }

    /// PEM encoded PKCS#1 private key for the leaf.
    pub fn encode_key(&self) -> Result<String> {
        let der = self
            .key
            .rsa()
            .and_then(|rsa| rsa.private_key_to_der())
            .map_err(|e| {
                IssueError::new(ErrorKind::Encoding, Operation::EncodeKey, e)
                    .for_subject(&self.common_name)
            })?;
        encoding::encode_key(&der).map_err(|e| e.for_subject(&self.common_name))
    }

    /// DER bytes of the signed certificate.
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }
}

impl fmt::Debug for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("common_name", &self.common_name)
            .field("key", &"<redacted>")
            .finish()
    }
}
