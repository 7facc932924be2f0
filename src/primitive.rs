//! Key generation and certificate signing.
//!
//! This is the only place that touches OpenSSL's X.509 builder. Randomness
//! and time are explicit dependencies: key pairs come from a [`KeySource`] and
//! the current time from a [`Clock`], so tests can substitute either.

use chrono::{DateTime, Utc};
use openssl::asn1::Asn1Time;
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::extension::{
    BasicConstraints, ExtendedKeyUsage, KeyUsage, SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::X509;
use tracing::debug;

use crate::certificate_template::CertificateTemplate;

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2

/// Source of RSA key pairs
pub trait KeySource: Send + Sync {
    fn generate(&self, bits: u32) -> Result<Rsa<Private>, ErrorStack>;
}

/// Generates fresh keys from OpenSSL's system-seeded RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct OpensslKeySource;

impl KeySource for OpensslKeySource {
    fn generate(&self, bits: u32) -> Result<Rsa<Private>, ErrorStack> {
        Rsa::generate(bits)
    }
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Generate an RSA key pair of `bits` bits and wrap it for signing.
pub fn generate_key(source: &dyn KeySource, bits: u32) -> Result<PKey<Private>, ErrorStack> {
    let rsa = source.generate(bits)?;
    debug!(bits, "generated RSA key pair");
    PKey::from_rsa(rsa)
}

/// Create a DER certificate for `template`, issued under `parent` and signed
/// with `parent_key`.
///
/// A self-signed certificate passes the same template and key on both sides.
pub fn create_certificate(
    template: &CertificateTemplate,
    parent: &CertificateTemplate,
    key: &PKey<Private>,
    parent_key: &PKey<Private>,
) -> Result<Vec<u8>, ErrorStack> {
    let mut builder = X509::builder()?;
    builder.set_version(X509_VERSION_3)?;

    let serial = template.serial_number().to_asn1_integer()?;
    builder.set_serial_number(&serial)?;

    let subject_name = template.subject_name()?;
    builder.set_subject_name(&subject_name)?;
    let issuer_name = parent.subject_name()?;
    builder.set_issuer_name(&issuer_name)?;

    let not_before = Asn1Time::from_unix(template.not_before().timestamp())?;
    builder.set_not_before(&not_before)?;
    let not_after = Asn1Time::from_unix(template.not_after().timestamp())?;
    builder.set_not_after(&not_after)?;

    builder.set_pubkey(key)?;

    let mut bc = BasicConstraints::new();
    bc.critical();
    if template.is_ca() {
        bc.ca();
    }
    builder.append_extension(bc.build()?)?;

    let mut ku = KeyUsage::new();
    ku.critical();
    ku.digital_signature();
    if template.is_ca() {
        ku.key_cert_sign();
    }
    builder.append_extension(ku.build()?)?;

    let eku = ExtendedKeyUsage::new().client_auth().server_auth().build()?;
    builder.append_extension(eku)?;

    if template.is_ca() {
        let ski = SubjectKeyIdentifier::new().build(&builder.x509v3_context(None, None))?;
        builder.append_extension(ski)?;
    }

    if !template.alternative_names().is_empty() {
        let mut san = SubjectAlternativeName::new();
        for name in template.alternative_names() {
            san.dns(name);
        }
        let san = san.build(&builder.x509v3_context(None, None))?;
        builder.append_extension(san)?;
    }

    builder.sign(parent_key, MessageDigest::sha256())?;
    let certificate = builder.build();
    debug!(
        subject = template.common_name(),
        issuer = parent.common_name(),
        "signed certificate"
    );

    certificate.to_der()
}
