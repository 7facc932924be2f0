//! Integration tests for chain construction.
//!
//! These tests build real RSA chains and check them with OpenSSL's own
//! verification, independent of the code that produced them.

use chrono::{DateTime, TimeZone, Utc};
use incert::encoding;
use incert::{Authority, Clock, IssuanceContext, IssuerSettings, KeySource};
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::pkey::Private;
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509StoreContext, X509};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

struct TestChain {
    root: Authority,
    intermediate: Authority,
}

fn chain() -> &'static TestChain {
    static CHAIN: OnceLock<TestChain> = OnceLock::new();
    CHAIN.get_or_init(|| {
        let root = Authority::root("Test Root").unwrap();
        let intermediate = root.branch("Test Intermediate").unwrap();
        TestChain { root, intermediate }
    })
}

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Hands out the same key on every call.
struct PregeneratedKey {
    der: Vec<u8>,
}

impl KeySource for PregeneratedKey {
    fn generate(&self, _bits: u32) -> Result<Rsa<Private>, ErrorStack> {
        Rsa::private_key_from_der(&self.der)
    }
}

fn x509(der: &[u8]) -> X509 {
    X509::from_der(der).unwrap()
}

fn common_name(cert: &X509) -> String {
    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

fn dns_names(cert: &X509) -> Vec<String> {
    cert.subject_alt_names()
        .map(|names| {
            names
                .iter()
                .filter_map(|name| name.dnsname().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn verify_chain(root: &X509, intermediate: &X509, leaf: &X509) -> bool {
    let mut store_builder = X509StoreBuilder::new().unwrap();
    store_builder.add_cert(root.clone()).unwrap();
    let store = store_builder.build();

    let mut untrusted = Stack::new().unwrap();
    untrusted.push(intermediate.clone()).unwrap();

    let mut context = X509StoreContext::new().unwrap();
    context
        .init(&store, leaf, &untrusted, |c| c.verify_cert())
        .unwrap()
}

#[test]
fn test_root_is_self_signed_with_common_name() {
    let root = x509(chain().root.certificate());

    assert_eq!(common_name(&root), "Test Root");
    assert!(root.verify(&root.public_key().unwrap()).unwrap());
    assert_eq!(
        root.subject_name().to_der().unwrap(),
        root.issuer_name().to_der().unwrap()
    );
    assert_eq!(root.public_key().unwrap().bits(), 4096);
}

#[test]
fn test_branch_is_signed_by_parent() {
    let root = x509(chain().root.certificate());
    let intermediate = x509(chain().intermediate.certificate());

    assert_eq!(common_name(&intermediate), "Test Intermediate");
    assert!(intermediate.verify(&root.public_key().unwrap()).unwrap());
    assert_eq!(
        intermediate.issuer_name().to_der().unwrap(),
        root.subject_name().to_der().unwrap()
    );
    assert_eq!(intermediate.public_key().unwrap().bits(), 4096);
}

#[test]
fn test_leaf_validity_names_and_ca_flag() {
    let names = vec!["example.com".to_string(), "www.example.com".to_string()];
    let leaf = chain()
        .intermediate
        .leaf("example.com", &names, DAY)
        .unwrap();
    let cert = x509(leaf.certificate());

    let validity = cert.not_before().diff(cert.not_after()).unwrap();
    assert_eq!((validity.days, validity.secs), (1, 0));
    assert_eq!(dns_names(&cert), names);
    assert_eq!(cert.public_key().unwrap().bits(), 2048);

    let text = String::from_utf8(cert.to_text().unwrap()).unwrap();
    assert!(text.contains("CA:FALSE"));
    assert!(text.contains("TLS Web Client Authentication"));
    assert!(text.contains("TLS Web Server Authentication"));
    assert!(!text.contains("Certificate Sign"));
}

#[test]
fn test_authority_extensions() {
    let intermediate = x509(chain().intermediate.certificate());
    let text = String::from_utf8(intermediate.to_text().unwrap()).unwrap();

    assert!(text.contains("CA:TRUE"));
    assert!(text.contains("Digital Signature, Certificate Sign"));
    assert!(!text.contains("pathlen"));
    assert!(intermediate.subject_alt_names().is_none());
    assert!(intermediate.subject_key_id().is_some());
}

#[test]
fn test_scenario_chain_validates() {
    let names = vec!["example.com".to_string(), "www.example.com".to_string()];
    let leaf = chain()
        .intermediate
        .leaf("example.com", &names, DAY)
        .unwrap();

    let root = x509(chain().root.certificate());
    let intermediate = x509(chain().intermediate.certificate());
    let leaf_cert = x509(leaf.certificate());

    assert!(verify_chain(&root, &intermediate, &leaf_cert));

    // expires about 24 hours from now
    let expected = openssl::asn1::Asn1Time::days_from_now(1).unwrap();
    let drift = leaf_cert.not_after().diff(&expected).unwrap();
    assert_eq!(drift.days, 0);
    assert!(drift.secs.abs() <= 60);
}

#[test]
fn test_leaf_does_not_validate_without_intermediate() {
    let leaf = chain()
        .intermediate
        .leaf("orphan.example", &[], DAY)
        .unwrap();

    let root = x509(chain().root.certificate());
    let other_root = Authority::root("Unrelated Root").unwrap();
    let other = x509(other_root.certificate());

    assert!(!verify_chain(&root, &other, &x509(leaf.certificate())));
}

#[test]
fn test_certificate_encoding_round_trip() {
    let authority = &chain().intermediate;
    let text = authority.encode_certificate().unwrap();

    let block = pem::parse(&text).unwrap();
    assert_eq!(block.tag(), "CERTIFICATE");
    assert_eq!(block.contents(), authority.certificate());
}

#[test]
fn test_key_encoding_round_trip() {
    let rsa = Rsa::generate(2048).unwrap();
    let der = rsa.private_key_to_der().unwrap();

    let text = encoding::encode_key(&der).unwrap();
    let block = pem::parse(&text).unwrap();
    assert_eq!(block.tag(), "RSA PRIVATE KEY");
    assert_eq!(block.contents(), der.as_slice());
}

#[test]
fn test_leaf_key_matches_certificate() {
    let leaf = chain()
        .intermediate
        .leaf("keyed.example", &["keyed.example".to_string()], DAY)
        .unwrap();

    let key_text = leaf.encode_key().unwrap();
    let cert_text = leaf.encode_certificate().unwrap();
    assert_ne!(key_text, cert_text);

    let rsa = Rsa::private_key_from_pem(key_text.as_bytes()).unwrap();
    let cert = X509::from_pem(cert_text.as_bytes()).unwrap();
    let public = cert.public_key().unwrap().rsa().unwrap();
    assert_eq!(rsa.n(), public.n());
}

#[test]
fn test_same_second_authorities_share_serial() {
    let instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let key = Rsa::generate(2048).unwrap().private_key_to_der().unwrap();
    let context = IssuanceContext::new(IssuerSettings::default())
        .with_clock(Arc::new(FixedClock(instant)))
        .with_key_source(Arc::new(PregeneratedKey { der: key }));

    let first = Authority::root_with("First Root", context.clone()).unwrap();
    let second = Authority::root_with("Second Root", context).unwrap();

    let first_serial = x509(first.certificate()).serial_number().to_bn().unwrap();
    let second_serial = x509(second.certificate()).serial_number().to_bn().unwrap();
    assert_eq!(first_serial, second_serial);
    assert_eq!(
        first_serial.to_dec_str().unwrap().to_string(),
        instant.timestamp().to_string()
    );
}

#[test]
fn test_random_serials_do_not_collide() {
    let instant = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let key = Rsa::generate(2048).unwrap().private_key_to_der().unwrap();
    let settings = IssuerSettings {
        serial: incert::SerialPolicy::Random128,
        ..IssuerSettings::default()
    };
    let context = IssuanceContext::new(settings)
        .with_clock(Arc::new(FixedClock(instant)))
        .with_key_source(Arc::new(PregeneratedKey { der: key }));

    let first = Authority::root_with("First Root", context.clone()).unwrap();
    let second = Authority::root_with("Second Root", context).unwrap();

    let first_serial = x509(first.certificate()).serial_number().to_bn().unwrap();
    let second_serial = x509(second.certificate()).serial_number().to_bn().unwrap();
    assert_ne!(first_serial, second_serial);
}

#[test]
fn test_fixed_clock_sets_validity_window() {
    let instant = Utc.with_ymd_and_hms(2030, 6, 1, 9, 0, 0).unwrap();
    let key = Rsa::generate(2048).unwrap().private_key_to_der().unwrap();
    let context = IssuanceContext::default()
        .with_clock(Arc::new(FixedClock(instant)))
        .with_key_source(Arc::new(PregeneratedKey { der: key }));

    let root = Authority::root_with("Future Root", context).unwrap();
    let leaf = root
        .leaf("future.example", &[], Duration::from_secs(90 * 60))
        .unwrap();

    let root_cert = x509(root.certificate());
    let expected_start = openssl::asn1::Asn1Time::from_unix(instant.timestamp()).unwrap();
    let start_drift = root_cert.not_before().diff(&expected_start).unwrap();
    assert_eq!((start_drift.days, start_drift.secs), (0, 0));

    let root_validity = root_cert.not_before().diff(root_cert.not_after()).unwrap();
    assert_eq!((root_validity.days, root_validity.secs), (3653, 0));

    let leaf_cert = x509(leaf.certificate());
    let leaf_validity = leaf_cert.not_before().diff(leaf_cert.not_after()).unwrap();
    assert_eq!((leaf_validity.days, leaf_validity.secs), (0, 5400));
}
