//! Certificate templates for authorities and leaves.
//!
//! A [`CertificateTemplate`] is the descriptor a certificate is built from:
//! subject, validity window, extension policy and serial number. The same
//! template is used twice. It describes the certificate being created, and
//! once that certificate exists it is the issuer side for everything the
//! authority signs afterwards.
//!
//! # Template Policy
//! | | Authority | Leaf |
//! |---|---|---|
//! | Basic Constraints | CA=true, critical | CA=false, critical |
//! | Key Usage | digitalSignature, keyCertSign | digitalSignature |
//! | Extended Key Usage | clientAuth, serverAuth | clientAuth, serverAuth |
//! | Validity | now .. now + 10 years | now .. now + `expires` |
//! | Subject Alternative Name | none | DNS names |
//!
//! A validity period ending after [`LATEST_NOT_AFTER`] cannot be encoded and
//! is rejected with [`TemplateError::ValidityOutOfRange`].

use chrono::{DateTime, Datelike, SubsecRound, Utc};
use openssl::bn::{BigNum, MsbOption};
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::x509::{X509Name, X509NameBuilder};
use std::time::Duration;
use thiserror::Error;

use crate::configs::{SerialPolicy, SubjectDefaults};

const AUTHORITY_VALIDITY_YEARS: i32 = 10;
const RANDOM_SERIAL_BITS: i32 = 128;

/// 9999-12-31T23:59:59Z, the last instant an X.509 validity field can hold.
pub const LATEST_NOT_AFTER: i64 = 253_402_300_799;

/// Why a template could not be built
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("validity period ends after 9999-12-31T23:59:59Z")]
    ValidityOutOfRange,
    #[error(transparent)]
    OpenSsl(#[from] ErrorStack),
}

/// Whether a template describes a certificate authority or an end entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Authority,
    Leaf,
}

/// Descriptor for a certificate to be signed
#[derive(Debug)]
pub struct CertificateTemplate {
    kind: TemplateKind,
    common_name: String,
    alternative_names: Vec<String>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    serial_number: BigNum,
    subject: SubjectDefaults,
}

impl CertificateTemplate {
    /// Template for a root or branch authority, valid for ten calendar years from `now`.
    pub fn authority(
        common_name: &str,
        subject: &SubjectDefaults,
        serial_policy: SerialPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, TemplateError> {
        let not_before = now.trunc_subsecs(0);
        let not_after = checked_not_after(add_years(not_before, AUTHORITY_VALIDITY_YEARS))?;

        Ok(Self {
            kind: TemplateKind::Authority,
            common_name: common_name.to_string(),
            alternative_names: Vec::new(),
            not_before,
            not_after,
            serial_number: serial_number(serial_policy, not_before)?,
            subject: subject.clone(),
        })
    }

    /// Template for an end-entity certificate valid from `now` for `expires`.
    pub fn leaf(
        common_name: &str,
        alternative_names: &[String],
        expires: Duration,
        subject: &SubjectDefaults,
        serial_policy: SerialPolicy,
        now: DateTime<Utc>,
    ) -> Result<Self, TemplateError> {
        let not_before = now.trunc_subsecs(0);
        let not_after = checked_not_after(
            chrono::Duration::from_std(expires)
                .ok()
                .and_then(|expires| not_before.checked_add_signed(expires)),
        )?;

        Ok(Self {
            kind: TemplateKind::Leaf,
            common_name: common_name.to_string(),
            alternative_names: alternative_names.to_vec(),
            not_before,
            not_after,
            serial_number: serial_number(serial_policy, not_before)?,
            subject: subject.clone(),
        })
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn is_ca(&self) -> bool {
        self.kind == TemplateKind::Authority
    }

    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    pub fn alternative_names(&self) -> &[String] {
        &self.alternative_names
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn serial_number(&self) -> &BigNum {
        &self.serial_number
    }

    /// Build the distinguished name for this template.
    ///
    /// Attributes are emitted in the order C, ST, L, street, postalCode, O,
    /// OU, CN. Empty default fields are skipped.
    pub fn subject_name(&self) -> Result<X509Name, ErrorStack> {
        let mut name_builder = X509Name::builder()?;
        let subject = &self.subject;

        append_entry(&mut name_builder, Nid::COUNTRYNAME, &subject.country)?;
        append_entry(&mut name_builder, Nid::STATEORPROVINCENAME, &subject.province)?;
        append_entry(&mut name_builder, Nid::LOCALITYNAME, &subject.locality)?;
        if !subject.street_address.is_empty() {
            name_builder.append_entry_by_text("street", &subject.street_address)?;
        }
        if !subject.postal_code.is_empty() {
            name_builder.append_entry_by_text("postalCode", &subject.postal_code)?;
        }
        append_entry(&mut name_builder, Nid::ORGANIZATIONNAME, &subject.organization)?;
        append_entry(
            &mut name_builder,
            Nid::ORGANIZATIONALUNITNAME,
            &subject.organizational_unit,
        )?;
        name_builder.append_entry_by_nid(Nid::COMMONNAME, &self.common_name)?;

        Ok(name_builder.build())
    }
}

fn append_entry(builder: &mut X509NameBuilder, nid: Nid, value: &str) -> Result<(), ErrorStack> {
    if value.is_empty() {
        return Ok(());
    }
    builder.append_entry_by_nid(nid, value)
}

fn checked_not_after(not_after: Option<DateTime<Utc>>) -> Result<DateTime<Utc>, TemplateError> {
    not_after
        .filter(|not_after| not_after.timestamp() <= LATEST_NOT_AFTER)
        .ok_or(TemplateError::ValidityOutOfRange)
}

// Feb 29 rolls over to Mar 1 when the target year has no leap day.
fn add_years(start: DateTime<Utc>, years: i32) -> Option<DateTime<Utc>> {
    let one_day = chrono::Duration::days(1);
    let year = start.year().checked_add(years)?;
    start.with_year(year).or_else(|| {
        (start - one_day)
            .with_year(year)
            .map(|shifted| shifted + one_day)
    })
}

fn serial_number(policy: SerialPolicy, now: DateTime<Utc>) -> Result<BigNum, ErrorStack> {
    match policy {
        // Two templates built within the same second share a serial.
        SerialPolicy::UnixTimestamp => BigNum::from_dec_str(&now.timestamp().to_string()),
        SerialPolicy::Random128 => {
            let mut serial = BigNum::new()?;
            serial.rand(RANDOM_SERIAL_BITS, MsbOption::MAYBE_ZERO, false)?;
            Ok(serial)
        }
    }
}
