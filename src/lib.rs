//! incert - Throwaway X.509 Certificate Chains
//!
//! Issues a complete certificate chain for development, testing and small
//! deployments: a self-signed root authority, an intermediate authority signed
//! by the root, and one or more leaf certificates signed by the intermediate.
//!
//! # Overview
//!
//! ```text
//! Root (self-signed, CA=true, RSA 4096)
//!   └── Intermediate (signed by Root, CA=true, RSA 4096)
//!       └── Leaf certificates (signed by Intermediate, CA=false, RSA 2048)
//! ```
//!
//! Authorities and leaves exist only in memory. What gets persisted is their
//! PEM encoding: `CERTIFICATE` blocks for every certificate and a separate
//! `RSA PRIVATE KEY` (PKCS#1) block for every leaf key.
//!
//! # Quick Start
//!
//! ## As an Application
//!
//! ```bash
//! # One certificate for localhost, valid for a year
//! incert issue single -d certs
//!
//! # Several certificates described in a file
//! incert issue batch --config batch.yaml -d certs
//! ```
//!
//! ## As a Library
//!
//! ```no_run
//! use incert::Authority;
//! use std::time::Duration;
//!
//! fn main() -> incert::Result<()> {
//!     let root = Authority::root("Test Root")?;
//!     let intermediate = root.branch("Test Intermediate")?;
//!     let leaf = intermediate.leaf(
//!         "example.com",
//!         &["example.com".to_string(), "www.example.com".to_string()],
//!         Duration::from_secs(24 * 60 * 60),
//!     )?;
//!
//!     println!("{}", root.encode_certificate()?);
//!     println!("{}", intermediate.encode_certificate()?);
//!     println!("{}", leaf.encode_certificate()?);
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! ## [`authority`]
//!
//! [`Authority`] with `root`, `branch` and `leaf`, plus the
//! [`IssuanceContext`] carrying issuer settings, key source and clock.
//!
//! ## [`leaf`]
//!
//! [`Leaf`] holds an end-entity certificate and its key.
//!
//! ## [`certificate_template`]
//!
//! Template policy for authorities and leaves: subject, validity, extensions
//! and serial numbers.
//!
//! ## [`primitive`]
//!
//! RSA key generation and X.509 signing on top of OpenSSL, with the
//! [`KeySource`] and [`Clock`] seams.
//!
//! ## [`encoding`]
//!
//! PEM armoring of DER certificates and PKCS#1 keys.
//!
//! ## [`issue`]
//!
//! One-shot chain issuance for the command line and writing the results to
//! disk.
//!
//! ## [`configs`]
//!
//! Single and batch configuration files (TOML, YAML or JSON).
//!
//! # Error Handling
//!
//! The issuing core returns [`IssueError`], which carries an [`ErrorKind`],
//! the [`Operation`] that failed and the common name being processed:
//!
//! ```no_run
//! use incert::{Authority, ErrorKind};
//!
//! match Authority::root("Test Root") {
//!     Ok(root) => println!("created {}", root.common_name()),
//!     Err(e) if e.kind() == ErrorKind::KeyGeneration => eprintln!("no entropy: {}", e),
//!     Err(e) => eprintln!("{}", e),
//! }
//! ```
//!
//! Configuration loading and file output use `anyhow::Result`.
//!
//! # Serial Numbers
//!
//! By default every certificate's serial number is the Unix timestamp of its
//! creation, so certificates created within the same second share a serial.
//! Set [`SerialPolicy::Random128`] in the issuer settings for 128-bit random
//! serials.

pub mod authority;
pub mod build_info;
pub mod certificate_template;
pub mod configs;
pub mod duration;
pub mod encoding;
pub mod error;
pub mod issue;
pub mod leaf;
pub mod primitive;

pub use authority::{Authority, IssuanceContext};
pub use configs::{IssuerSettings, SerialPolicy, SubjectDefaults};
pub use error::{ErrorKind, IssueError, Operation, Result};
pub use leaf::Leaf;
pub use primitive::{Clock, KeySource};
