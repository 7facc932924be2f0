//! Certificate Authority Module
//!
//! An [`Authority`] is either a self-signed root or a branch (intermediate)
//! signed by another authority. Both can issue further branches and leaves.
//!
//! # PKI Hierarchy
//! ```text
//! Root (self-signed)             Authority::root
//!   └── Intermediate             root.branch
//!       └── Leaf certificates    intermediate.leaf
//! ```
//!
//! # Certificate Properties
//! - **Key Size**: RSA 4096-bit for authorities, RSA 2048-bit for leaves
//! - **Signature Algorithm**: SHA-256 with RSA
//! - **Authority Validity**: 10 years from creation
//! - **Serial Number**: Unix timestamp by default, see [`SerialPolicy`]
//!
//! # Example
//! ```rust,no_run
//! use incert::Authority;
//! use std::time::Duration;
//!
//! # fn example() -> incert::Result<()> {
//! let root = Authority::root("Test Root")?;
//! let intermediate = root.branch("Test Intermediate")?;
//! let leaf = intermediate.leaf(
//!     "example.com",
//!     &["example.com".to_string(), "www.example.com".to_string()],
//!     Duration::from_secs(24 * 60 * 60),
//! )?;
//!
//! let certificate = leaf.encode_certificate()?;
//! let key = leaf.encode_key()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//! `Authority` is `Send + Sync`. Signing only reads the authority's key and
//! template, so one intermediate may issue leaves from several threads.
//!
//! [`SerialPolicy`]: crate::configs::SerialPolicy

use chrono::{DateTime, Utc};
use openssl::error::ErrorStack;
use openssl::pkey::{PKey, Private};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::certificate_template::CertificateTemplate;
use crate::configs::IssuerSettings;
use crate::encoding;
use crate::error::{ErrorKind, IssueError, Operation, Result};
use crate::leaf::Leaf;
use crate::primitive::{self, Clock, KeySource, OpensslKeySource, SystemClock};

pub const AUTHORITY_KEY_BITS: u32 = 4096;
pub const LEAF_KEY_BITS: u32 = 2048;

/// Everything an issuance run depends on besides its inputs.
///
/// Branches inherit the context of the authority that created them.
#[derive(Clone)]
pub struct IssuanceContext {
    settings: IssuerSettings,
    keys: Arc<dyn KeySource>,
    clock: Arc<dyn Clock>,
}

impl Default for IssuanceContext {
    fn default() -> Self {
        Self {
            settings: IssuerSettings::default(),
            keys: Arc::new(OpensslKeySource),
            clock: Arc::new(SystemClock),
        }
    }
}

impl IssuanceContext {
    pub fn new(settings: IssuerSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn with_key_source(mut self, keys: Arc<dyn KeySource>) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &IssuerSettings {
        &self.settings
    }

    /// Current time according to this context's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl fmt::Debug for IssuanceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuanceContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// A root or intermediate certificate authority
pub struct Authority {
    certificate: Vec<u8>,
    key: PKey<Private>,
    template: CertificateTemplate,
    depth: u32,
    context: IssuanceContext,
}

impl Authority {
    /// Generate a self-signed root authority with the default context.
    pub fn root(common_name: &str) -> Result<Self> {
        Self::root_with(common_name, IssuanceContext::default())
    }

    /// Generate a self-signed root authority.
    pub fn root_with(common_name: &str, context: IssuanceContext) -> Result<Self> {
        let authority = Self::create(common_name, None, context, Operation::Root)?;
        info!(common_name, "created root authority");
        Ok(authority)
    }

    /// Create a branch (intermediate authority) signed by this authority.
    pub fn branch(&self, common_name: &str) -> Result<Self> {
        let depth = self.depth + 1;
        if let Some(max_depth) = self.context.settings.max_depth {
            if depth > max_depth {
                return Err(IssueError::depth_exceeded(common_name));
            }
        }

        let authority =
            Self::create(common_name, Some(self), self.context.clone(), Operation::Branch)?;
        info!(
            common_name,
            issuer = self.common_name(),
            depth,
            "created branch authority"
        );
        Ok(authority)
    }

    /// Issue a leaf certificate valid for `expires` from now.
    pub fn leaf(
        &self,
        common_name: &str,
        alternative_names: &[String],
        expires: Duration,
    ) -> Result<Leaf> {
        let signing = |e: ErrorStack| {
            IssueError::new(ErrorKind::Signing, Operation::Leaf, e).for_subject(common_name)
        };
        let settings = &self.context.settings;

        let template = CertificateTemplate::leaf(
            common_name,
            alternative_names,
            expires,
            &settings.subject,
            settings.serial,
            self.context.clock.now(),
        )
        .map_err(|e| IssueError::new(ErrorKind::Signing, Operation::Leaf, e).for_subject(common_name))?;

        let key = primitive::generate_key(self.context.keys.as_ref(), LEAF_KEY_BITS).map_err(|e| {
            IssueError::new(ErrorKind::KeyGeneration, Operation::Leaf, e).for_subject(common_name)
        })?;

        let certificate = primitive::create_certificate(&template, &self.template, &key, &self.key)
            .map_err(signing)?;

        info!(
            common_name,
            issuer = self.common_name(),
            names = ?alternative_names,
            "issued leaf certificate"
        );
        Ok(Leaf::new(common_name, certificate, key))
    }

    /// PEM encoded certificate of this authority.
    pub fn encode_certificate(&self) -> Result<String> {
        encoding::encode_certificate(&self.certificate).map_err(|e| e.for_subject(self.common_name()))
    }

    /// DER bytes of the signed certificate.
    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    pub fn common_name(&self) -> &str {
        self.template.common_name()
    }

    pub fn template(&self) -> &CertificateTemplate {
        &self.template
    }

    /// 0 for a root, one more than the issuer for a branch.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    fn create(
        common_name: &str,
        parent: Option<&Authority>,
        context: IssuanceContext,
        operation: Operation,
    ) -> Result<Self> {
        let signing = |e: ErrorStack| {
            IssueError::new(ErrorKind::Signing, operation, e).for_subject(common_name)
        };
        let settings = &context.settings;

        let template = CertificateTemplate::authority(
            common_name,
            &settings.subject,
            settings.serial,
            context.clock.now(),
        )
        .map_err(|e| IssueError::new(ErrorKind::Signing, operation, e).for_subject(common_name))?;

        let key = primitive::generate_key(context.keys.as_ref(), AUTHORITY_KEY_BITS).map_err(|e| {
            IssueError::new(ErrorKind::KeyGeneration, operation, e).for_subject(common_name)
        })?;

        let (certificate, depth) = match parent {
            Some(parent) => (
                primitive::create_certificate(&template, &parent.template, &key, &parent.key),
                parent.depth + 1,
            ),
            None => (
                primitive::create_certificate(&template, &template, &key, &key),
                0,
            ),
        };
        let certificate = certificate.map_err(signing)?;

        Ok(Self {
            certificate,
            key,
            template,
            depth,
            context,
        })
    }
}

impl fmt::Debug for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authority")
            .field("common_name", &self.common_name())
            .field("depth", &self.depth)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate_template::TemplateError;
    use crate::configs::SerialPolicy;
    use openssl::rsa::Rsa;
    use openssl::x509::X509;

    struct FailingKeySource;

    impl KeySource for FailingKeySource {
        fn generate(&self, _bits: u32) -> std::result::Result<Rsa<Private>, ErrorStack> {
            Err(ErrorStack::get())
        }
    }

    #[test]
    fn test_root_is_self_signed() {
        let root = Authority::root("Unit Root").unwrap();
        let cert = X509::from_der(root.certificate()).unwrap();

        assert!(cert.verify(&root.key).unwrap());
        assert_eq!(root.depth(), 0);
        assert_eq!(root.key.bits(), AUTHORITY_KEY_BITS);
    }

    #[test]
    fn test_branch_depth_and_signature() {
        let root = Authority::root("Unit Root").unwrap();
        let branch = root.branch("Unit Intermediate").unwrap();
        let cert = X509::from_der(branch.certificate()).unwrap();

        assert_eq!(branch.depth(), 1);
        assert!(cert.verify(&root.key).unwrap());
        assert_eq!(branch.common_name(), "Unit Intermediate");
    }

    #[test]
    fn test_max_depth_rejects_deep_branch() {
        let settings = IssuerSettings {
            max_depth: Some(1),
            serial: SerialPolicy::Random128,
            ..IssuerSettings::default()
        };
        let root = Authority::root_with("Bounded Root", IssuanceContext::new(settings)).unwrap();
        let intermediate = root.branch("Bounded Intermediate").unwrap();

        let err = intermediate.branch("Too Deep").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DepthExceeded);
        assert_eq!(err.operation(), Operation::Branch);
        assert_eq!(err.common_name(), Some("Too Deep"));

        // leaves are not limited by depth
        assert!(intermediate
            .leaf("leaf.local", &[], Duration::from_secs(60))
            .is_ok());
    }

    #[test]
    fn test_key_generation_failure_is_reported() {
        let context = IssuanceContext::default().with_key_source(Arc::new(FailingKeySource));

        let err = Authority::root_with("Broken Root", context).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyGeneration);
        assert_eq!(err.operation(), Operation::Root);
        assert_eq!(err.common_name(), Some("Broken Root"));
        assert!(err.to_string().contains("[Broken Root]"));
    }

    #[test]
    fn test_unrepresentable_leaf_lifetime_is_an_error() {
        let root = Authority::root("Lifetime Root").unwrap();

        let err = root.leaf("forever.local", &[], Duration::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Signing);
        assert_eq!(err.operation(), Operation::Leaf);
        assert_eq!(err.common_name(), Some("forever.local"));

        let source = std::error::Error::source(&err).unwrap();
        assert!(matches!(
            source.downcast_ref::<TemplateError>(),
            Some(TemplateError::ValidityOutOfRange)
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let root = Authority::root("Debug Root").unwrap();
        let debug_str = format!("{:?}", root);

        assert!(debug_str.contains("Debug Root"));
        assert!(debug_str.contains("<redacted>"));
    }

    #[test]
    fn test_authority_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Authority>();
    }
}
