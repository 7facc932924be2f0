//! Chain issuance and output.
//!
//! One run creates a fresh root, an intermediate signed by it, and every
//! requested leaf signed by the intermediate. The results are held as PEM
//! text in an [`IssuedChain`] and written out with [`IssuedChain::write_to`].
//!
//! # Output Files
//! | File | Contents | Mode |
//! |---|---|---|
//! | `root.crt` | root certificate | 0644 |
//! | `intermediate.crt` | intermediate certificate | 0644 |
//! | `<commonName>.crt` | leaf certificate | 0644 |
//! | `<commonName>.key` | leaf `RSA PRIVATE KEY` | 0600 |

use anyhow::{bail, Context, Result};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::authority::{Authority, IssuanceContext};
use crate::configs::{BatchConfig, IssuerSettings, SingleConfig};

const CERTIFICATE_MODE: u32 = 0o644;
const KEY_MODE: u32 = 0o600;

/// PEM text for one issued leaf
pub struct IssuedLeaf {
    pub common_name: String,
    pub certificate: String,
    pub key: String,
}

impl fmt::Debug for IssuedLeaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedLeaf")
            .field("common_name", &self.common_name)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// PEM text for a complete chain
#[derive(Debug)]
pub struct IssuedChain {
    pub root: String,
    pub intermediate: String,
    pub leaves: Vec<IssuedLeaf>,
}

/// Issue a root, an intermediate and one leaf per request, in order.
///
/// The first failing leaf aborts the run; nothing issued so far is returned.
pub fn issue_chain(requests: &[SingleConfig], context: IssuanceContext) -> Result<IssuedChain> {
    let timestamp = context.now().timestamp();

    let root = Authority::root_with(&format!("Incert Root ({})", timestamp), context)
        .context("Failed to create root certificate authority")?;
    let intermediate = root
        .branch(&format!("Incert Intermediate ({})", timestamp))
        .context("Failed to create intermediate certificate authority")?;

    let mut leaves = Vec::with_capacity(requests.len());
    for request in requests {
        let leaf = intermediate
            .leaf(
                &request.common_name,
                &request.alternative_names,
                request.expires,
            )
            .context(format!(
                "Failed to create leaf certificate [{}]",
                request.common_name
            ))?;

        leaves.push(IssuedLeaf {
            common_name: request.common_name.clone(),
            certificate: leaf.encode_certificate()?,
            key: leaf.encode_key()?,
        });
    }

    info!(leaves = leaves.len(), "issued certificate chain");
    Ok(IssuedChain {
        root: root.encode_certificate()?,
        intermediate: intermediate.encode_certificate()?,
        leaves,
    })
}

/// Issue a chain with a single leaf.
pub fn issue_single(request: &SingleConfig, settings: &IssuerSettings) -> Result<IssuedChain> {
    issue_chain(
        std::slice::from_ref(request),
        IssuanceContext::new(settings.clone()),
    )
}

/// Issue a chain with every leaf described by `batch`.
pub fn issue_batch(batch: &BatchConfig) -> Result<IssuedChain> {
    issue_chain(&batch.values, IssuanceContext::new(batch.issuer.clone()))
}

impl IssuedChain {
    /// Write every certificate and key into `directory`, creating it if needed.
    ///
    /// Returns the written paths in write order.
    pub fn write_to(&self, directory: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(directory)
            .context(format!("Failed to create directory: {}", directory.display()))?;

        let mut written = Vec::new();
        written.push(write_file(
            &directory.join("root.crt"),
            &self.root,
            CERTIFICATE_MODE,
        )?);
        written.push(write_file(
            &directory.join("intermediate.crt"),
            &self.intermediate,
            CERTIFICATE_MODE,
        )?);

        for leaf in &self.leaves {
            let stem = file_stem(&leaf.common_name)?;
            written.push(write_file(
                &directory.join(format!("{}.crt", stem)),
                &leaf.certificate,
                CERTIFICATE_MODE,
            )?);
            written.push(write_file(
                &directory.join(format!("{}.key", stem)),
                &leaf.key,
                KEY_MODE,
            )?);
        }

        Ok(written)
    }
}

fn file_stem(common_name: &str) -> Result<&str> {
    if common_name.is_empty()
        || common_name == "."
        || common_name == ".."
        || common_name.contains(['/', '\\'])
    {
        bail!(
            "Common name [{}] cannot be used as an output file name",
            common_name
        );
    }
    Ok(common_name)
}

fn write_file(path: &Path, contents: &str, mode: u32) -> Result<PathBuf> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(path)
        .context(format!("Failed to open {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .context(format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "wrote file");

    Ok(path.to_path_buf())
}
