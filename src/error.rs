//! Error types for certificate issuance.
//!
//! Every failure in the issuing core is an [`IssueError`]: a kind tag, the
//! operation that was running, the common name being processed (when there is
//! one) and the underlying cause, usually an OpenSSL error stack.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// RSA key pair generation failed
    KeyGeneration,
    /// Certificate construction or signing was rejected
    Signing,
    /// PEM armoring failed
    Encoding,
    /// A branch would exceed the configured maximum chain depth
    DepthExceeded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::KeyGeneration => "error generating private key",
            ErrorKind::Signing => "error signing certificate",
            ErrorKind::Encoding => "error encoding",
            ErrorKind::DepthExceeded => "maximum chain depth exceeded",
        };
        f.write_str(text)
    }
}

/// Which issuing operation was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Root,
    Branch,
    Leaf,
    EncodeCertificate,
    EncodeKey,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Operation::Root => "root",
            Operation::Branch => "branch",
            Operation::Leaf => "leaf",
            Operation::EncodeCertificate => "certificate",
            Operation::EncodeKey => "key",
        };
        f.write_str(text)
    }
}

/// The error returned by every fallible operation of the issuing core.
#[derive(Error, Debug)]
#[error("{kind}{} ({operation})", subject_suffix(.common_name))]
pub struct IssueError {
    kind: ErrorKind,
    operation: Operation,
    common_name: Option<String>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

fn subject_suffix(common_name: &Option<String>) -> String {
    match common_name {
        Some(name) => format!(" for [{}]", name),
        None => String::new(),
    }
}

impl IssueError {
    pub(crate) fn new(
        kind: ErrorKind,
        operation: Operation,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self {
            kind,
            operation,
            common_name: None,
            source: Some(source.into()),
        }
    }

    pub(crate) fn depth_exceeded(common_name: &str) -> Self {
        Self {
            kind: ErrorKind::DepthExceeded,
            operation: Operation::Branch,
            common_name: Some(common_name.to_string()),
            source: None,
        }
    }

    /// Attach the common name being processed.
    pub(crate) fn for_subject(mut self, common_name: &str) -> Self {
        self.common_name = Some(common_name.to_string());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }
}

/// A specialized Result type for issuing operations.
pub type Result<T> = std::result::Result<T, IssueError>;
