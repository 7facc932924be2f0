//! Build metadata reported by `incert version`.

const UNKNOWN: &str = "unknown";

/// Version and commit of the running binary, captured once at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    version: String,
    commit: String,
}

impl BuildInfo {
    pub fn new(version: impl Into<String>, commit: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            commit: commit.into(),
        }
    }

    /// Package version and the `INCERT_COMMIT` value set at compile time.
    pub fn current() -> Self {
        Self::new(
            env!("CARGO_PKG_VERSION"),
            option_env!("INCERT_COMMIT").unwrap_or(UNKNOWN),
        )
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn commit(&self) -> &str {
        &self.commit
    }
}
