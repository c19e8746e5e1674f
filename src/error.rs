//! Error types for keg operations.
//!
//! All fallible library functions return [`KegError`], either directly or through
//! `anyhow`'s `Context` inside a call chain. Errors that only matter for a single item in
//! a queue (one archive, one file, one link) are not propagated through `Result` at all —
//! they are appended to an [`ErrorSummary`] and the caller continues with the rest of the
//! queue, per the accumulate-then-flush policy of the install/uninstall orchestrators.

use thiserror::Error;

/// Error type for all keg operations.
#[derive(Error, Debug)]
pub enum KegError {
    /// Network or HTTP request failed when talking to the formula API or a registry.
    #[error("request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    /// Failed to parse JSON from an API response or local cache file.
    #[error("failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The requested package does not exist upstream or in the store.
    #[error("unknown package: {0}")]
    UnknownPackage(String),

    /// `BREW_PY_CELLAR` is unset. Callers should translate this into exit code 42.
    #[error("store root not configured: set BREW_PY_CELLAR")]
    StoreNotConfigured,

    /// The config file contains a value that doesn't parse (bad duration string, etc).
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Downloaded archive's sha256 didn't match the expected digest.
    #[error("digest mismatch for {pkg}: expected {expected}, got {actual}")]
    DigestMismatch {
        pkg: String,
        expected: String,
        actual: String,
    },

    /// A tar entry failed the archive safety filter.
    #[error("rejected archive entry {entry}: {reason}")]
    UnsafeArchiveEntry { entry: String, reason: String },

    /// The package being removed still has a live, non-ignored dependent.
    #[error("{pkg} is required by {}", .dependents.join(", "))]
    DependencyViolation { pkg: String, dependents: Vec<String> },

    /// File system operation failed (store access, cache, config).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Miscellaneous error with rich context, typically from `otool`/`install_name_tool`
    /// subprocess plumbing or tar-archive walking.
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KegError>;

/// Accumulates non-fatal failures across a queue (install, uninstall, cleanup) and
/// renders them as a single summary at the end, grounded on the original `Log`
/// error-summary buffer.
#[derive(Debug, Default)]
pub struct ErrorSummary {
    entries: Vec<(String, String)>,
}

impl ErrorSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: impl Into<String>, err: impl std::fmt::Display) {
        self.entries.push((item.into(), err.to_string()));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl std::fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.entries.is_empty() {
            return Ok(());
        }
        writeln!(f, "Error summary:")?;
        for (item, err) in &self.entries {
            writeln!(f, "  {item}: {err}")?;
        }
        Ok(())
    }
}
