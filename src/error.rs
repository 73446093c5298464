//! Error types for the bundling engine.
//!
//! Two kinds of error are recoverable: lookup failures (a referenced resource
//! could not be fetched) and parse failures (a resource was fetched but is
//! unusable). Both route through [`tolerate`], which downgrades them to a
//! logged warning in lenient mode and propagates them in strict mode.
//! Configuration and document-level errors are always fatal.

use thiserror::Error;

use crate::config::BundleOptions;

/// Result type alias for bundling operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Error types for bundling operations.
#[derive(Debug, Error)]
pub enum BundleError {
    /// A referenced resource could not be fetched: missing file, permission
    /// problem, network failure, or a non-2xx response.
    #[error("could not fetch {path}: {reason}")]
    Lookup { path: String, reason: String },

    /// A resource was fetched but is unusable: unknown MIME type, a minifier
    /// rejection, or an import chain that exceeds the depth limit.
    #[error("could not parse {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Invalid configuration, reported before any processing starts.
    #[error("{0}")]
    Config(String),

    /// The input document itself is unusable. Always fatal.
    #[error("{0}")]
    Document(String),
}

impl BundleError {
    pub(crate) fn lookup(path: &str, reason: impl std::fmt::Display) -> Self {
        BundleError::Lookup {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(path: &str, reason: impl std::fmt::Display) -> Self {
        BundleError::Parse {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Re-attach a more specific path to a lookup or parse failure.
    #[must_use]
    pub(crate) fn at(self, path: &str) -> Self {
        match self {
            BundleError::Lookup { reason, .. } => BundleError::Lookup {
                path: path.to_string(),
                reason,
            },
            BundleError::Parse { reason, .. } => BundleError::Parse {
                path: path.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Whether the lenient-mode policy may downgrade this error to a warning.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BundleError::Lookup { .. } | BundleError::Parse { .. }
        )
    }
}

/// Route a recoverable error through the warn-or-abort policy.
///
/// Returns `Ok(())` when the error was downgraded to a warning; the caller is
/// expected to leave the offending reference alone and move on. Strict mode
/// and non-recoverable errors propagate, aborting the whole run with no
/// partial output.
pub(crate) fn tolerate(options: &BundleOptions, err: BundleError) -> BundleResult<()> {
    if options.strict || !err.is_recoverable() {
        return Err(err);
    }
    if !options.quiet {
        log::warn!("{err}");
    }
    Ok(())
}
